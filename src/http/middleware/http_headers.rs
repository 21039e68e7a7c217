//! Header rule middleware.
//! Applies the live rule set to every response passing through the router.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::RequestContext;
use crate::http::response::BufferedResponse;
use crate::observability::metrics;
use crate::rules::{ApplyOutcome, RuleSet};

/// Shared state of the header middleware.
#[derive(Clone)]
pub struct HttpHeadersState {
    rules: Arc<ArcSwap<RuleSet>>,
    max_body_size: usize,
}

impl HttpHeadersState {
    pub fn new(rules: RuleSet, max_body_size: usize) -> Self {
        Self {
            rules: Arc::new(ArcSwap::from_pointee(rules)),
            max_body_size,
        }
    }

    /// Replace the rule set; requests in flight keep the one they started with.
    pub fn store(&self, rules: RuleSet) {
        self.rules.store(Arc::new(rules));
    }

    /// Current rule set.
    pub fn rules(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

pub async fn http_headers_middleware(
    State(state): State<HttpHeadersState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let rules = state.rules();
    let context = RequestContext::from_request(&req);

    // Nothing to do: don't buffer
    if rules.is_empty() || !context.kind.is_main() {
        metrics::record_response(ApplyOutcome::Skipped.label());
        return next.run(req).await;
    }

    let response = next.run(req).await;
    let mut buffered = match BufferedResponse::buffer(response, state.max_body_size).await {
        Ok(buffered) => buffered,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read response body");
            return (StatusCode::BAD_GATEWAY, "Failed to read response body").into_response();
        }
    };

    let outcome = rules.apply(&mut buffered, &context);
    metrics::record_response(outcome.label());

    tracing::debug!(
        outcome = outcome.label(),
        status = %buffered.status(),
        "Header rules processed"
    );

    buffered.into_response()
}
