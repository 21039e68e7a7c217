//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the proxy handler
//! - Wire up middleware (header rules, timeout, tracing)
//! - Forward requests to the upstream
//! - Swap in new rule sets as configurations arrive

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::BundleConfig;
use crate::extensions::Registry;
use crate::http::middleware::{http_headers_middleware, HttpHeadersState};
use crate::observability::metrics;
use crate::rules::{RuleSet, RuleSetError};

/// Errors raised while building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Rules(#[from] RuleSetError),

    #[error("invalid upstream `{0}`")]
    Upstream(String),
}

/// Where requests are forwarded to.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    /// Parse an upstream base URL; only its scheme and authority are used.
    pub fn parse(value: &str) -> Result<Self, ServerError> {
        let uri: Uri = value
            .parse()
            .map_err(|_| ServerError::Upstream(value.to_string()))?;
        let parts = uri.into_parts();

        match (parts.scheme, parts.authority) {
            (Some(scheme), Some(authority)) => Ok(Self { scheme, authority }),
            _ => Err(ServerError::Upstream(value.to_string())),
        }
    }

    /// Point `uri` at the upstream, keeping path and query.
    pub fn rewrite(&self, uri: &Uri) -> Uri {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Upstream,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
    headers: HttpHeadersState,
    config: BundleConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: BundleConfig) -> Result<Self, ServerError> {
        let registry = Registry::load(&config)?;
        let rules = registry
            .rule_set()
            .map(|rules| rules.as_ref().clone())
            .unwrap_or_default();

        let headers = HttpHeadersState::new(rules, config.server.max_body_size);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState {
            client,
            upstream: Upstream::parse(&config.server.upstream)?,
        };

        let router = Self::build_router(&config, state, headers.clone());
        Ok(Self {
            router,
            headers,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BundleConfig, state: AppState, headers: HttpHeadersState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(from_fn_with_state(headers, http_headers_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Live header rule state.
    pub fn headers(&self) -> &HttpHeadersState {
        &self.headers
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, applying configuration updates.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<BundleConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.server.upstream,
            rules = self.headers.rules().len(),
            "HTTP server starting"
        );

        let headers = self.headers.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match RuleSet::compile_enabled(&config.http_headers) {
                    Ok(rules) => {
                        tracing::info!(rules = rules.len(), "Header rules reloaded");
                        headers.store(rules);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected reloaded header rules, keeping current set");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward the request upstream and hand the response back.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (mut parts, body) = request.into_parts();

    tracing::debug!(
        method = %parts.method,
        path = %parts.uri.path(),
        "Proxying request"
    );

    parts.uri = state.upstream.rewrite(&parts.uri);
    let req = Request::from_parts(parts, body);

    match state.client.request(req).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start_time);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
