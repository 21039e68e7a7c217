//! Request-side context for the header rules.
//!
//! # Responsibilities
//! - Distinguish main requests from sub-requests
//! - Carry the negotiated response format
//!
//! # Design Decisions
//! - Both are plain request extensions, set by whoever dispatches the request
//! - A request without a `RequestKind` extension is a main request
//! - Without a `RequestFormat` extension, the first concrete media type of
//!   `Accept` is used; wildcards leave the format unset

use axum::http::{header, HeaderMap, Request};

/// Whether a request came from the client or was dispatched internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestKind {
    #[default]
    Main,
    Sub,
}

impl RequestKind {
    pub fn is_main(&self) -> bool {
        matches!(self, RequestKind::Main)
    }
}

/// Negotiated response format (a MIME type such as `text/html`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFormat(pub String);

impl RequestFormat {
    /// Format preferred by the client: the first media range of `Accept`,
    /// without parameters. `*/*` and `type/*` give no format.
    pub fn from_accept(headers: &HeaderMap) -> Option<Self> {
        let accept = headers.get(header::ACCEPT)?.to_str().ok()?;
        let first = accept.split(',').next()?;
        let media = first.split(';').next()?.trim().to_ascii_lowercase();

        match media.split_once('/') {
            Some((kind, sub)) if !kind.is_empty() && !sub.is_empty() && kind != "*" && sub != "*" => {
                Some(Self(media))
            }
            _ => None,
        }
    }
}

/// What the rule engine needs to know about the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub kind: RequestKind,
    pub format: Option<String>,
}

impl RequestContext {
    pub fn main() -> Self {
        Self::default()
    }

    pub fn sub() -> Self {
        Self {
            kind: RequestKind::Sub,
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Read the context from request extensions, falling back to `Accept`
    /// for the format.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let extensions = req.extensions();
        let format = extensions
            .get::<RequestFormat>()
            .cloned()
            .or_else(|| RequestFormat::from_accept(req.headers()));

        Self {
            kind: extensions.get::<RequestKind>().copied().unwrap_or_default(),
            format: format.map(|f| f.0),
        }
    }
}
