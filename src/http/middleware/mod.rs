//! Router middleware.

pub mod http_headers;

pub use http_headers::{http_headers_middleware, HttpHeadersState};
