//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → middleware/http_headers.rs (snapshot rule set, read request context)
//!     → server.rs proxy handler (forward to upstream)
//!     → response.rs (buffer text bodies)
//!     → rules::RuleSet::apply (headers, body rewrite)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::HttpHeadersState;
pub use request::{RequestContext, RequestFormat, RequestKind};
pub use response::{BufferedResponse, Content, ContentError, TextResponse};
pub use server::{HttpServer, ServerError};
