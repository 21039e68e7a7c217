//! Response header rules, SVG loader profiling and Encore asset lookup for
//! template-rendering web stacks.

pub mod config;
pub mod encore;
pub mod extensions;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rules;
pub mod svg;

pub use config::BundleConfig;
pub use extensions::Registry;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rules::RuleSet;
