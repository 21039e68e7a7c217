//! Header rule engine.
//!
//! Rules copy values out of rendered response bodies into response headers,
//! optionally rewriting the matched markup, or set fixed headers.
//!
//! # Data Flow
//! ```text
//! HttpHeaderRule (config)
//!     → Rule::compile (pattern + templates)
//!     → RuleSet (ordered, shared behind Arc)
//!     → RuleSet::apply(response, request)
//! ```
//!
//! # Design Decisions
//! - Rules are compiled once; a bad rule is a load-time error
//! - Rules run in order, each on the body left by the previous one
//! - Only main requests are processed

pub mod engine;
pub mod pattern;
pub mod rule;
pub mod template;

pub use engine::{effective_format, ApplyOutcome, RuleSet, RuleSetError, DEFAULT_FORMAT};
pub use pattern::{compile_pattern, PatternError};
pub use rule::{Action, Rewrite, Rule, RuleError};
pub use template::{Template, TemplateError};
