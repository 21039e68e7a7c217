//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/YAML)
//!     → loader.rs (parse into a value tree)
//!     → normalize.rs (shorthands, legacy keys)
//!     → schema.rs (deserialize with defaults)
//!     → validation.rs (semantic checks, all errors at once)
//!     → BundleConfig::finalize (placeholders, SVG providers)
//!
//! On file change:
//!     watcher.rs detects change
//!     → same pipeline
//!     → new config sent to the server
//!     → rule set swapped atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a reload only swaps the header rules
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod normalize;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_with, parse_config, ConfigError, ConfigFormat};
pub use schema::{
    BundleConfig, CompressionLevel, HtmlConfig, HttpHeaderRule, ObservabilityConfig, Parameters,
    ProviderConfig, ProviderKind, ServerConfig, SvgConfig, WebpackEncoreConfig,
};
pub use validation::ValidationError;
