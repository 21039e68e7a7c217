//! Logs and metrics.
//!
//! # Data Flow
//! ```text
//! rules::RuleSet::apply ──▶ metrics::record_rule
//! header middleware     ──▶ metrics::record_response
//! proxy handler         ──▶ metrics::record_upstream
//! every module          ──▶ tracing events ──▶ logging.rs subscriber (text or JSON)
//! ```
//!
//! # Design Decisions
//! - Recording is a no-op until the Prometheus exporter is installed
//! - `RUST_LOG` takes precedence over `observability.log_level`

pub mod logging;
pub mod metrics;
