//! SVG loader profiling.
//!
//! # Data Flow
//! ```text
//! host loader
//!     → TraceableLoader (records a Trace per resolve)
//!     → SvgDataCollector::late_collect (group, count, sort)
//!     → CollectedData (serialized for a debug panel)
//! ```

pub mod collector;
pub mod loader;
pub mod traceable;

pub use collector::{natural_cmp, CollectedData, Counters, SvgDataCollector, SvgInstance, TraceLevel};
pub use loader::{LoaderError, SearchOptions, Svg, SvgLoader};
pub use traceable::{Trace, TraceValue, TraceableLoader, Traced};
