//! SVG loader interface.
//!
//! Resolving icons is up to the host; this crate only wraps loaders for
//! profiling.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Options passed along with an icon identifier.
pub type SearchOptions = BTreeMap<String, String>;

/// A resolved SVG document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Svg(String);

impl Svg {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Svg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors a loader may report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoaderError {
    #[error("unable to find an SVG for \"{0}\"")]
    NotFound(String),

    #[error("invalid SVG for \"{ident}\": {reason}")]
    Invalid { ident: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Something that turns an identifier into an SVG.
pub trait SvgLoader: Send + Sync {
    fn resolve(&self, ident: &str, options: &SearchOptions) -> Result<Svg, LoaderError>;

    /// Type name reported by the profiler.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<L: SvgLoader + ?Sized> SvgLoader for Arc<L> {
    fn resolve(&self, ident: &str, options: &SearchOptions) -> Result<Svg, LoaderError> {
        (**self).resolve(ident, options)
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<L: SvgLoader + ?Sized> SvgLoader for Box<L> {
    fn resolve(&self, ident: &str, options: &SearchOptions) -> Result<Svg, LoaderError> {
        (**self).resolve(ident, options)
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

/// Last path segment of a type name, without generic arguments.
pub fn short_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}
