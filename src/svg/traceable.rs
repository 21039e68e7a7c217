//! Loader wrapper recording every resolution.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::svg::loader::{short_name, SearchOptions, Svg, SvgLoader, LoaderError};

/// Outcome of a traced resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum TraceValue {
    Resolved(String),
    Failed(String),
}

impl TraceValue {
    pub fn is_failure(&self) -> bool {
        matches!(self, TraceValue::Failed(_))
    }

    /// SVG markup or error message.
    pub fn as_str(&self) -> &str {
        match self {
            TraceValue::Resolved(s) | TraceValue::Failed(s) => s,
        }
    }
}

/// One call to [`SvgLoader::resolve`].
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    /// Call start.
    pub ts0: DateTime<Utc>,
    /// Call end, after the inner loader returned.
    pub ts1: DateTime<Utc>,
    pub loader_type: &'static str,
    pub search_ident: String,
    pub search_options: SearchOptions,
    pub value: TraceValue,
}

/// A loader whose calls can be inspected.
pub trait Traced: Send + Sync {
    fn traces(&self) -> Vec<Trace>;

    fn reset_traces(&self);

    /// Type name of the wrapped loader.
    fn traced_type_name(&self) -> &'static str;
}

/// Wraps a loader and records a [`Trace`] per call.
pub struct TraceableLoader<L> {
    inner: L,
    traces: Mutex<Vec<Trace>>,
}

impl<L: SvgLoader> TraceableLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            traces: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Trace>> {
        // Traces stay readable after a loader panic
        self.traces.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<L: SvgLoader> SvgLoader for TraceableLoader<L> {
    fn resolve(&self, ident: &str, options: &SearchOptions) -> Result<Svg, LoaderError> {
        let loader_type = self.inner.type_name();
        let span = tracing::debug_span!("svg_loader", loader = short_name(loader_type), ident = %ident);
        let _enter = span.enter();

        let ts0 = Utc::now();
        let result = self.inner.resolve(ident, options);
        let ts1 = Utc::now();

        let value = match &result {
            Ok(svg) => TraceValue::Resolved(svg.as_str().to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "SVG resolution failed");
                TraceValue::Failed(e.to_string())
            }
        };

        self.lock().push(Trace {
            ts0,
            ts1,
            loader_type,
            search_ident: ident.to_string(),
            search_options: options.clone(),
            value,
        });

        result
    }

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }
}

impl<L: SvgLoader> Traced for TraceableLoader<L> {
    fn traces(&self) -> Vec<Trace> {
        self.lock().clone()
    }

    fn reset_traces(&self) {
        self.lock().clear();
    }

    fn traced_type_name(&self) -> &'static str {
        self.inner.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyHome;

    impl SvgLoader for OnlyHome {
        fn resolve(&self, ident: &str, _options: &SearchOptions) -> Result<Svg, LoaderError> {
            if ident == "home" {
                Ok(Svg::new("<svg/>"))
            } else {
                Err(LoaderError::NotFound(ident.to_string()))
            }
        }
    }

    #[test]
    fn test_records_success_and_failure() {
        let loader = TraceableLoader::new(OnlyHome);
        let mut options = SearchOptions::new();
        options.insert("class".to_string(), "icon".to_string());

        assert!(loader.resolve("home", &options).is_ok());
        let err = loader.resolve("missing", &SearchOptions::new()).unwrap_err();
        assert_eq!(err, LoaderError::NotFound("missing".to_string()));

        let traces = loader.traces();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].search_ident, "home");
        assert_eq!(traces[0].search_options["class"], "icon");
        assert_eq!(traces[0].value, TraceValue::Resolved("<svg/>".to_string()));
        assert!(traces[1].value.is_failure());
        assert!(traces[1].value.as_str().contains("missing"));
        assert!(traces[0].ts0 <= traces[0].ts1);
    }

    #[test]
    fn test_reset_and_type_name() {
        let loader = TraceableLoader::new(OnlyHome);
        let _ = loader.resolve("home", &SearchOptions::new());
        loader.reset_traces();

        assert!(loader.traces().is_empty());
        assert_eq!(short_name(loader.traced_type_name()), "OnlyHome");
        assert_eq!(short_name(SvgLoader::type_name(&loader)), "OnlyHome");
    }
}
