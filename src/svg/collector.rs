//! SVG profiler data.
//!
//! # Responsibilities
//! - Gather the traces of every registered loader
//! - Group them per searched icon, keeping the best outcome
//! - Count outcomes per loader and overall
//!
//! # Design Decisions
//! - Collection happens late, once the response is done
//! - Identifiers and loader names sort naturally, ignoring case
//! - A later trace for the same search on the same loader replaces the earlier one

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::svg::traceable::{Trace, Traced};

/// Outcome class of a trace, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Success,
    Warning,
    Failure,
}

impl TraceLevel {
    pub const ALL: [TraceLevel; 3] = [TraceLevel::Success, TraceLevel::Warning, TraceLevel::Failure];

    /// Position in [`TraceLevel::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TraceLevel::Success => "success",
            TraceLevel::Warning => "warning",
            TraceLevel::Failure => "failure",
        }
    }
}

/// Counts per [`TraceLevel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub success: usize,
    pub warning: usize,
    pub failure: usize,
}

impl Counters {
    pub fn increment(&mut self, level: TraceLevel) {
        match level {
            TraceLevel::Success => self.success += 1,
            TraceLevel::Warning => self.warning += 1,
            TraceLevel::Failure => self.failure += 1,
        }
    }

    pub fn get(&self, level: TraceLevel) -> usize {
        match level {
            TraceLevel::Success => self.success,
            TraceLevel::Warning => self.warning,
            TraceLevel::Failure => self.failure,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.warning + self.failure
    }
}

/// A loader trace tagged for display.
#[derive(Debug, Clone, Serialize)]
pub struct CollectedTrace {
    pub key: String,
    pub timestamp: String,
    pub ts0: DateTime<Utc>,
    pub ts1: DateTime<Utc>,
    pub loader_name: String,
    pub loader_type: &'static str,
    pub search_ident: String,
    /// Options sorted by key.
    pub search_options: Vec<(String, String)>,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: TraceLevel,
    pub level: usize,
}

/// Everything known about one searched identifier.
#[derive(Debug, Clone, Serialize)]
pub struct SvgInstance {
    pub key: String,
    pub timestamp: String,
    pub ts0: DateTime<Utc>,
    pub ts1: DateTime<Utc>,
    pub loader_name: String,
    pub search_ident: String,
    /// Best outcome seen.
    pub value: String,
    #[serde(rename = "type")]
    pub kind: TraceLevel,
    pub level: usize,
    pub traces: Vec<CollectedTrace>,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoaderSummary {
    #[serde(rename = "class")]
    pub type_name: &'static str,
    pub counters: Counters,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SvgData {
    pub instances: Vec<SvgInstance>,
    pub counters: Counters,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoaderData {
    pub instances: BTreeMap<String, LoaderSummary>,
    pub counters: Counters,
}

/// Data gathered by [`SvgDataCollector::late_collect`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectedData {
    pub svg: SvgData,
    pub loaders: LoaderData,
}

/// Profiler panel data for SVG loaders.
#[derive(Default)]
pub struct SvgDataCollector {
    loaders: Vec<(String, Arc<dyn Traced>)>,
    data: CollectedData,
}

impl SvgDataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a traced loader; a loader with the same name is replaced.
    pub fn add_loader(&mut self, name: impl Into<String>, loader: Arc<dyn Traced>) {
        let name = name.into();
        match self.loaders.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = loader,
            None => self.loaders.push((name, loader)),
        }
    }

    pub fn name(&self) -> &'static str {
        "svg"
    }

    /// Build the panel data from every loader's traces.
    pub fn late_collect(&mut self) {
        let mut data = CollectedData::default();

        for trace in self.gather() {
            let level = trace.kind;

            let loader = data
                .loaders
                .instances
                .entry(trace.loader_name.clone())
                .or_insert_with(|| LoaderSummary {
                    type_name: trace.loader_type,
                    counters: Counters::default(),
                });
            loader.counters.increment(level);
            data.loaders.counters.increment(level);

            let position = data
                .svg
                .instances
                .iter()
                .position(|i| i.key == trace.search_ident);
            let instance = match position {
                Some(index) => &mut data.svg.instances[index],
                None => {
                    data.svg.instances.push(SvgInstance {
                        key: trace.search_ident.clone(),
                        timestamp: trace.timestamp.clone(),
                        ts0: trace.ts0,
                        ts1: trace.ts1,
                        loader_name: trace.loader_name.clone(),
                        search_ident: trace.search_ident.clone(),
                        value: trace.value.clone(),
                        kind: trace.kind,
                        level: trace.level,
                        traces: Vec::new(),
                        counters: Counters::default(),
                    });
                    let last = data.svg.instances.len() - 1;
                    &mut data.svg.instances[last]
                }
            };

            // Keep the best resolution
            if trace.level < instance.level {
                instance.value = trace.value.clone();
                instance.kind = trace.kind;
                instance.level = trace.level;
            }
            instance.counters.increment(level);

            match instance.traces.iter_mut().find(|t| t.key == trace.key) {
                Some(existing) => *existing = trace,
                None => instance.traces.push(trace),
            }
        }

        data.svg.instances.sort_by(|x, y| {
            natural_cmp(&x.search_ident, &y.search_ident)
                .then_with(|| x.ts1.cmp(&y.ts1))
                .then_with(|| natural_cmp(&x.loader_name, &y.loader_name))
        });

        for instance in &data.svg.instances {
            data.svg.counters.increment(instance.kind);
        }

        self.data = data;
    }

    /// All loader traces, tagged and sorted by end time then loader name.
    fn gather(&self) -> Vec<CollectedTrace> {
        let mut logs = Vec::new();

        for (name, loader) in &self.loaders {
            for trace in loader.traces() {
                logs.push(tag(name, loader.traced_type_name(), trace));
            }
        }

        logs.sort_by(|x, y| {
            x.ts1
                .cmp(&y.ts1)
                .then_with(|| natural_cmp(&x.loader_name, &y.loader_name))
        });
        logs
    }

    /// Forget collected data and every loader's traces.
    pub fn reset(&mut self) {
        self.data = CollectedData::default();
        for (_, loader) in &self.loaders {
            loader.reset_traces();
        }
    }

    pub fn data(&self) -> &CollectedData {
        &self.data
    }

    pub fn svg(&self) -> &[SvgInstance] {
        &self.data.svg.instances
    }

    pub fn svg_total_count(&self) -> usize {
        self.data.svg.instances.len()
    }

    pub fn svg_success_count(&self) -> usize {
        self.data.svg.counters.success
    }

    pub fn svg_warning_count(&self) -> usize {
        self.data.svg.counters.warning
    }

    pub fn svg_failure_count(&self) -> usize {
        self.data.svg.counters.failure
    }

    /// Loader names with their type names.
    pub fn loaders(&self) -> Vec<(&str, &'static str)> {
        self.data
            .loaders
            .instances
            .iter()
            .map(|(name, summary)| (name.as_str(), summary.type_name))
            .collect()
    }

    /// Counters of one loader, or of all loaders when `name` is `None`.
    pub fn loader_counters(&self, name: Option<&str>) -> Counters {
        match name {
            None => self.data.loaders.counters,
            Some(name) => self
                .data
                .loaders
                .instances
                .get(name)
                .map(|summary| summary.counters)
                .unwrap_or_default(),
        }
    }

    pub fn loader_total_count(&self, name: Option<&str>) -> usize {
        self.loader_counters(name).total()
    }

    pub fn loader_success_count(&self, name: Option<&str>) -> usize {
        self.loader_counters(name).success
    }

    pub fn loader_warning_count(&self, name: Option<&str>) -> usize {
        self.loader_counters(name).warning
    }

    pub fn loader_failure_count(&self, name: Option<&str>) -> usize {
        self.loader_counters(name).failure
    }

    /// Collected data as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.data).unwrap_or_default()
    }
}

fn tag(loader_name: &str, loader_type: &'static str, trace: Trace) -> CollectedTrace {
    let kind = if trace.value.is_failure() {
        TraceLevel::Failure
    } else {
        TraceLevel::Success
    };

    let mut search_options: Vec<(String, String)> = trace.search_options.into_iter().collect();
    search_options.sort_by(|x, y| natural_cmp(&x.0, &y.0));

    let key = serde_json::to_string(&(&trace.search_ident, &search_options, loader_name))
        .unwrap_or_default();

    CollectedTrace {
        key,
        timestamp: trace.ts1.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string(),
        ts0: trace.ts0,
        ts1: trace.ts1,
        loader_name: loader_name.to_string(),
        loader_type,
        search_ident: trace.search_ident,
        search_options,
        value: trace.value.as_str().to_string(),
        kind,
        level: kind.index(),
    }
}

/// Natural order, ignoring case: `icon2` sorts before `icon10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x = take_digits(&mut a);
                let y = take_digits(&mut b);
                let (xt, yt) = (x.trim_start_matches('0'), y.trim_start_matches('0'));

                let order = xt.len().cmp(&yt.len()).then_with(|| xt.cmp(yt));
                if order != Ordering::Equal {
                    return order;
                }
            }
            (Some(x), Some(y)) => {
                a.next();
                b.next();
                let order = x.to_lowercase().cmp(y.to_lowercase());
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}
