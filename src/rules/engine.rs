//! Ordered rule sets and their application to responses.

use std::fmt;

use axum::http::{header::CONTENT_TYPE, HeaderMap};

use crate::config::HttpHeaderRule;
use crate::http::request::RequestContext;
use crate::http::response::TextResponse;
use crate::rules::rule::{Rule, RuleError};

/// Format assumed when neither the response nor the request declares one.
pub const DEFAULT_FORMAT: &str = "text/html";

/// All errors found while compiling a rule set.
#[derive(Debug)]
pub struct RuleSetError(pub Vec<RuleError>);

impl fmt::Display for RuleSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid header rules: ")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuleSetError {}

/// What applying a rule set did to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No rules, or not a main response.
    Skipped,
    /// The body could not be read as text.
    NotText,
    /// Rules ran.
    Applied {
        /// Rules that were enabled and matched the format.
        rules: usize,
        /// Whether the rewritten body was stored on the response.
        body_rewritten: bool,
    },
}

impl ApplyOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ApplyOutcome::Skipped => "skipped",
            ApplyOutcome::NotText => "not_text",
            ApplyOutcome::Applied {
                body_rewritten: true,
                ..
            } => "rewritten",
            ApplyOutcome::Applied { .. } => "headers_only",
        }
    }
}

/// An ordered, immutable list of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Compile every rule, collecting all errors.
    pub fn compile(configs: &[HttpHeaderRule]) -> Result<Self, RuleSetError> {
        Self::compile_indexed(configs.iter().enumerate())
    }

    /// Compile only the enabled rules. Errors keep the index of the rule
    /// in `configs`.
    pub fn compile_enabled(configs: &[HttpHeaderRule]) -> Result<Self, RuleSetError> {
        Self::compile_indexed(configs.iter().enumerate().filter(|(_, r)| r.enabled))
    }

    fn compile_indexed<'a>(
        configs: impl Iterator<Item = (usize, &'a HttpHeaderRule)>,
    ) -> Result<Self, RuleSetError> {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for (index, config) in configs {
            match Rule::compile(index, config) {
                Ok(rule) => rules.push(rule),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(Self { rules })
        } else {
            Err(RuleSetError(errors))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Apply every rule, in order, to the response.
    pub fn apply<R>(&self, response: &mut R, request: &RequestContext) -> ApplyOutcome
    where
        R: TextResponse + ?Sized,
    {
        if self.rules.is_empty() || !request.kind.is_main() {
            return ApplyOutcome::Skipped;
        }

        let Some(content) = response.content() else {
            return ApplyOutcome::NotText;
        };
        let mut body = content.to_owned();
        let mut changed = false;
        let mut applied = 0;

        let format = effective_format(response.headers(), request.format.as_deref());

        for rule in &self.rules {
            if !rule.is_enabled() || !rule.applies_to(&format) {
                continue;
            }
            applied += 1;

            let rewrite = rule.apply(&body, response.headers_mut());
            crate::observability::metrics::record_rule(rule.name().as_str(), rewrite.matches);

            if let Some(rewritten) = rewrite.body.into_owned_if_changed() {
                body = rewritten;
                changed = true;
            }
        }

        let mut body_rewritten = false;
        if changed {
            match response.set_content(body) {
                Ok(()) => body_rewritten = true,
                Err(e) => {
                    tracing::debug!(error = %e, "Response refused rewritten body, keeping original");
                }
            }
        }

        ApplyOutcome::Applied {
            rules: applied,
            body_rewritten,
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

trait IntoOwnedIfChanged {
    fn into_owned_if_changed(self) -> Option<String>;
}

impl IntoOwnedIfChanged for std::borrow::Cow<'_, str> {
    fn into_owned_if_changed(self) -> Option<String> {
        match self {
            std::borrow::Cow::Owned(s) => Some(s),
            std::borrow::Cow::Borrowed(_) => None,
        }
    }
}

/// Primary MIME type of a response, without parameters.
pub fn effective_format(headers: &HeaderMap, request_format: Option<&str>) -> String {
    let declared = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty());

    let raw = declared.or(request_format).unwrap_or(DEFAULT_FORMAT);
    raw.split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_ascii_lowercase()
}
