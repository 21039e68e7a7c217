//! Compiled header rules.

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use regex::{Captures, Regex};
use thiserror::Error;

use crate::config::HttpHeaderRule;
use crate::rules::pattern::{compile_pattern, PatternError};
use crate::rules::template::{Template, TemplateError};

/// Errors raised while compiling a rule from configuration.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("http_headers[{index}]: `name` must not be empty")]
    EmptyName { index: usize },

    #[error("http_headers[{index}]: `{name}` is not a valid header name")]
    InvalidName { index: usize, name: String },

    #[error("http_headers[{index}] ({name}): `{field}` must not be empty")]
    EmptyField {
        index: usize,
        name: String,
        field: &'static str,
    },

    #[error("http_headers[{index}] ({name}): invalid pattern: {source}")]
    Pattern {
        index: usize,
        name: String,
        #[source]
        source: PatternError,
    },

    #[error("http_headers[{index}] ({name}): invalid `{field}` template: {source}")]
    Template {
        index: usize,
        name: String,
        field: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error("http_headers[{index}] ({name}): `value` is not a valid header value")]
    InvalidValue { index: usize, name: String },
}

/// What a rule does once it applies.
#[derive(Debug, Clone)]
pub enum Action {
    /// Extract the header value from the body, rewriting every match.
    Extract {
        pattern: Regex,
        value: Template,
        replace: Template,
    },
    /// Set a fixed header value.
    Static { value: HeaderValue },
}

/// A header rule ready to run against response bodies.
#[derive(Debug, Clone)]
pub struct Rule {
    name: HeaderName,
    enabled: bool,
    formats: Option<Vec<String>>,
    action: Action,
}

/// Result of running one rule over a body.
#[derive(Debug)]
pub struct Rewrite<'a> {
    /// The body after substitution; borrowed when nothing matched.
    pub body: Cow<'a, str>,
    /// Number of pattern matches (0 for static rules).
    pub matches: usize,
}

impl Rule {
    /// Compile the rule at position `index` of the configuration.
    pub fn compile(index: usize, config: &HttpHeaderRule) -> Result<Self, RuleError> {
        if config.name.trim().is_empty() {
            return Err(RuleError::EmptyName { index });
        }

        let name = HeaderName::from_bytes(config.name.as_bytes()).map_err(|_| {
            RuleError::InvalidName {
                index,
                name: config.name.clone(),
            }
        })?;

        let empty_field = |field| RuleError::EmptyField {
            index,
            name: config.name.clone(),
            field,
        };

        if config.value.is_empty() {
            return Err(empty_field("value"));
        }

        let action = match &config.pattern {
            Some(pattern) if pattern.is_empty() => return Err(empty_field("pattern")),
            Some(pattern) => {
                let pattern = compile_pattern(pattern).map_err(|source| RuleError::Pattern {
                    index,
                    name: config.name.clone(),
                    source,
                })?;
                let template = |field, source: &str| {
                    Template::compile(source).map_err(|source| RuleError::Template {
                        index,
                        name: config.name.clone(),
                        field,
                        source,
                    })
                };

                Action::Extract {
                    pattern,
                    value: template("value", &config.value)?,
                    replace: template("replace", &config.replace)?,
                }
            }
            None => Action::Static {
                value: HeaderValue::from_bytes(config.value.as_bytes()).map_err(|_| {
                    RuleError::InvalidValue {
                        index,
                        name: config.name.clone(),
                    }
                })?,
            },
        };

        let formats = config.formats.as_ref().map(|formats| {
            formats
                .iter()
                .map(|f| f.trim().to_ascii_lowercase())
                .collect()
        });

        Ok(Self {
            name,
            enabled: config.enabled,
            formats,
            action,
        })
    }

    /// Header set by this rule.
    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Whether the rule runs for responses of the given (normalized) format.
    pub fn applies_to(&self, format: &str) -> bool {
        match &self.formats {
            Some(formats) => formats.iter().any(|f| f == format),
            None => true,
        }
    }

    /// Run the rule over `body`, setting headers in `headers`.
    ///
    /// Does not check `enabled` or formats; the rule set does that.
    pub fn apply<'a>(&self, body: &'a str, headers: &mut HeaderMap) -> Rewrite<'a> {
        match &self.action {
            Action::Static { value } => {
                headers.insert(self.name.clone(), value.clone());
                Rewrite {
                    body: Cow::Borrowed(body),
                    matches: 0,
                }
            }
            Action::Extract {
                pattern,
                value,
                replace,
            } => {
                let mut matches = 0;
                let body = pattern.replace_all(body, |caps: &Captures<'_>| {
                    matches += 1;

                    let rendered = value.render(caps);
                    match HeaderValue::from_bytes(rendered.as_bytes()) {
                        // Last match wins
                        Ok(header) => {
                            headers.insert(self.name.clone(), header);
                        }
                        Err(_) => {
                            tracing::warn!(
                                header = %self.name,
                                value = %rendered,
                                "Extracted value is not a valid header value, skipping"
                            );
                        }
                    }

                    replace.render(caps)
                });

                Rewrite { body, matches }
            }
        }
    }
}
