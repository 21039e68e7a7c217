//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every header rule to surface pattern and template errors
//! - Check server addresses and limits
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: &BundleConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::BundleConfig;
use crate::rules::{Rule, RuleError};

/// A single semantic error in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("server.listen `{0}` is not a socket address")]
    Listen(String),

    #[error("server.upstream `{value}` is not a valid URL: {reason}")]
    Upstream { value: String, reason: String },

    #[error("server.max_body_size must be greater than 0")]
    MaxBodySize,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &BundleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, rule) in config.http_headers.iter().enumerate() {
        if let Err(e) = Rule::compile(index, rule) {
            errors.push(ValidationError::Rule(e));
        }
    }

    if config.server.listen.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Listen(config.server.listen.clone()));
    }

    match Url::parse(&config.server.upstream) {
        Ok(url) if url.host_str().is_none() => errors.push(ValidationError::Upstream {
            value: config.server.upstream.clone(),
            reason: "missing host".to_string(),
        }),
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::Upstream {
                value: config.server.upstream.clone(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            })
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::Upstream {
            value: config.server.upstream.clone(),
            reason: e.to_string(),
        }),
    }

    if config.server.max_body_size == 0 {
        errors.push(ValidationError::MaxBodySize);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
