//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::normalize::normalize;
use crate::config::schema::{BundleConfig, Parameters};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Yaml(serde_yaml::Error),
    Schema(serde_json::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Toml(e) => write!(f, "Parse error: {}", e),
            ConfigError::Yaml(e) => write!(f, "Parse error: {}", e),
            ConfigError::Schema(e) => write!(f, "Invalid configuration: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Syntax of a configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Guess from the file extension; anything but `.yaml`/`.yml` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Toml,
        }
    }
}

/// Parse, normalize, validate and finalize configuration text.
pub fn parse_config(
    content: &str,
    format: ConfigFormat,
    params: &Parameters,
) -> Result<BundleConfig, ConfigError> {
    let tree: Value = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(ConfigError::Toml)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(ConfigError::Yaml)?,
    };

    // An empty YAML document
    let tree = if tree.is_null() {
        Value::Object(Default::default())
    } else {
        tree
    };

    let mut config: BundleConfig =
        serde_json::from_value(normalize(tree)).map_err(ConfigError::Schema)?;

    validate_config(&config).map_err(ConfigError::Validation)?;
    config.finalize(params);

    Ok(config)
}

/// Load and validate configuration from a TOML or YAML file.
pub fn load_config(path: &Path) -> Result<BundleConfig, ConfigError> {
    load_config_with(path, &Parameters::default())
}

/// Like [`load_config`], substituting `%kernel.*%` placeholders.
pub fn load_config_with(path: &Path, params: &Parameters) -> Result<BundleConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content, ConfigFormat::from_path(path), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Toml);
    }

    #[test]
    fn test_parse_toml() {
        let config = parse_config(
            r#"
            [[http_headers]]
            name = "X-Robots-Tag"
            pattern = '<meta name="robots" content="([^"]+)">'
            value = "%2$s"
            replace = ""
            formats = ["text/html"]

            [server]
            upstream = "http://127.0.0.1:4000"
            "#,
            ConfigFormat::Toml,
            &Parameters::default(),
        )
        .unwrap();

        assert_eq!(config.http_headers.len(), 1);
        assert_eq!(config.http_headers[0].value, "%2$s");
        assert_eq!(config.server.upstream, "http://127.0.0.1:4000");
        assert_eq!(config.server.listen, "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_yaml_with_legacy_keys() {
        let config = parse_config(
            r#"
http_header:
  name: X-UA-Compatible
  value: IE=edge
html: false
svg:
  search_path: ["/icons"]
"#,
            ConfigFormat::Yaml,
            &Parameters::default(),
        )
        .unwrap();

        assert_eq!(config.http_headers[0].name, "X-UA-Compatible");
        assert!(!config.html.enabled);
        assert_eq!(config.svg.providers.file_system.paths(), ["/icons"]);
    }

    #[test]
    fn test_parse_empty_documents() {
        let params = Parameters::default();
        assert!(parse_config("", ConfigFormat::Toml, &params).is_ok());
        assert!(parse_config("", ConfigFormat::Yaml, &params).is_ok());
    }

    #[test]
    fn test_schema_and_validation_errors() {
        let params = Parameters::default();

        let err = parse_config("http_headers = 3", ConfigFormat::Toml, &params).unwrap_err();
        assert!(matches!(err, ConfigError::Schema(_)));

        let err = parse_config("[[http_headers]]\nvalue = \"x\"", ConfigFormat::Toml, &params)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));

        let err = parse_config("http_headers: [", ConfigFormat::Yaml, &params).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
