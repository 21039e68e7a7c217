//! Configuration schema definitions.
//!
//! This module defines the complete configuration tree. All types derive Serde
//! traits; every field has a default so minimal configs stay minimal.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::extensions::ExtensionKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BundleConfig {
    /// Header rules, applied in order.
    pub http_headers: Vec<HttpHeaderRule>,

    /// HTML extension.
    pub html: HtmlConfig,

    /// SVG extension.
    pub svg: SvgConfig,

    /// Webpack Encore extension.
    pub webpack_encore: WebpackEncoreConfig,

    /// Proxy server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BundleConfig {
    /// Rules that will actually run.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &HttpHeaderRule> {
        self.http_headers.iter().filter(|r| r.enabled)
    }

    /// Post-process after validation: expand placeholders and settle which
    /// SVG providers remain enabled.
    pub fn finalize(&mut self, params: &Parameters) {
        self.svg.finalize(params);

        for path in &mut self.webpack_encore.output_paths {
            *path = params.expand(path);
        }
        for path in self.webpack_encore.builds.values_mut() {
            *path = params.expand(path);
        }
    }
}

/// A response header rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpHeaderRule {
    /// Disabled rules are skipped.
    pub enabled: bool,

    /// Header name (e.g. "X-Robots-Tag").
    pub name: String,

    /// Pattern extracting the value from the body; absent for static headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Header value template.
    pub value: String,

    /// Replacement template for each match.
    pub replace: String,

    /// Response formats the rule is limited to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<String>>,
}

impl Default for HttpHeaderRule {
    fn default() -> Self {
        Self {
            enabled: true,
            name: String::new(),
            pattern: None,
            value: default_template(),
            replace: default_template(),
            formats: None,
        }
    }
}

fn default_template() -> String {
    "%s".to_string()
}

/// HTML extension configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HtmlConfig {
    pub enabled: bool,

    /// Output compression settings.
    pub compression: CompressionConfig,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            enabled: ExtensionKind::Html.is_linked(),
            compression: CompressionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Compress even when the response would not normally be compressed.
    pub force: bool,

    pub level: CompressionLevel,
}

/// HTML compression level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    None,
    Fastest,
    Normal,
    #[default]
    Smallest,
}

/// SVG extension configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SvgConfig {
    pub enabled: bool,

    pub providers: SvgProviders,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            enabled: ExtensionKind::Svg.is_linked(),
            providers: SvgProviders::default(),
        }
    }
}

impl SvgConfig {
    fn finalize(&mut self, params: &Parameters) {
        let mut enabled = 0;

        for (kind, provider) in self.providers.iter_mut() {
            let paths = provider
                .paths
                .take()
                .unwrap_or_else(|| kind.default_paths().iter().map(|p| p.to_string()).collect());

            let paths: Vec<String> = paths
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| params.expand(&p))
                .collect();

            provider.enabled = provider.enabled && !paths.is_empty();
            provider.paths = Some(paths);

            if provider.enabled {
                enabled += 1;
            }
        }

        let cache_dir = &mut self.providers.iconify.loader.cache_dir;
        *cache_dir = params.expand(cache_dir);

        if self.enabled && enabled == 0 {
            tracing::debug!("No SVG provider has a search path, disabling the SVG extension");
        }
        self.enabled = self.enabled && enabled > 0;
    }

    /// Providers left enabled.
    pub fn enabled_providers(&self) -> Vec<(ProviderKind, &ProviderConfig)> {
        self.providers.iter().filter(|(_, p)| p.enabled).collect()
    }
}

/// Known SVG providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    FileSystem,
    FontAwesome,
    Iconify,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::FileSystem,
        ProviderKind::FontAwesome,
        ProviderKind::Iconify,
    ];

    /// Configuration key.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::FileSystem => "file_system",
            ProviderKind::FontAwesome => "font_awesome",
            ProviderKind::Iconify => "iconify",
        }
    }

    /// Human readable name.
    pub fn title(&self) -> &'static str {
        match self {
            ProviderKind::FileSystem => "Local File System",
            ProviderKind::FontAwesome => "FontAwesome",
            ProviderKind::Iconify => "Iconify",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    /// Search paths used when the configuration gives none.
    pub fn default_paths(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::FileSystem => &[
                "%kernel.project_dir%/assets",
                "%kernel.project_dir%/node_modules",
            ],
            ProviderKind::FontAwesome => &[
                "%kernel.project_dir%/node_modules/@fortawesome/fontawesome-pro/svgs",
                "%kernel.project_dir%/node_modules/@fortawesome/fontawesome-free/svgs",
                "%kernel.project_dir%/vendor/fortawesome/font-awesome/svgs/",
            ],
            ProviderKind::Iconify => &[
                "%kernel.project_dir%/node_modules/@iconify-json/",
                "%kernel.project_dir%/node_modules/@iconify/json/",
                "%kernel.project_dir%/vendor/iconify/json/",
            ],
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SvgProviders {
    pub file_system: ProviderConfig,
    pub font_awesome: ProviderConfig,
    pub iconify: IconifyProviderConfig,
}

impl SvgProviders {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::FileSystem => &self.file_system,
            ProviderKind::FontAwesome => &self.font_awesome,
            ProviderKind::Iconify => &self.iconify.provider,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProviderKind, &ProviderConfig)> {
        ProviderKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    fn iter_mut(&mut self) -> [(ProviderKind, &mut ProviderConfig); 3] {
        [
            (ProviderKind::FileSystem, &mut self.file_system),
            (ProviderKind::FontAwesome, &mut self.font_awesome),
            (ProviderKind::Iconify, &mut self.iconify.provider),
        ]
    }
}

/// Settings shared by every SVG provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,

    /// Search paths; `None` means the provider defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            paths: None,
        }
    }
}

impl ProviderConfig {
    pub fn paths(&self) -> &[String] {
        self.paths.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IconifyProviderConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,

    pub loader: IconifyLoaderConfig,

    pub runtime: IconifyRuntimeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IconifyLoaderConfig {
    /// Cache directory; empty disables the cache.
    pub cache_dir: String,
}

impl Default for IconifyLoaderConfig {
    fn default() -> Self {
        Self {
            cache_dir: "%kernel.cache_dir%/iconify".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IconifyRuntimeConfig {
    /// Classes rendered server side as SVG framework icons.
    pub svg_framework: Vec<String>,

    /// Tags rendered server side as web component icons.
    pub web_component: Vec<String>,
}

impl Default for IconifyRuntimeConfig {
    fn default() -> Self {
        Self {
            svg_framework: vec!["iconify".to_string(), "iconify-inline".to_string()],
            web_component: vec!["icon".to_string(), "iconify-icon".to_string()],
        }
    }
}

/// Webpack Encore extension configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebpackEncoreConfig {
    pub enabled: bool,

    /// Directories where Encore writes its output.
    pub output_paths: Vec<String>,

    /// Extra builds: name to `entrypoints.json` path.
    pub builds: BTreeMap<String, String>,
}

impl Default for WebpackEncoreConfig {
    fn default() -> Self {
        Self {
            enabled: ExtensionKind::WebpackEncore.is_linked(),
            output_paths: vec!["%kernel.project_dir%/public/build".to_string()],
            builds: BTreeMap::new(),
        }
    }
}

/// Proxy server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub listen: String,

    /// Upstream base URL.
    pub upstream: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Largest body buffered for rewriting, in bytes.
    pub max_body_size: usize,

    /// Enables extension suggestions and the SVG profiler.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            upstream: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
            debug: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Values substituted for `%kernel.*%` placeholders.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    pub project_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Replace known placeholders; unknown ones are kept verbatim.
    pub fn expand(&self, value: &str) -> String {
        let mut out = value.to_string();
        if let Some(dir) = &self.project_dir {
            out = out.replace("%kernel.project_dir%", &dir.to_string_lossy());
        }
        if let Some(dir) = &self.cache_dir {
            out = out.replace("%kernel.cache_dir%", &dir.to_string_lossy());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_defaults() {
        let rule: HttpHeaderRule = serde_json::from_value(serde_json::json!({
            "name": "X-UA-Compatible",
            "pattern": "x",
        }))
        .unwrap();

        assert!(rule.enabled);
        assert_eq!(rule.value, "%s");
        assert_eq!(rule.replace, "%s");
        assert!(rule.formats.is_none());
    }

    #[test]
    fn test_compression_level_names() {
        let config: HtmlConfig = serde_json::from_value(serde_json::json!({
            "compression": { "level": "fastest" }
        }))
        .unwrap();

        assert_eq!(config.compression.level, CompressionLevel::Fastest);
        assert!(!config.compression.force);
        assert!(serde_json::from_value::<HtmlConfig>(serde_json::json!({
            "compression": { "level": "extreme" }
        }))
        .is_err());
    }

    #[test]
    fn test_iconify_flattened_fields() {
        let providers: SvgProviders = serde_json::from_value(serde_json::json!({
            "iconify": { "enabled": false, "paths": ["/icons"], "loader": { "cache_dir": "" } }
        }))
        .unwrap();

        assert!(!providers.iconify.provider.enabled);
        assert_eq!(providers.iconify.provider.paths(), ["/icons"]);
        assert_eq!(providers.iconify.loader.cache_dir, "");
        assert_eq!(providers.iconify.runtime.web_component, ["icon", "iconify-icon"]);
    }

    #[test]
    fn test_svg_finalize_drops_empty_paths() {
        let mut svg = SvgConfig::default();
        svg.providers.file_system.paths = Some(vec!["".to_string(), "/srv/icons".to_string()]);
        svg.providers.font_awesome.paths = Some(vec![" ".to_string()]);
        svg.providers.iconify.provider.enabled = false;

        svg.finalize(&Parameters::new());

        assert!(svg.enabled);
        assert_eq!(svg.providers.file_system.paths(), ["/srv/icons"]);
        assert!(!svg.providers.font_awesome.enabled);
        assert!(!svg.providers.iconify.provider.enabled);
        assert_eq!(svg.enabled_providers().len(), 1);
    }

    #[test]
    fn test_svg_disabled_without_providers() {
        let mut svg = SvgConfig::default();
        for (_, provider) in svg.providers.iter_mut() {
            provider.paths = Some(Vec::new());
        }

        svg.finalize(&Parameters::new());
        assert!(!svg.enabled);
    }

    #[test]
    fn test_finalize_expands_placeholders() {
        let mut config = BundleConfig::default();
        config.finalize(&Parameters::new().with_project_dir("/app").with_cache_dir("/tmp/cache"));

        assert_eq!(config.webpack_encore.output_paths, ["/app/public/build"]);
        assert_eq!(config.svg.providers.file_system.paths(), ["/app/assets", "/app/node_modules"]);
        assert_eq!(config.svg.providers.iconify.loader.cache_dir, "/tmp/cache/iconify");
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let params = Parameters::new().with_project_dir("/app");
        assert_eq!(params.expand("%kernel.cache_dir%/x"), "%kernel.cache_dir%/x");
        assert_eq!(params.expand("%kernel.project_dir%/x"), "/app/x");
    }
}
