//! Startup-time registry of loaded extensions.

use std::sync::Arc;

use crate::config::BundleConfig;
use crate::rules::{RuleSet, RuleSetError};
use crate::svg::{SvgDataCollector, SvgLoader, TraceableLoader};

use super::{
    suggest, ExtensionKind, HtmlExtension, IdentifierKind, SvgExtension, UnknownIdentifier,
    WebpackEncoreExtension,
};

/// An extension built from configuration.
#[derive(Debug)]
pub enum LoadedExtension {
    Html(HtmlExtension),
    Svg(SvgExtension),
    WebpackEncore(WebpackEncoreExtension),
}

impl LoadedExtension {
    pub fn kind(&self) -> ExtensionKind {
        match self {
            LoadedExtension::Html(_) => ExtensionKind::Html,
            LoadedExtension::Svg(_) => ExtensionKind::Svg,
            LoadedExtension::WebpackEncore(_) => ExtensionKind::WebpackEncore,
        }
    }

    fn build(kind: ExtensionKind, config: &BundleConfig) -> Self {
        match kind {
            ExtensionKind::Html => LoadedExtension::Html(HtmlExtension::new(&config.html)),
            ExtensionKind::Svg => LoadedExtension::Svg(SvgExtension::new(&config.svg)),
            ExtensionKind::WebpackEncore => {
                LoadedExtension::WebpackEncore(WebpackEncoreExtension::new(&config.webpack_encore))
            }
        }
    }
}

fn is_enabled(kind: ExtensionKind, config: &BundleConfig) -> bool {
    match kind {
        ExtensionKind::Html => config.html.enabled,
        ExtensionKind::Svg => config.svg.enabled,
        ExtensionKind::WebpackEncore => config.webpack_encore.enabled,
    }
}

/// Everything built from one configuration.
pub struct Registry {
    extensions: Vec<LoadedExtension>,
    rules: Option<Arc<RuleSet>>,
    debug: bool,
    svg_collector: Option<SvgDataCollector>,
    svg_loaders: Vec<(String, Arc<dyn SvgLoader>)>,
}

impl Registry {
    /// Builds the enabled extensions and compiles the enabled header rules.
    pub fn load(config: &BundleConfig) -> Result<Self, RuleSetError> {
        let mut extensions = Vec::new();

        for kind in ExtensionKind::ALL {
            if !is_enabled(kind, config) {
                continue;
            }
            if !kind.is_linked() {
                tracing::warn!(
                    extension = %kind,
                    "Extension is enabled but was not compiled in, skipping"
                );
                continue;
            }
            extensions.push(LoadedExtension::build(kind, config));
        }

        let rules = RuleSet::compile_enabled(&config.http_headers)?;
        let rules = (!rules.is_empty()).then(|| Arc::new(rules));

        let debug = config.server.debug;
        let svg_collector = (debug && extensions.iter().any(|e| e.kind() == ExtensionKind::Svg))
            .then(SvgDataCollector::new);

        tracing::info!(
            extensions = ?extensions.iter().map(|e| e.kind().name()).collect::<Vec<_>>(),
            rules = rules.as_ref().map_or(0, |r| r.len()),
            debug_mode = config.server.debug,
            "Extensions loaded"
        );

        Ok(Self {
            extensions,
            rules,
            debug,
            svg_collector,
            svg_loaders: Vec::new(),
        })
    }

    pub fn extensions(&self) -> &[LoadedExtension] {
        &self.extensions
    }

    pub fn is_loaded(&self, kind: ExtensionKind) -> bool {
        self.extensions.iter().any(|e| e.kind() == kind)
    }

    pub fn html(&self) -> Option<&HtmlExtension> {
        self.extensions.iter().find_map(|e| match e {
            LoadedExtension::Html(ext) => Some(ext),
            _ => None,
        })
    }

    pub fn svg(&self) -> Option<&SvgExtension> {
        self.extensions.iter().find_map(|e| match e {
            LoadedExtension::Svg(ext) => Some(ext),
            _ => None,
        })
    }

    pub fn webpack_encore(&self) -> Option<&WebpackEncoreExtension> {
        self.extensions.iter().find_map(|e| match e {
            LoadedExtension::WebpackEncore(ext) => Some(ext),
            _ => None,
        })
    }

    /// Compiled header rules; `None` when no rule is enabled.
    pub fn rule_set(&self) -> Option<&Arc<RuleSet>> {
        self.rules.as_ref()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Extension providing the filter `name`.
    pub fn filter(&self, name: &str) -> Result<ExtensionKind, UnknownIdentifier> {
        self.lookup(IdentifierKind::Filter, name)
    }

    /// Extension providing the function `name`.
    pub fn function(&self, name: &str) -> Result<ExtensionKind, UnknownIdentifier> {
        self.lookup(IdentifierKind::Function, name)
    }

    fn lookup(&self, kind: IdentifierKind, name: &str) -> Result<ExtensionKind, UnknownIdentifier> {
        if let Some(ext) = self
            .extensions
            .iter()
            .map(LoadedExtension::kind)
            .find(|ext| ext.provides(kind, name))
        {
            return Ok(ext);
        }

        let suggestion = if self.debug { suggest(kind, name) } else { None };
        Err(suggestion.unwrap_or_else(|| UnknownIdentifier::Unknown {
            kind,
            name: name.to_string(),
        }))
    }

    /// Registers a host SVG loader, traced when the collector is active.
    pub fn register_svg_loader<L>(&mut self, name: impl Into<String>, loader: L) -> Arc<dyn SvgLoader>
    where
        L: SvgLoader + 'static,
    {
        let name = name.into();

        let loader: Arc<dyn SvgLoader> = match &mut self.svg_collector {
            Some(collector) => {
                let traced = Arc::new(TraceableLoader::new(loader));
                collector.add_loader(name.clone(), traced.clone());
                tracing::debug!(loader = %name, "Tracing SVG loader");
                traced
            }
            None => Arc::new(loader),
        };

        self.svg_loaders.retain(|(n, _)| *n != name);
        self.svg_loaders.push((name, loader.clone()));
        loader
    }

    pub fn svg_loader(&self, name: &str) -> Option<Arc<dyn SvgLoader>> {
        self.svg_loaders
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, l)| l.clone())
    }

    pub fn svg_collector(&self) -> Option<&SvgDataCollector> {
        self.svg_collector.as_ref()
    }

    pub fn svg_collector_mut(&mut self) -> Option<&mut SvgDataCollector> {
        self.svg_collector.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpHeaderRule, Parameters};
    use crate::svg::{LoaderError, SearchOptions, Svg};

    struct Fixed;

    impl SvgLoader for Fixed {
        fn resolve(&self, ident: &str, _options: &SearchOptions) -> Result<Svg, LoaderError> {
            if ident == "home" {
                Ok(Svg::new("<svg/>"))
            } else {
                Err(LoaderError::NotFound(ident.to_string()))
            }
        }
    }

    fn config(debug: bool) -> BundleConfig {
        let mut config = BundleConfig::default();
        config.server.debug = debug;
        config.finalize(&Parameters::new().with_project_dir("/srv/app"));
        config
    }

    fn rule(name: &str, enabled: bool) -> HttpHeaderRule {
        let mut rule: HttpHeaderRule =
            serde_json::from_value(serde_json::json!({ "name": name, "pattern": "x" })).unwrap();
        rule.enabled = enabled;
        rule
    }

    #[test]
    fn test_loads_enabled_extensions() {
        let mut config = config(false);
        config.html.enabled = false;

        let registry = Registry::load(&config).unwrap();

        assert!(!registry.is_loaded(ExtensionKind::Html));
        assert!(registry.svg().is_some());
        assert!(registry.webpack_encore().is_some());
        assert!(registry.html().is_none());
        assert!(registry.svg_collector().is_none());
    }

    #[test]
    fn test_rule_set_only_with_enabled_rules() {
        let mut config = config(false);
        config.http_headers = vec![rule("X-Off", false)];
        assert!(Registry::load(&config).unwrap().rule_set().is_none());

        config.http_headers.push(rule("X-On", true));
        let registry = Registry::load(&config).unwrap();
        assert_eq!(registry.rule_set().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_rule_fails_load() {
        let mut config = config(false);
        let mut bad = rule("X-Bad", true);
        bad.pattern = Some("/(unclosed/".to_string());
        config.http_headers = vec![bad];

        assert!(Registry::load(&config).is_err());
    }

    #[test]
    fn test_identifier_lookup() {
        let mut config = config(false);
        config.webpack_encore.enabled = false;
        let registry = Registry::load(&config).unwrap();

        assert_eq!(registry.filter("html_compress").unwrap(), ExtensionKind::Html);
        assert_eq!(registry.function("fa").unwrap(), ExtensionKind::Svg);
        assert!(matches!(
            registry.function("encore_entry_js_source"),
            Err(UnknownIdentifier::Unknown { .. })
        ));
    }

    #[test]
    fn test_suggestions_in_debug_mode() {
        let mut config = config(true);
        config.webpack_encore.enabled = false;
        let registry = Registry::load(&config).unwrap();

        let err = registry.function("encore_entry_css_source").unwrap_err();
        assert!(matches!(err, UnknownIdentifier::Suggest { feature: "webpack_encore", .. }));
        assert!(matches!(
            registry.filter("upper"),
            Err(UnknownIdentifier::Unknown { .. })
        ));
    }

    #[test]
    fn test_loaders_are_traced_in_debug_mode() {
        let mut registry = Registry::load(&config(true)).unwrap();

        let loader = registry.register_svg_loader("fixed", Fixed);
        loader.resolve("home", &SearchOptions::new()).unwrap();
        loader.resolve("missing", &SearchOptions::new()).unwrap_err();

        let collector = registry.svg_collector_mut().unwrap();
        collector.late_collect();
        assert_eq!(collector.svg_total_count(), 2);
        assert_eq!(collector.svg_failure_count(), 1);
        assert!(registry.svg_loader("fixed").is_some());
    }

    #[test]
    fn test_loaders_are_plain_outside_debug_mode() {
        let mut registry = Registry::load(&config(false)).unwrap();

        let loader = registry.register_svg_loader("fixed", Fixed);
        assert!(loader.resolve("home", &SearchOptions::new()).is_ok());
        assert!(registry.svg_collector().is_none());
    }
}
