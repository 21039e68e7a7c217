//! SVG extension.

use std::path::PathBuf;

use crate::config::{ProviderKind, SvgConfig};

use super::ExtensionKind;

/// An enabled provider and its search paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgProvider {
    pub kind: ProviderKind,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SvgExtension {
    providers: Vec<SvgProvider>,
    svg_framework: Vec<String>,
    web_component: Vec<String>,
    cache_dir: Option<PathBuf>,
}

impl SvgExtension {
    /// Builds from a finalized configuration.
    pub fn new(config: &SvgConfig) -> Self {
        let providers = config
            .enabled_providers()
            .into_iter()
            .map(|(kind, provider)| SvgProvider {
                kind,
                paths: provider.paths().iter().map(PathBuf::from).collect(),
            })
            .collect();

        let iconify = &config.providers.iconify;
        let cache_dir = match iconify.loader.cache_dir.trim() {
            "" => None,
            dir => Some(PathBuf::from(dir)),
        };

        Self {
            providers,
            svg_framework: iconify.runtime.svg_framework.clone(),
            web_component: iconify.runtime.web_component.clone(),
            cache_dir,
        }
    }

    pub fn providers(&self) -> &[SvgProvider] {
        &self.providers
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&SvgProvider> {
        self.providers.iter().find(|p| p.kind == kind)
    }

    /// Classes replaced by Iconify SVG framework icons.
    pub fn svg_framework(&self) -> &[String] {
        &self.svg_framework
    }

    /// Tags replaced by Iconify web component icons.
    pub fn web_component(&self) -> &[String] {
        &self.web_component
    }

    /// Iconify cache directory, if caching is on.
    pub fn cache_dir(&self) -> Option<&PathBuf> {
        self.cache_dir.as_ref()
    }

    pub fn filters(&self) -> &'static [&'static str] {
        ExtensionKind::Svg.info().filters
    }

    pub fn functions(&self) -> &'static [&'static str] {
        ExtensionKind::Svg.info().functions
    }
}
