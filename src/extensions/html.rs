//! HTML extension.

use crate::config::{CompressionLevel, HtmlConfig};

use super::ExtensionKind;

/// Compression settings handed to the `html_compress` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlCompression {
    pub force: bool,
    pub level: CompressionLevel,
}

impl HtmlCompression {
    /// Whether output should be compressed.
    ///
    /// Debug output is left readable unless compression is forced.
    pub fn applies(&self, debug: bool) -> bool {
        self.level != CompressionLevel::None && (self.force || !debug)
    }
}

#[derive(Debug, Clone)]
pub struct HtmlExtension {
    compression: HtmlCompression,
}

impl HtmlExtension {
    pub fn new(config: &HtmlConfig) -> Self {
        Self {
            compression: HtmlCompression {
                force: config.compression.force,
                level: config.compression.level,
            },
        }
    }

    pub fn compression(&self) -> HtmlCompression {
        self.compression
    }

    pub fn filters(&self) -> &'static [&'static str] {
        ExtensionKind::Html.info().filters
    }
}
