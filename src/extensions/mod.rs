//! Template extensions and their registry.
//!
//! # Responsibilities
//! - Describe the known extensions and the filters/functions they provide
//! - Build the enabled extensions from configuration
//! - Suggest the missing extension when a template uses one of its identifiers
//!
//! # Design Decisions
//! - The catalog is static; an extension is available only when its Cargo
//!   feature is compiled in
//! - Suggestions are only offered in debug mode

use std::fmt;

use thiserror::Error;

pub mod html;
pub mod registry;
pub mod svg;
pub mod webpack_encore;

pub use html::{HtmlCompression, HtmlExtension};
pub use registry::{LoadedExtension, Registry};
pub use svg::{SvgExtension, SvgProvider};
pub use webpack_encore::WebpackEncoreExtension;

/// The known extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionKind {
    Html,
    Svg,
    WebpackEncore,
}

/// Static description of an extension.
#[derive(Debug)]
pub struct ExtensionInfo {
    /// Configuration section and Cargo feature name.
    pub name: &'static str,
    /// Name shown in suggestions.
    pub class_name: &'static str,
    pub filters: &'static [&'static str],
    pub functions: &'static [&'static str],
}

static CATALOG: [ExtensionInfo; 3] = [
    ExtensionInfo {
        name: "html",
        class_name: "HtmlExtension",
        filters: &["html_attributes", "html_compress"],
        functions: &[],
    },
    ExtensionInfo {
        name: "svg",
        class_name: "SvgExtension",
        filters: &["svg_symbols", "fontawesome"],
        functions: &["fa", "svg"],
    },
    ExtensionInfo {
        name: "webpack_encore",
        class_name: "WebpackEncoreExtension",
        filters: &[],
        functions: &["encore_entry_css_source", "encore_entry_js_source"],
    },
];

impl ExtensionKind {
    pub const ALL: [ExtensionKind; 3] = [
        ExtensionKind::Html,
        ExtensionKind::Svg,
        ExtensionKind::WebpackEncore,
    ];

    pub fn info(&self) -> &'static ExtensionInfo {
        match self {
            ExtensionKind::Html => &CATALOG[0],
            ExtensionKind::Svg => &CATALOG[1],
            ExtensionKind::WebpackEncore => &CATALOG[2],
        }
    }

    pub fn name(&self) -> &'static str {
        self.info().name
    }

    /// Whether the extension was compiled in.
    pub fn is_linked(&self) -> bool {
        match self {
            ExtensionKind::Html => cfg!(feature = "html"),
            ExtensionKind::Svg => cfg!(feature = "svg"),
            ExtensionKind::WebpackEncore => cfg!(feature = "webpack_encore"),
        }
    }

    /// Whether the extension provides `name` as an identifier of `kind`.
    pub fn provides(&self, kind: IdentifierKind, name: &str) -> bool {
        let info = self.info();
        match kind {
            IdentifierKind::Filter => info.filters.iter().any(|f| *f == name),
            IdentifierKind::Function => info.functions.iter().any(|f| *f == name),
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Template identifier namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Filter,
    Function,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Filter => f.write_str("filter"),
            IdentifierKind::Function => f.write_str("function"),
        }
    }
}

/// A filter or function no loaded extension provides.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnknownIdentifier {
    #[error("The \"{name}\" {kind} is part of the {class_name}, which is not installed/enabled; try enabling the \"{feature}\" feature or its configuration section.")]
    Suggest {
        kind: IdentifierKind,
        name: String,
        class_name: &'static str,
        feature: &'static str,
    },

    #[error("Unknown \"{name}\" {kind}.")]
    Unknown { kind: IdentifierKind, name: String },
}

/// The suggestion for `name`, if a known extension provides it.
pub fn suggest(kind: IdentifierKind, name: &str) -> Option<UnknownIdentifier> {
    ExtensionKind::ALL
        .into_iter()
        .find(|ext| ext.provides(kind, name))
        .map(|ext| UnknownIdentifier::Suggest {
            kind,
            name: name.to_string(),
            class_name: ext.info().class_name,
            feature: ext.info().name,
        })
}

pub fn suggest_filter(name: &str) -> Option<UnknownIdentifier> {
    suggest(IdentifierKind::Filter, name)
}

pub fn suggest_function(name: &str) -> Option<UnknownIdentifier> {
    suggest(IdentifierKind::Function, name)
}
