//! Normalization of the raw configuration tree.
//!
//! Runs on the generic value tree before it is deserialized, so that
//! shorthands and keys from older releases end up in the current shape.
//!
//! # Design Decisions
//! - Each step is a pure function over the tree, applied in a fixed order
//! - Legacy keys are removed once migrated and reported with `warn!`
//! - Values that are not in the expected shape are left alone; deserialization
//!   reports them

use serde_json::{Map, Value};

use crate::config::schema::ProviderKind;

/// Extension sections accepting the `true`/`false`/`null` shorthand.
const SECTIONS: [&str; 3] = ["html", "svg", "webpack_encore"];

/// Apply every normalization step, in order.
pub fn normalize(mut value: Value) -> Value {
    if let Value::Object(root) = &mut value {
        merge_http_header_alias(root);
        expand_rule_shorthands(root);
        expand_section_shorthands(root);
        migrate_svg_legacy(root);
    }
    value
}

/// `http_header` (single rule or list) is merged into `http_headers`.
pub fn merge_http_header_alias(root: &mut Map<String, Value>) {
    let Some(alias) = root.remove("http_header") else {
        return;
    };

    let rules = root
        .entry("http_headers")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(rules) = rules else {
        tracing::warn!("`http_headers` is not a list, ignoring `http_header`");
        return;
    };

    match alias {
        Value::Array(items) => rules.extend(items),
        single => rules.push(single),
    }
}

/// `false` becomes `{enabled: false}`; `true` and `null` become `{enabled: true}`.
pub fn expand_rule_shorthands(root: &mut Map<String, Value>) {
    if let Some(Value::Array(rules)) = root.get_mut("http_headers") {
        for rule in rules.iter_mut() {
            expand_enabled_shorthand(rule);
        }
    }
}

/// Same shorthand for extension sections and SVG providers.
pub fn expand_section_shorthands(root: &mut Map<String, Value>) {
    for section in SECTIONS {
        if let Some(value) = root.get_mut(section) {
            expand_enabled_shorthand(value);
        }
    }

    if let Some(Value::Object(providers)) = root
        .get_mut("svg")
        .and_then(|svg| svg.get_mut("providers"))
    {
        for provider in providers.values_mut() {
            expand_enabled_shorthand(provider);
        }
    }
}

fn expand_enabled_shorthand(value: &mut Value) {
    let enabled = match value {
        Value::Bool(enabled) => *enabled,
        Value::Null => true,
        _ => return,
    };

    let mut object = Map::new();
    object.insert("enabled".to_string(), Value::Bool(enabled));
    *value = Value::Object(object);
}

/// Move `search_path` (1.2), `fontawesome.search_path` (1.2) and `finders`
/// (1.3) into `providers`.
pub fn migrate_svg_legacy(root: &mut Map<String, Value>) {
    let Some(Value::Object(svg)) = root.get_mut("svg") else {
        return;
    };

    let mut finders = match svg.remove("finders") {
        Some(Value::Object(finders)) => {
            deprecated("svg.finders", "1.3", "svg.providers");
            finders
        }
        Some(other) => {
            tracing::warn!(value = %other, "Ignoring malformed `svg.finders`");
            Map::new()
        }
        None => Map::new(),
    };

    if let Some(search_path) = svg.remove("search_path") {
        deprecated("svg.search_path", "1.2", "svg.providers.file_system");
        fill_missing(&mut finders, "default", search_path);
    }

    if let Some(fontawesome) = svg.remove("fontawesome") {
        deprecated("svg.fontawesome", "1.2", "svg.providers.font_awesome");
        if let Value::Object(mut fontawesome) = fontawesome {
            if let Some(search_path) = fontawesome.remove("search_path") {
                fill_missing(&mut finders, "fontawesome", search_path);
            }
        }
    }

    if finders.is_empty() {
        return;
    }

    let providers = svg
        .entry("providers")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(providers) = providers else {
        return;
    };

    for (key, paths) in finders {
        if is_empty(&paths) {
            continue;
        }

        let provider = match key.as_str() {
            "default" => ProviderKind::FileSystem,
            "fontawesome" => ProviderKind::FontAwesome,
            other => match ProviderKind::from_key(other) {
                Some(kind) => kind,
                None => {
                    tracing::warn!(finder = %other, "Unknown SVG finder, dropping its paths");
                    continue;
                }
            },
        };

        let entry = providers
            .entry(provider.key())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(entry) = entry {
            fill_missing(entry, "paths", paths);
        }
    }
}

/// Set `key` unless it already holds a non-null value.
fn fill_missing(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get(key) {
        Some(existing) if !existing.is_null() => {}
        _ => {
            map.insert(key.to_string(), value);
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn deprecated(key: &str, since: &str, replacement: &str) {
    tracing::warn!(
        key = %key,
        since = %since,
        replacement = %replacement,
        "Configuration key is deprecated"
    );
}
