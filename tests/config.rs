//! Configuration files, end to end.

use std::io::Write;
use std::time::Duration;

use render_extras::config::watcher::ConfigWatcher;
use render_extras::config::{load_config_with, ConfigError, Parameters, ProviderKind};
use render_extras::extensions::{ExtensionKind, Registry};

fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn params() -> Parameters {
    Parameters::new()
        .with_project_dir("/srv/app")
        .with_cache_dir("/srv/app/var/cache")
}

#[test]
fn test_yaml_with_legacy_keys() {
    let file = write_config(
        ".yaml",
        r#"
http_header:
  name: X-Robots-Tag
  pattern: '@<meta name="robots" content="([^"]+)">@i'
  value: '%2$s'
  replace: ''
html: false
svg:
  search_path: ['%kernel.project_dir%/icons']
  fontawesome:
    search_path: []
webpack_encore:
  output_paths: ['%kernel.project_dir%/public/build']
server:
  debug: true
"#,
    );

    let config = load_config_with(file.path(), &params()).unwrap();

    assert_eq!(config.http_headers.len(), 1);
    assert!(!config.html.enabled);
    assert_eq!(
        config.svg.providers.get(ProviderKind::FileSystem).paths(),
        ["/srv/app/icons"]
    );
    // Empty legacy lists fall back to the default search paths
    let font_awesome = config.svg.providers.get(ProviderKind::FontAwesome);
    assert!(font_awesome.enabled);
    assert!(font_awesome.paths()[0].starts_with("/srv/app/node_modules"));
    assert_eq!(config.webpack_encore.output_paths, ["/srv/app/public/build"]);

    let registry = Registry::load(&config).unwrap();
    assert!(!registry.is_loaded(ExtensionKind::Html));
    assert!(registry.svg_collector().is_some());
    assert_eq!(registry.rule_set().unwrap().len(), 1);
}

#[test]
fn test_toml_sections() {
    let file = write_config(
        ".toml",
        r#"
[[http_headers]]
name = "X-Frame-Options"
value = "DENY"

[[http_headers]]
enabled = false
name = "X-Disabled"
value = "x"

[html.compression]
force = true
level = "fastest"

[webpack_encore.builds]
emails = "%kernel.project_dir%/public/emails/entrypoints.json"
"#,
    );

    let config = load_config_with(file.path(), &params()).unwrap();

    assert_eq!(config.enabled_rules().count(), 1);
    assert!(config.html.compression.force);
    assert_eq!(
        config.webpack_encore.builds["emails"],
        "/srv/app/public/emails/entrypoints.json"
    );

    let registry = Registry::load(&config).unwrap();
    let encore = registry.webpack_encore().unwrap();
    assert_eq!(
        encore.collection().builds().collect::<Vec<_>>(),
        ["_default", "emails"]
    );
}

#[test]
fn test_every_error_is_reported() {
    let file = write_config(
        ".yaml",
        r#"
http_headers:
  - name: ''
  - name: X-Bad
    pattern: '(unclosed'
server:
  upstream: 'ftp://example.com'
  max_body_size: 0
"#,
    );

    match load_config_with(file.path(), &params()) {
        Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 4),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_empty_file_uses_defaults() {
    let file = write_config(".yml", "");

    let config = load_config_with(file.path(), &params()).unwrap();

    assert!(config.http_headers.is_empty());
    assert_eq!(config.server.listen, "127.0.0.1:8080");
}

#[tokio::test]
async fn test_watcher_sends_reloaded_config() {
    let file = write_config(".toml", "[[http_headers]]\nname = \"X-A\"\nvalue = \"a\"\n");

    let (watcher, mut updates) = ConfigWatcher::new(file.path(), params());
    let _watcher = watcher.run().unwrap();

    std::fs::write(
        file.path(),
        "[[http_headers]]\nname = \"X-A\"\nvalue = \"a\"\n\n[[http_headers]]\nname = \"X-B\"\nvalue = \"b\"\n",
    )
    .unwrap();

    let config = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let Some(config) = updates.recv().await else {
                panic!("watcher stopped");
            };
            // Editors may write in several steps
            if config.http_headers.len() == 2 {
                return config;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(config.http_headers[1].name, "X-B");
}
