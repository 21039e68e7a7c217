//! End-to-end tests through a running proxy.

use std::time::Duration;

use render_extras::config::BundleConfig;
use render_extras::http::HttpServer;

mod common;

use common::{client, closed_port, config_for, rule, start_mock_upstream, start_proxy, Canned};

const PAGE: &str = r#"<head><meta name="robots" content="noindex, nofollow"></head>"#;
const ROBOTS_PATTERN: &str = r#"<meta name="robots" content="([^"]*)">"#;

#[tokio::test]
async fn test_rules_apply_to_proxied_responses() {
    let upstream = start_mock_upstream(Canned::html(PAGE)).await;
    let proxy = start_proxy(config_for(
        upstream,
        vec![
            rule("X-Robots-Tag", Some(ROBOTS_PATTERN), "%2$s", ""),
            rule("X-Frame-Options", None, "DENY", "%s"),
        ],
    ))
    .await;

    let res = client().get(proxy.url("/page?x=1")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-robots-tag"], "noindex, nofollow");
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.text().await.unwrap(), "<head></head>");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_format_filter_through_proxy() {
    let upstream =
        start_mock_upstream(Canned::html(PAGE).with_content_type("application/pdf")).await;
    let mut html_only = rule("X-Robots-Tag", Some(ROBOTS_PATTERN), "%2$s", "");
    html_only.formats = Some(vec!["text/html".to_string()]);
    let proxy = start_proxy(config_for(upstream, vec![html_only])).await;

    let res = client().get(proxy.url("/doc.pdf")).send().await.unwrap();

    assert!(res.headers().get("x-robots-tag").is_none());
    assert_eq!(res.text().await.unwrap(), PAGE);

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_rules_apply_to_chunked_upstream() {
    let upstream = start_mock_upstream(Canned::html(PAGE).chunked()).await;
    let proxy = start_proxy(config_for(
        upstream,
        vec![
            rule("X-Robots-Tag", Some(ROBOTS_PATTERN), "%2$s", ""),
            rule("X-Frame-Options", None, "DENY", "%s"),
        ],
    ))
    .await;

    let res = client().get(proxy.url("/")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-robots-tag"], "noindex, nofollow");
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert!(res.headers().get("transfer-encoding").is_none());
    assert_eq!(res.headers()["content-length"], "13");
    assert_eq!(res.text().await.unwrap(), "<head></head>");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let upstream = closed_port().await;
    let proxy = start_proxy(config_for(upstream, vec![])).await;

    let res = client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 502);

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_rules_reload_without_restart() {
    let upstream = start_mock_upstream(Canned::html(PAGE)).await;
    let proxy = start_proxy(config_for(upstream, vec![])).await;

    let res = client().get(proxy.url("/")).send().await.unwrap();
    assert!(res.headers().get("x-reloaded").is_none());

    let updated = config_for(upstream, vec![rule("X-Reloaded", None, "yes", "%s")]);
    proxy.updates.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.headers()["x-reloaded"], "yes");

    // An invalid update keeps the current rules
    let broken = config_for(upstream, vec![rule("X-Broken", Some("(unclosed"), "%s", "%s")]);
    proxy.updates.send(broken).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.headers()["x-reloaded"], "yes");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_invalid_rules_fail_startup() {
    let mut config = BundleConfig::default();
    config.http_headers = vec![
        rule("", None, "x", "%s"),
        rule("X-Bad", Some("(unclosed"), "%s", "%s"),
    ];

    let err = HttpServer::new(config).err().unwrap();
    let message = err.to_string();
    assert!(message.contains("http_headers[0]"), "{}", message);
    assert!(message.contains("http_headers[1]"), "{}", message);
}
