//! render-extras
//!
//! A rewriting reverse proxy: responses from the upstream go through the
//! configured header rules before reaching the client.
//!
//! ```text
//!     Client ──▶ axum Router ──▶ proxy handler ──▶ Upstream
//!                    │
//!     Client ◀── header rules ◀── buffered response ◀──┘
//!                    ▲
//!             ArcSwap<RuleSet> ◀── config watcher (--watch)
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, HeaderValue, Response};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use render_extras::config::watcher::ConfigWatcher;
use render_extras::config::{load_config_with, BundleConfig, Parameters};
use render_extras::extensions::Registry;
use render_extras::http::{BufferedResponse, RequestContext, TextResponse};
use render_extras::lifecycle::{shutdown_on_signal, Shutdown};
use render_extras::observability::{logging, metrics};
use render_extras::rules::RuleSet;
use render_extras::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "render-extras")]
#[command(author, version, about = "Rewriting proxy applying response header rules")]
struct Cli {
    /// Project directory substituted for %kernel.project_dir%
    #[arg(long, global = true, env = "RENDER_EXTRAS_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Cache directory substituted for %kernel.cache_dir% (default: PROJECT_DIR/var/cache)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy.
    Serve {
        /// Configuration file (TOML or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Reload header rules when the file changes
        #[arg(long)]
        watch: bool,
    },

    /// Validate a configuration and print a summary.
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run the header rules over a file and print the result.
    Apply {
        #[arg(short, long)]
        config: PathBuf,

        /// Response body to rewrite
        #[arg(short, long)]
        input: PathBuf,

        /// Content-Type of the response
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn parameters(cli: &Cli) -> Result<Parameters> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to resolve the current directory")?,
    };
    let cache_dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(|| project_dir.join("var").join("cache"));

    Ok(Parameters::new()
        .with_project_dir(project_dir)
        .with_cache_dir(cache_dir))
}

fn load(path: &Path, params: &Parameters) -> Result<BundleConfig> {
    logging::bootstrap(|| load_config_with(path, params))
        .with_context(|| format!("Failed to load config file: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let params = parameters(&cli)?;

    match &cli.command {
        Command::Serve { config, watch } => serve(config, *watch, params).await,
        Command::Check { config } => check(config, &params),
        Command::Apply {
            config,
            input,
            content_type,
        } => apply(config, input, content_type.as_deref(), &params).await,
    }
}

async fn serve(path: &Path, watch: bool, params: Parameters) -> Result<()> {
    let config = load(path, &params)?;
    logging::init(&config.observability);

    info!(
        config = %path.display(),
        listen = %config.server.listen,
        upstream = %config.server.upstream,
        rules = config.enabled_rules().count(),
        "render-extras starting"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .context("Invalid metrics address")?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;

    // Kept alive until the server stops
    let (updates, _watcher) = if watch {
        let (watcher, updates) = ConfigWatcher::new(path, params);
        let watcher = watcher.run().context("Failed to watch config file")?;
        (updates, Some(watcher))
    } else {
        let (_tx, updates) = mpsc::unbounded_channel();
        (updates, None)
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let signals = shutdown_on_signal(shutdown.clone());

    server.run(listener, updates, shutdown.subscribe()).await?;
    signals.abort();

    info!("Shutdown complete");
    Ok(())
}

fn check(path: &Path, params: &Parameters) -> Result<()> {
    let config = load(path, params)?;
    let registry = logging::bootstrap(|| Registry::load(&config))?;

    println!("Configuration is valid: {}", path.display());

    let extensions: Vec<_> = registry
        .extensions()
        .iter()
        .map(|e| e.kind().name())
        .collect();
    println!("Extensions: {}", display_list(&extensions));

    if let Some(svg) = registry.svg() {
        for provider in svg.providers() {
            println!("  svg provider {}: {} path(s)", provider.kind, provider.paths.len());
        }
    }

    println!(
        "Header rules: {} enabled of {}",
        config.enabled_rules().count(),
        config.http_headers.len()
    );
    for rule in &config.http_headers {
        let formats = rule
            .formats
            .as_ref()
            .map(|f| f.join(", "))
            .unwrap_or_else(|| "any format".to_string());
        let state = if rule.enabled { "" } else { " (disabled)" };
        match &rule.pattern {
            Some(pattern) => println!("  {} <- {} [{}]{}", rule.name, pattern, formats, state),
            None => println!("  {} = {} [{}]{}", rule.name, rule.value, formats, state),
        }
    }

    Ok(())
}

async fn apply(
    path: &Path,
    input: &Path,
    content_type: Option<&str>,
    params: &Parameters,
) -> Result<()> {
    let config = load(path, params)?;
    let rules = RuleSet::compile_enabled(&config.http_headers)?;

    let body = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let mut response = Response::new(Body::from(body));
    if let Some(content_type) = content_type {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).context("Invalid content type")?,
        );
    }

    let mut response = BufferedResponse::buffer(response, usize::MAX)
        .await
        .context("Failed to buffer input")?;
    let outcome = logging::bootstrap(|| rules.apply(&mut response, &RequestContext::main()));

    eprintln!("outcome: {}", outcome.label());
    for (name, value) in response.headers() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();
    match response.content() {
        Some(text) => println!("{}", text),
        None => eprintln!("(body is not text)"),
    }

    Ok(())
}

fn display_list(items: &[&str]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_project_dir_from_environment() {
        std::env::set_var("RENDER_EXTRAS_PROJECT_DIR", "/srv/from-env");

        let cli = Cli::try_parse_from(["render-extras", "check", "-c", "app.toml"]).unwrap();
        assert_eq!(cli.project_dir.as_deref(), Some(Path::new("/srv/from-env")));

        let cli = Cli::try_parse_from([
            "render-extras",
            "--project-dir",
            "/srv/flag",
            "check",
            "-c",
            "app.toml",
        ])
        .unwrap();
        assert_eq!(cli.project_dir.as_deref(), Some(Path::new("/srv/flag")));

        std::env::remove_var("RENDER_EXTRAS_PROJECT_DIR");
    }
}
