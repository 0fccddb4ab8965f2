//! viewc - compile and render view templates from the command line

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarto_viewtemplate::config::MTIME_KEYWORD;
use quarto_viewtemplate::{Diagnostic, EngineConfig, ViewEngine};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "viewc")]
#[command(version)]
#[command(about = "Compile and render view templates", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Views directory
    #[arg(long, global = true)]
    views: Option<PathBuf>,

    /// Cache directory (must exist)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// View filename suffix
    #[arg(long, global = true)]
    suffix: Option<String>,

    /// Artifact TTL in seconds, or "mtime" to reuse artifacts only while
    /// the source is unchanged
    #[arg(long, global = true, allow_hyphen_values = true, value_parser = parse_ttl)]
    ttl: Option<Ttl>,

    /// Collapse whitespace runs in compiled output
    #[arg(long, global = true)]
    compress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled code of a view without touching the cache
    Compile {
        /// View name, relative to the views directory
        name: String,
    },

    /// Render a view through the cache and print the result
    Render {
        /// View name, relative to the views directory
        name: String,

        /// JSON file with the data context
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Remove every cached artifact
    Clear,
}

#[derive(Debug, Clone, Copy)]
enum Ttl {
    Seconds(i64),
    Mtime,
}

fn parse_ttl(value: &str) -> Result<Ttl, String> {
    if value.eq_ignore_ascii_case(MTIME_KEYWORD) {
        return Ok(Ttl::Mtime);
    }
    value
        .parse::<i64>()
        .map(Ttl::Seconds)
        .map_err(|_| format!("expected a number of seconds or \"{MTIME_KEYWORD}\", got \"{value}\""))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarto_viewtemplate=info,viewc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Compile { name } => {
            if !config.cache_dir.is_dir() {
                // compile never reads or writes artifacts
                config.cache_dir = std::env::temp_dir();
            }
            let engine = ViewEngine::dry_run(config)?;
            let (code, diagnostics) = engine
                .compile_view(&name)
                .with_context(|| format!("failed to compile view \"{name}\""))?;
            report(&diagnostics);
            println!("{code}");
        }
        Commands::Render { name, data } => {
            let data = match data {
                Some(path) => read_data(&path)?,
                None => Value::Object(Default::default()),
            };
            let mut engine = ViewEngine::dry_run(config)?;
            let output = engine
                .render(&name, &data)
                .with_context(|| format!("failed to render view \"{name}\""))?;
            report(engine.diagnostics());
            println!("{output}");
        }
        Commands::Clear => {
            let engine = ViewEngine::dry_run(config)?;
            let removed = engine.cache().clear().context("failed to clear the view cache")?;
            info!(removed, "cleared view cache");
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(views) = &cli.views {
        config.views_dir = views.clone();
    }
    if let Some(cache) = &cli.cache {
        config.cache_dir = cache.clone();
    }
    if let Some(suffix) = &cli.suffix {
        config.suffix = suffix.clone();
    }
    match cli.ttl {
        Some(Ttl::Seconds(secs)) => config.ttl = Some(secs.max(0)),
        Some(Ttl::Mtime) => config.ttl = None,
        None => {}
    }
    if cli.compress {
        config.compress = true;
    }
    Ok(config)
}

fn read_data(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse data file {}", path.display()))
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}
