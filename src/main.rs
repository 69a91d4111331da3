use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use novella::api::{CatalogClient, GENRES};
use novella::app::{App, AppEvent};
use novella::config::Config;
use novella::feed::QueryContext;
use novella::ui;
use novella::util::MAX_SEARCH_QUERY_LENGTH;

/// Get the config directory path (~/.config/novella/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("novella"))
}

#[derive(Parser, Debug)]
#[command(name = "novella", about = "Terminal browser for a serialized-fiction catalog")]
struct Args {
    /// Config file (default: ~/.config/novella/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start in a genre, e.g. 무협
    #[arg(long, value_name = "TYPE", conflicts_with = "search")]
    genre: Option<String>,

    /// Start with a search
    #[arg(long, value_name = "TERM")]
    search: Option<String>,

    /// Override the catalog API base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

impl Args {
    /// The feed shown on startup.
    fn initial_context(&self) -> Result<QueryContext> {
        if let Some(genre) = &self.genre {
            let genre = genre.trim();
            if !GENRES.contains(&genre) {
                anyhow::bail!("Unknown genre '{}'. Known genres: {}", genre, GENRES.join(", "));
            }
            return Ok(QueryContext::type_filter(genre));
        }
        if let Some(term) = &self.search {
            if term.trim().is_empty() {
                anyhow::bail!("--search needs a non-empty term");
            }
            if term.chars().count() > MAX_SEARCH_QUERY_LENGTH {
                anyhow::bail!("Search term too long (max {} chars)", MAX_SEARCH_QUERY_LENGTH);
            }
            return Ok(QueryContext::search(term));
        }
        Ok(QueryContext::Catalog)
    }
}

/// Send tracing output to `novella.log` in the config directory so it does
/// not draw over the TUI. Falls back to stderr if the file cannot be opened.
fn init_tracing(config_dir: &std::path::Path) {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let log_path = config_dir.join("novella.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(path = %log_path.display(), error = %e, "Cannot open log file, logging to stderr");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(&config_dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                eprintln!("Warning: failed to restrict {}: {}", config_dir.display(), e);
            }
        }
    }

    init_tracing(&config_dir);

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(base_url) = &args.base_url {
        config.api_base_url = base_url.clone();
    }

    let initial = args.initial_context()?;

    let client = CatalogClient::new(
        &config.api_base_url,
        config.resolve_api_key(),
        config.request_timeout(),
    )
    .with_context(|| format!("Invalid API base URL '{}'", config.api_base_url))?;
    tracing::info!(base_url = %client.base_url(), context = %initial, "Starting novella");

    let mut app = App::new(Arc::new(client), &config);

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    ui::run(&mut app, initial, event_tx, event_rx).await?;

    Ok(())
}
