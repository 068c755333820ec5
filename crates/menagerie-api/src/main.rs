//! menagerie-api server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`, with
//! `MENAGERIE_*` environment overrides), opens an in-process SQLite store,
//! and serves the registry API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use menagerie_api::{AppState, ServerConfig};
use menagerie_cache::CacheCoordinator;
use menagerie_core::store::IdempotencyStore as _;
use menagerie_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How often expired idempotency records are physically purged. They stop
/// being claimable as soon as they expire regardless.
const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Parser)]
#[command(author, version, about = "Menagerie registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MENAGERIE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // Background garbage collection of expired idempotency records.
  let purge_store = store.clone();
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
      interval.tick().await;
      match purge_store.purge_expired().await {
        Ok(0) => {}
        Ok(purged) => {
          tracing::debug!(purged, "purged expired idempotency records");
        }
        Err(error) => {
          tracing::warn!(%error, "idempotency purge failed");
        }
      }
    }
  });

  let state = AppState::new(store, Arc::new(CacheCoordinator::with_defaults()));
  let app = menagerie_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
