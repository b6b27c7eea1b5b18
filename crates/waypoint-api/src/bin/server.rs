//! waypoint-api server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), verifies Redis
//! connectivity, and serves the JSON API over HTTP.
//!
//! # Dataset seeding
//!
//! One-shot bulk load of an autocomplete dataset (one term per line) into a
//! bucket plus the `general` bucket, then exit:
//!
//! ```text
//! cargo run -p waypoint-api --bin server -- --seed random_dataset.txt
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use waypoint_api::{AppState, ServerConfig};
use waypoint_core::{autocomplete::AutocompleteIndex, store::KvStore as _};
use waypoint_store_redis::RedisStore;

#[derive(Parser)]
#[command(author, version, about = "Waypoint API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Seed the autocomplete index from a dataset file (one term per line)
  /// and exit instead of serving.
  #[arg(long)]
  seed: Option<PathBuf>,

  /// Bucket to seed terms into, alongside `general`.
  #[arg(long, default_value = "random")]
  seed_bucket: String,
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
    .add_source(config::Environment::with_prefix("WAYPOINT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the store and fail fast if Redis is unreachable.
  let store = RedisStore::open(&server_cfg.redis_url, server_cfg.redis_timeout())
    .with_context(|| format!("invalid redis url {:?}", server_cfg.redis_url))?;
  store
    .ping()
    .await
    .with_context(|| format!("failed to ping redis at {:?}", server_cfg.redis_url))?;

  // Helper mode: seed the autocomplete index and exit.
  if let Some(path) = cli.seed {
    let count = seed_autocomplete(&store, &path, &cli.seed_bucket).await?;
    tracing::info!("Seeded {count} terms into {:?} and \"general\"", cli.seed_bucket);
    return Ok(());
  }

  let state = AppState::new(Arc::new(store));
  let app = waypoint_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Load a dataset file into the autocomplete index, one term per line.
/// Blank lines are skipped; terms are normalised by the index.
async fn seed_autocomplete(
  store: &RedisStore,
  path: &std::path::Path,
  bucket: &str,
) -> anyhow::Result<usize> {
  let data = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read dataset {path:?}"))?;

  let autocomplete = AutocompleteIndex::new(Arc::new(store.clone()));
  let mut count = 0;
  for line in data.lines() {
    if line.trim().is_empty() {
      continue;
    }
    autocomplete
      .record(line, bucket)
      .await
      .with_context(|| format!("failed to seed term {line:?}"))?;
    count += 1;
  }
  Ok(count)
}
