//! wortschatz server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `WORTSCHATZ_*` environment variables, opens the SQLite store, wires up the
//! annotation and generation clients, and serves the JSON API over HTTP.
//!
//! # Seeding scenarios
//!
//! ```
//! cargo run -p wortschatz-server -- --seed-scenarios scenarios.json
//! ```
//!
//! The file holds a JSON array of `{"text": "...", "proficiency_level":
//! "B1"}` objects. Texts already present are skipped.

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wortschatz_api::AppState;
use wortschatz_core::{
  activity::NewScenario, cache::MemoryCache, planner::StudyPlanner,
  store::LearningStore,
};
use wortschatz_remote::{HttpAnnotator, HttpGenerator};
use wortschatz_store_sqlite::SqliteStore;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Wortschatz medical vocabulary server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Load clinical scenarios from a JSON file into the store and exit.
  #[arg(long, value_name = "FILE")]
  seed_scenarios: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg =
    ServerConfig::load(cli.config).context("failed to load ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: seed scenarios and exit.
  if let Some(path) = cli.seed_scenarios {
    return seed_scenarios(&store, &path).await;
  }

  let annotator = HttpAnnotator::shared(&server_cfg.annotator)
    .context("failed to build annotator client")?;
  if server_cfg.generator.api_key.is_none() {
    tracing::warn!("generator.api_key is not set; study generation will fail");
  }
  let generator = HttpGenerator::new(server_cfg.generator.clone())
    .context("failed to build generator client")?;

  let planner = StudyPlanner::new(
    Arc::new(store),
    Arc::new(annotator),
    Arc::new(generator),
    Arc::new(MemoryCache::new()),
    server_cfg.study_config(),
  );
  let app = wortschatz_api::api_router(AppState::new(planner))
    .layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn seed_scenarios(store: &SqliteStore, path: &Path) -> anyhow::Result<()> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {path:?}"))?;
  let scenarios: Vec<NewScenario> = serde_json::from_str(&raw)
    .with_context(|| format!("failed to parse scenarios in {path:?}"))?;
  let total = scenarios.len();
  let inserted = store
    .add_scenarios(scenarios)
    .await
    .context("failed to store scenarios")?;
  tracing::info!(inserted, skipped = total - inserted, "scenarios seeded");
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
