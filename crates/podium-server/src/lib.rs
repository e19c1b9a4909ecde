//! Server wiring for Podium: configuration, store setup and the HTTP router.
//!
//! The `podium` binary in `main.rs` parses the command line and drives these
//! pieces; everything here is reusable from tests.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Json, Router, routing::get};
use podium_core::{
  analyzer::{Analyzer, QueryConfig},
  cache::QueryCache,
  season::SeasonId,
  store::ChampionshipStore,
};
use podium_store_sqlite::{DEFAULT_BATCH_SIZE, SqliteStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `podium.toml` and `PODIUM_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub database_path: PathBuf,
  /// Where season CSV files are looked up by the `import` command.
  pub data_folder:   PathBuf,
  pub import:        ImportConfig,
  pub query:         QueryConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "127.0.0.1".to_owned(),
      port:          8080,
      database_path: PathBuf::from("podium.db"),
      data_folder:   PathBuf::from("data"),
      import:        ImportConfig::default(),
      query:         QueryConfig::default(),
    }
  }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ImportConfig {
  /// Subsets committed per transaction.
  pub batch_size: usize,
}

impl Default for ImportConfig {
  fn default() -> Self { Self { batch_size: DEFAULT_BATCH_SIZE } }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `PODIUM_*` variables.
  ///
  /// Nested keys use a double underscore, e.g. `PODIUM_IMPORT__BATCH_SIZE`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PODIUM").separator("__"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Setup ───────────────────────────────────────────────────────────────────

/// Open the configured database, creating the schema if needed.
pub async fn open_store(cfg: &ServerConfig) -> podium_store_sqlite::Result<SqliteStore> {
  let store = SqliteStore::open(expand_tilde(&cfg.database_path)).await?;
  Ok(store.with_batch_size(cfg.import.batch_size))
}

pub fn analyzer<S: ChampionshipStore>(store: S, cfg: &ServerConfig) -> Analyzer<S> {
  Analyzer::new(Arc::new(store), Arc::new(QueryCache::new()), cfg.query)
}

/// The season CSV to import when none is given: `championships_{season}.csv`
/// in the data folder, else the generic `championships.csv` if that exists.
pub fn season_csv_path(data_folder: &Path, season: SeasonId) -> PathBuf {
  let folder = expand_tilde(data_folder);
  let specific = folder.join(format!("championships_{season}.csv"));
  let generic = folder.join("championships.csv");
  if !specific.exists() && generic.exists() {
    generic
  } else {
    specific
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The JSON API under `/api`, plus `/health`, with request tracing.
pub fn router<S>(analyzer: Arc<Analyzer<S>>) -> Router
where
  S: ChampionshipStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", podium_api::api_router(analyzer))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests {
  use axum::{body::Body, http::Request};
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn config_defaults_fill_missing_fields() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9000\n[query]\nbest_position_cap = 25\n",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.query.best_position_cap, 25);
    assert_eq!(cfg.import.batch_size, DEFAULT_BATCH_SIZE);
    assert_eq!(cfg.address(), "127.0.0.1:9000");
  }

  #[test]
  fn missing_config_file_uses_defaults() {
    let cfg = ServerConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(cfg.database_path, PathBuf::from("podium.db"));
  }

  #[test]
  fn season_csv_prefers_season_specific_file() {
    let dir = std::env::temp_dir().join(format!("podium-csv-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    assert_eq!(
      season_csv_path(&dir, 2024),
      dir.join("championships_2024.csv")
    );

    std::fs::write(dir.join("championships.csv"), "Driver,1\n").unwrap();
    assert_eq!(season_csv_path(&dir, 2024), dir.join("championships.csv"));

    std::fs::write(dir.join("championships_2024.csv"), "Driver,1\n").unwrap();
    assert_eq!(
      season_csv_path(&dir, 2024),
      dir.join("championships_2024.csv")
    );

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[tokio::test]
  async fn health_and_api_are_mounted() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = router(Arc::new(analyzer(store, &ServerConfig::default())));

    let res = app
      .clone()
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert!(res.status().is_success());

    let res = app
      .oneshot(Request::get("/api/seasons").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert!(res.status().is_success());
  }
}
