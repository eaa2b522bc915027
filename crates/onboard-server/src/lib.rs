//! Wiring for the onboarding tracker server.
//!
//! Loads [`ServerConfig`], opens the SQLite store, builds the optional
//! spreadsheet exporter and assembles the top-level [`Router`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::{Router, routing::get};
use onboard_core::{
  directory::{StaticDirectory, UserDirectory, UserProfile},
  export::Exporter,
  store::OnboardingStore,
  tracker::Tracker,
};
use onboard_sheets::SheetsExporter;
use onboard_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// The tracker the binary runs: SQLite behind, spreadsheet optional.
pub type AppTracker = Tracker<SqliteStore, SheetsExporter>;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ONBOARD_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// No exporter is built when absent.
  #[serde(default)]
  pub sheets:     Option<SheetsConfig>,
  /// The role directory.
  #[serde(default)]
  pub users:      Vec<UserProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
  pub web_app_url:    String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:   u64,
  /// Append each newly logged session as it is created.
  #[serde(default = "default_true")]
  pub sync_on_create: bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/onboard/onboard.db") }
fn default_timeout_secs() -> u64 { 30 }
fn default_true() -> bool { true }

impl ServerConfig {
  /// Layer the (optional) file at `path` under `ONBOARD_*` variables.
  /// Nested keys use `__`, e.g. `ONBOARD_SHEETS__WEB_APP_URL`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ONBOARD")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn directory(&self) -> StaticDirectory { StaticDirectory::new(self.users.iter().cloned()) }
}

// ─── Construction ─────────────────────────────────────────────────────────────

/// Open the SQLite store, creating its directory if needed.
pub async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let path = expand_tilde(&cfg.store_path);
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

pub fn build_exporter(cfg: &ServerConfig) -> anyhow::Result<Option<SheetsExporter>> {
  let Some(sheets) = &cfg.sheets else {
    return Ok(None);
  };
  let exporter =
    SheetsExporter::new(sheets.web_app_url.clone(), Duration::from_secs(sheets.timeout_secs))
      .context("failed to build spreadsheet exporter")?;
  Ok(Some(exporter))
}

pub async fn build_tracker(cfg: &ServerConfig) -> anyhow::Result<AppTracker> {
  let store = open_store(cfg).await?;
  let exporter = build_exporter(cfg)?;
  let sync_on_create = cfg.sheets.as_ref().is_some_and(|s| s.sync_on_create);
  if exporter.is_none() {
    tracing::info!("no spreadsheet configured; sync is disabled");
  }
  Ok(Tracker::from_parts(
    Arc::new(store),
    exporter.map(Arc::new),
    sync_on_create,
  ))
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API plus `GET /health`, wrapped in request tracing.
pub fn router<S, E>(tracker: Tracker<S, E>, directory: Arc<dyn UserDirectory>) -> Router
where
  S: OnboardingStore + 'static,
  E: Exporter + 'static,
{
  Router::new()
    .route("/health", get(health))
    .merge(onboard_api::api_router(tracker, directory))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

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
