//! onboard server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and serves the JSON API over HTTP. The `renumber` and `sync`
//! subcommands run one maintenance pass against the same store and exit.
//!
//! ```
//! onboard --config /etc/onboard/config.toml serve
//! onboard renumber
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use onboard_core::directory::UserDirectory;
use onboard_server::{ServerConfig, build_tracker, router};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Onboarding session tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
  /// Serve the HTTP API (default).
  #[default]
  Serve,
  /// Recompute every session number and persist the ones that changed.
  Renumber,
  /// Renumber, then overwrite the spreadsheet with every record.
  Sync,
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
  let cfg = ServerConfig::load(&cli.config)?;
  let tracker = build_tracker(&cfg).await?;

  match cli.command.unwrap_or_default() {
    Command::Serve => {
      let directory = cfg.directory();
      if directory.is_empty() {
        tracing::warn!("no users configured; every request will be rejected");
      }
      let directory: Arc<dyn UserDirectory> = Arc::new(directory);
      let app = router(tracker, directory);
      let address = cfg.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
    Command::Renumber => {
      let changed = tracker.renumber_all().await.context("renumber failed")?;
      println!("{changed} session numbers changed");
    }
    Command::Sync => match tracker.sync_all().await.context("sync failed")? {
      Ok(delivered) => println!("synced {} rows", delivered.rows),
      Err(uncertain) => println!(
        "sent {} rows but the web app did not confirm: {}",
        uncertain.rows, uncertain.reason
      ),
    },
  }

  Ok(())
}
