//! outreach-setup binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite datastore it names, and ensures the outreach collections, validators
//! and indexes exist. Exits non-zero if any step fails.
//!
//! ```sh
//! OUTREACH_STORAGE__DATA_DIR=/var/lib/outreach cargo run -p outreach-setup
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Provision the outreach datastore")]
struct Cli {
  /// Path to the TOML configuration file. Missing files are ignored.
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

  let cfg = outreach_setup::load_config(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  outreach_setup::run(&cfg).await?;

  println!("Collections created successfully");
  Ok(())
}
