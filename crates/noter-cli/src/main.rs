mod commands;

use std::io;

use clap::Parser;
use noter_core::{Config, Noter};
use tracing::info;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noter=info,noter_core=info,noter_db=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = (db.as_os_str() != ":memory:").then_some(db);
    }
    let noter = Noter::open(&config)?;
    info!(command = ?cli.command, "Running command");

    let stdin = io::stdin();
    cli.command
        .run(&noter, &mut stdin.lock(), &mut io::stdout().lock())
}
