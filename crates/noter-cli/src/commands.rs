use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use noter_core::validation::SignupForm;
use noter_core::{Noter, NoterError};
use noter_types::VisibilityFilter;
use serde::Serialize;

/// Maintenance tools for a noter store.
#[derive(Debug, Parser)]
#[command(name = "noter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database file; overrides NOTER_DB_PATH (":memory:" for a scratch store)
    #[arg(global = true, long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Apply pending migrations and print the schema version
    Migrate,
    /// Create a user; the password is read from the first line of stdin
    Signup { name: String, email: String },
    /// Print the most recent public entries as JSON
    Latest,
    /// Print row counts as JSON
    Stats,
}

#[derive(Debug, Serialize)]
struct Stats {
    schema_version: i64,
    users: u64,
    public_entries: u64,
    live_entries: u64,
}

impl Command {
    pub fn run(&self, noter: &Noter, input: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
        match self {
            Command::Migrate => {
                // Opening the store already applied pending migrations.
                writeln!(out, "schema version {}", noter.schema_version()?)?;
            }
            Command::Signup { name, email } => {
                let mut password = String::new();
                input
                    .read_line(&mut password)
                    .context("reading password from stdin")?;
                let form = SignupForm {
                    name: name.clone(),
                    email: email.clone(),
                    password: password.trim_end_matches(['\r', '\n']).to_string(),
                };
                form.validate()?;

                let id = match noter.identity.sign_up(&form.name, &form.email, &form.password) {
                    Ok(id) => id,
                    Err(NoterError::DuplicateIdentity) => {
                        return Err(anyhow!("{} is already registered", form.email));
                    }
                    Err(e) => return Err(e.into()),
                };
                writeln!(out, "{}", serde_json::json!({ "user_id": id }))?;
            }
            Command::Latest => {
                let latest = noter.entries.latest()?;
                writeln!(out, "{}", serde_json::to_string_pretty(&latest)?)?;
            }
            Command::Stats => {
                let stats = Stats {
                    schema_version: noter.schema_version()?,
                    users: noter.identity.count()?,
                    public_entries: noter.entries.count(&VisibilityFilter::public())?,
                    live_entries: noter.entries.count(&VisibilityFilter::unrestricted())?,
                };
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            }
        }
        Ok(())
    }
}
