//! CLI binary for payslip-dispatch.
//!
//! A thin shim over the library crate that maps subcommands to the
//! notification and split/rename pipelines.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use payslip_dispatch::{
    split_and_rename, NotificationPipeline, RetryPolicy, Settings, SmtpMailer,
    SqliteUserDirectory, User,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Email the payslip for staff ID 12345 found in a folder
  payslip notify /srv/payslips/2024-01 12345

  # Split a combined payslip run and rename each page from its content
  payslip split january-run.pdf

  # Register a user in the directory
  payslip add-user u0042 12345 doe@example.com

CONFIG FILE (default: config.toml, override with --config or PAYSLIP_CONFIG):
  [email]
  smtp_server     = "smtp.example.com"
  smtp_port       = 465
  sender_email    = "payroll@example.com"
  sender_password = "app-password"

  [database]
  url = "sqlite:users.db"

NOTES:
  The notify flow delivers the first file whose name contains the staff ID's
  decimal digits. Transient SMTP failures are retried 3 times, 5 seconds
  apart; the outcome is reported in the logs.
"#;

/// Match staff payslip files by ID and deliver them over SMTP.
#[derive(Parser, Debug)]
#[command(
    name = "payslip",
    version,
    about = "Match staff payslip files by ID and deliver them over SMTP",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the TOML settings file.
    #[arg(long, global = true, env = "PAYSLIP_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAYSLIP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAYSLIP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look a staff ID up, find its file in a folder, and email it.
    Notify {
        /// Folder to scan for a matching file.
        folder: PathBuf,
        /// Numeric staff ID to match and notify.
        staff_id: i64,
    },
    /// Split a multi-page PDF into pages and rename each from its content.
    Split {
        /// Combined payslip run (PDF).
        input: PathBuf,
    },
    /// Insert or replace a user record in the directory.
    AddUser {
        /// Primary-key record ID (short string).
        id: String,
        /// Unique numeric staff ID.
        staff_id: i64,
        /// Registered email address.
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Notify { folder, staff_id } => {
            let settings = Settings::load(&cli.config)
                .with_context(|| format!("Failed to load settings from {:?}", cli.config))?;

            let directory = Arc::new(
                SqliteUserDirectory::connect(&settings.database.url)
                    .await
                    .context("Failed to open user directory")?,
            );
            let mailer =
                Arc::new(SmtpMailer::new(&settings.email).context("Failed to build SMTP mailer")?);

            let pipeline =
                NotificationPipeline::new(directory.clone(), mailer, RetryPolicy::default());

            // Close the pool whether or not notify succeeded.
            let result = pipeline.notify(&folder, staff_id).await;
            directory.close().await;
            result.context("Notification failed")?;
        }

        Command::Split { input } => {
            split_and_rename(&input)
                .await
                .with_context(|| format!("Failed to split and rename {:?}", input))?;
        }

        Command::AddUser {
            id,
            staff_id,
            email,
        } => {
            let settings = Settings::load(&cli.config)
                .with_context(|| format!("Failed to load settings from {:?}", cli.config))?;

            let directory = SqliteUserDirectory::connect(&settings.database.url)
                .await
                .context("Failed to open user directory")?;

            let result = directory
                .insert_user(&User {
                    id,
                    staff_id,
                    email,
                })
                .await;
            directory.close().await;
            result.context("Failed to insert user")?;
            eprintln!("user {staff_id} registered");
        }
    }

    Ok(())
}
