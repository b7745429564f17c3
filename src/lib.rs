//! # payslip-dispatch
//!
//! Match staff payslip files by ID and deliver them over SMTP, plus a
//! split-and-rename utility for multi-page payslip runs.
//!
//! ## Why this crate?
//!
//! Payroll teams end up with two recurring chores: a folder full of
//! per-employee files that each need to reach the right inbox, and a single
//! combined PDF run that needs cutting into per-employee pages with
//! meaningful names. Both are tedious and error-prone by hand; this crate
//! automates them behind one small library and CLI.
//!
//! ## Pipeline Overview
//!
//! ```text
//! notify flow                          split flow
//!  staff ID                             run.pdf
//!   │                                    │
//!   ├─ 1. Lookup   user directory        ├─ 1. Split   run/page{N}.pdf
//!   ├─ 2. Scan     first filename match  ├─ 2. Extract first-page text
//!   ├─ 3. Attach   PDF if present        ├─ 3. Parse   date / surname / IPPIS
//!   └─ 4. Send     SMTP, bounded retry   └─ 4. Rename  {id}_{surname}_{mon}_{yr}.pdf
//! ```
//!
//! The two flows are independent entry points and share no state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use payslip_dispatch::{
//!     NotificationPipeline, RetryPolicy, Settings, SmtpMailer, SqliteUserDirectory,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load("config.toml")?;
//!     let directory = Arc::new(SqliteUserDirectory::connect(&settings.database.url).await?);
//!     let mailer = Arc::new(SmtpMailer::new(&settings.email)?);
//!
//!     let pipeline = NotificationPipeline::new(directory.clone(), mailer, RetryPolicy::default());
//!     pipeline.notify(Path::new("/srv/payslips/2024-01"), 12345).await?;
//!
//!     directory.close().await;
//!     Ok(())
//! }
//! ```
//!
//! Splitting and renaming a combined run:
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! payslip_dispatch::split_and_rename("january-run.pdf").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `payslip` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! payslip-dispatch = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod directory;
pub mod error;
pub mod mailer;
pub mod notify;
pub mod pagedoc;
pub mod rename;
pub mod split;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Backoff, DatabaseSettings, RetryPolicy, Settings, SmtpSettings};
pub use directory::{SqliteUserDirectory, User, UserDirectory};
pub use error::DispatchError;
pub use mailer::{MailSender, OutgoingMessage, PdfAttachment, SmtpMailer};
pub use notify::{scan_folder, MatchResult, NotificationPipeline};
pub use pagedoc::PagedDocument;
pub use rename::{parse_rename_fields, rename_from_content, FieldParseError, RenameFields};
pub use split::{split_and_rename, split_into_pages};
