//! Error types for the payslip-dispatch library.
//!
//! One enum, [`DispatchError`], covers every fatal failure. Several outcomes
//! that look like errors are deliberately **not** variants here, because the
//! pipelines treat them as normal results and only log them:
//!
//! * a staff ID with no user record (`notify` returns `Ok(())`),
//! * a folder scan with no matching file (`notify` returns `Ok(())`),
//! * delivery retry exhaustion (`send_with_retry` logs and swallows).
//!
//! Keeping those out of the error type means callers cannot accidentally
//! abort a batch over an outcome the operator is expected to read from the
//! logs.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the payslip-dispatch library.
#[derive(Debug, Error)]
pub enum DispatchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The folder given to the notification pipeline does not exist.
    #[error("Folder not found: '{path}'\nCheck the path exists and is a directory.")]
    FolderNotFound { path: PathBuf },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The input file does not carry a `.pdf` extension.
    #[error("Not a PDF file: '{path}'")]
    NotAPdf { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be parsed.
    #[error("PDF '{path}' could not be parsed: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Requested page index exceeds the page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The extracted page text does not have the expected line layout.
    #[error("Malformed page text in '{path}': {detail}")]
    MalformedPageText { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a split page file, or rename a page file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not list a directory's entries (the directory exists but is
    /// unreadable, or the path is not a directory).
    #[error("Failed to read directory '{path}': {source}")]
    DirectoryReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Storage errors ────────────────────────────────────────────────────
    /// User directory query or connection failure.
    #[error("User directory error: {0}")]
    Database(#[from] sqlx::Error),

    // ── Mail errors ───────────────────────────────────────────────────────
    /// SMTP transport failure (connection, authentication, or delivery).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The outgoing message could not be assembled.
    #[error("Failed to build mail message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// A sender or recipient address could not be parsed.
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Settings file missing, unreadable, or failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
