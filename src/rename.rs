//! Content-driven renaming of single-page payslip files.
//!
//! A payslip page carries, at fixed line offsets of its extracted text, a
//! pay-period date range and the employee's surname and IPPIS identifier:
//!
//! ```text
//! line 3: JAN-2024              (date range, hyphen-delimited)
//! line 4: Name: Doe, John      (surname before the comma)
//! line 5: IPPIS: 12345          (identifier after the colon)
//! ```
//!
//! [`parse_rename_fields`] is a pure function over those lines so the brittle
//! offset-based extraction can be tested without touching a PDF or the
//! filesystem. [`rename_from_content`] drives it: extract the first page's
//! text, parse, and rename the file in place to
//! `{ippis}_{surname}_{month}_{year}.pdf`.

use crate::error::DispatchError;
use crate::pagedoc::{is_pdf_path, PagedDocument};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Line offsets (0-indexed) of the three required fields.
const DATE_LINE: usize = 3;
const NAME_LINE: usize = 4;
const ID_LINE: usize = 5;

/// Fields parsed from a payslip page, ready to compose a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFields {
    pub ippis_id: String,
    pub surname: String,
    pub month_label: String,
    pub year_label: String,
}

impl RenameFields {
    /// The derived filename, e.g. `12345_Doe_JAN_2024.pdf`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.pdf",
            self.ippis_id, self.surname, self.month_label, self.year_label
        )
    }
}

/// A violation of the expected page-text shape.
///
/// Non-fatal at the pipeline level: `split_and_rename` logs it and moves on
/// to the next page file. Fatal for the single file, which keeps its name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldParseError {
    #[error("expected at least 6 text lines, got {got}")]
    TooFewLines { got: usize },

    #[error("line {line} is missing the '{delimiter}' delimiter: {content:?}")]
    MissingDelimiter {
        line: usize,
        delimiter: char,
        content: String,
    },
}

/// Parse the rename fields from a page's text lines.
///
/// The offsets and split rules are fixed; any shape violation is a hard
/// failure, never a partial result.
pub fn parse_rename_fields(lines: &[&str]) -> Result<RenameFields, FieldParseError> {
    if lines.len() <= ID_LINE {
        return Err(FieldParseError::TooFewLines { got: lines.len() });
    }

    let date_line = lines[DATE_LINE].trim();
    if !date_line.contains('-') {
        return Err(FieldParseError::MissingDelimiter {
            line: DATE_LINE,
            delimiter: '-',
            content: date_line.to_string(),
        });
    }
    // split always yields at least one token, so the defaults never fire
    let month_label = date_line.split('-').next().unwrap_or_default().to_string();
    let year_label = date_line.rsplit('-').next().unwrap_or_default().to_string();

    let name_line = lines[NAME_LINE];
    let surname = match name_line.split(':').nth(1) {
        Some(after_label) => after_label
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
        None => {
            return Err(FieldParseError::MissingDelimiter {
                line: NAME_LINE,
                delimiter: ':',
                content: name_line.to_string(),
            })
        }
    };

    let id_line = lines[ID_LINE];
    if !id_line.contains(':') {
        return Err(FieldParseError::MissingDelimiter {
            line: ID_LINE,
            delimiter: ':',
            content: id_line.to_string(),
        });
    }
    let ippis_id = id_line.rsplit(':').next().unwrap_or_default().trim().to_string();

    Ok(RenameFields {
        ippis_id,
        surname,
        month_label,
        year_label,
    })
}

/// Rename a single-page payslip file from its first page's text.
///
/// No-op (returning the unchanged path) when the file does not carry a
/// `.pdf` extension. On success returns the new path, in the same directory
/// as the original. A malformed page propagates as
/// [`DispatchError::MalformedPageText`] and the file keeps its name.
pub async fn rename_from_content(path: impl AsRef<Path>) -> Result<PathBuf, DispatchError> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || rename_blocking(&path))
        .await
        .map_err(|e| DispatchError::Internal(format!("rename task panicked: {e}")))?
}

fn rename_blocking(path: &Path) -> Result<PathBuf, DispatchError> {
    if !is_pdf_path(path) {
        debug!("skipping non-PDF entry: {}", path.display());
        return Ok(path.to_path_buf());
    }

    let doc = PagedDocument::open(path)?;
    let text = doc.page_text(0)?;
    let lines: Vec<&str> = text.lines().collect();

    let fields =
        parse_rename_fields(&lines).map_err(|e| DispatchError::MalformedPageText {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let target = match path.parent() {
        Some(parent) => parent.join(fields.file_name()),
        None => PathBuf::from(fields.file_name()),
    };

    std::fs::rename(path, &target).map_err(|e| DispatchError::OutputWriteFailed {
        path: target.clone(),
        source: e,
    })?;

    info!("renamed {} to {}", path.display(), target.display());
    Ok(target)
}
