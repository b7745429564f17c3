//! Paged-document adapter over lopdf.
//!
//! Wraps a loaded PDF behind the three operations the pipelines need:
//! page count, per-page text extraction, and writing a single page out as
//! its own document. Single-page extraction works by whitelisting: clone
//! the source, delete every other page in reverse order so page numbers
//! stay stable during deletion, then prune the orphaned objects before
//! saving.

use crate::error::DispatchError;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// True when the path's file name ends in `.pdf`, case-insensitively.
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// An opened multi-page PDF document.
#[derive(Debug)]
pub struct PagedDocument {
    path: PathBuf,
    doc: Document,
}

impl PagedDocument {
    /// Open a PDF file, validating its extension and parsing its structure.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let path = path.as_ref().to_path_buf();

        if !is_pdf_path(&path) {
            return Err(DispatchError::NotAPdf { path });
        }
        if !path.exists() {
            return Err(DispatchError::FileNotFound { path });
        }

        let doc = Document::load(&path).map_err(|e| DispatchError::CorruptPdf {
            path: path.clone(),
            detail: e.to_string(),
        })?;

        Ok(Self { path, doc })
    }

    /// Path the document was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Extract the text of one page (0-indexed).
    pub fn page_text(&self, index: usize) -> Result<String, DispatchError> {
        let total = self.page_count();
        if index >= total {
            return Err(DispatchError::PageOutOfRange { page: index, total });
        }

        // lopdf page numbers are 1-indexed.
        self.doc
            .extract_text(&[index as u32 + 1])
            .map_err(|e| DispatchError::CorruptPdf {
                path: self.path.clone(),
                detail: format!("text extraction failed on page {}: {}", index, e),
            })
    }

    /// Write one page (0-indexed) as a standalone PDF at `out_path`.
    ///
    /// Overwrites an existing file at the target path.
    pub fn write_page(&self, index: usize, out_path: &Path) -> Result<(), DispatchError> {
        let total = self.page_count();
        if index >= total {
            return Err(DispatchError::PageOutOfRange { page: index, total });
        }

        let keep = index as u32 + 1;
        let mut page_doc = self.doc.clone();

        // Delete in reverse so earlier deletions don't shift later numbers.
        let mut to_delete: Vec<u32> = (1..=total as u32).filter(|&p| p != keep).collect();
        to_delete.reverse();
        for page_num in to_delete {
            page_doc.delete_pages(&[page_num]);
        }

        page_doc.prune_objects();
        page_doc.compress();

        let mut file =
            std::fs::File::create(out_path).map_err(|e| DispatchError::OutputWriteFailed {
                path: out_path.to_path_buf(),
                source: e,
            })?;
        page_doc
            .save_to(&mut file)
            .map_err(|e| DispatchError::Internal(format!(
                "failed to serialise page {} of '{}': {}",
                index,
                self.path.display(),
                e
            )))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf_path(Path::new("payslips.pdf")));
        assert!(is_pdf_path(Path::new("PAYSLIPS.PDF")));
        assert!(is_pdf_path(Path::new("run-2024.Pdf")));
        assert!(!is_pdf_path(Path::new("payslips.docx")));
        assert!(!is_pdf_path(Path::new("payslips")));
        assert!(!is_pdf_path(Path::new("pdf")));
    }

    #[test]
    fn open_rejects_non_pdf_extension() {
        let err = PagedDocument::open("notes.txt").unwrap_err();
        assert!(matches!(err, DispatchError::NotAPdf { .. }));
    }

    #[test]
    fn open_rejects_missing_file() {
        let err = PagedDocument::open("/no/such/file.pdf").unwrap_err();
        assert!(matches!(err, DispatchError::FileNotFound { .. }));
    }
}
