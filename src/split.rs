//! Page splitting and the split-then-rename orchestrator.
//!
//! [`split_into_pages`] fans a multi-page PDF out into one file per page,
//! `page0.pdf` … `page{N-1}.pdf`, inside a directory named after the input
//! file's basename (everything before the first `.`). Re-running is
//! idempotent at the directory level: the directory is reused and
//! same-named page files are overwritten.
//!
//! [`split_and_rename`] then walks the output directory in filesystem
//! listing order and renames each page file from its content. The PDF work
//! is CPU-bound lopdf object surgery, so both run the blocking body on
//! `spawn_blocking`.

use crate::error::DispatchError;
use crate::pagedoc::{is_pdf_path, PagedDocument};
use crate::rename::rename_from_content;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Directory the split pages of `path` are written into: the input path
/// with the portion of its file name before the first `.`.
pub fn output_dir(path: &Path) -> PathBuf {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default();
    match path.parent() {
        Some(parent) => parent.join(stem),
        None => PathBuf::from(stem),
    }
}

/// Split a PDF into one-page files, returning the written paths in page
/// order.
///
/// A non-PDF input fails with [`DispatchError::NotAPdf`] before any output
/// directory is created.
pub async fn split_into_pages(path: impl AsRef<Path>) -> Result<Vec<PathBuf>, DispatchError> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || split_blocking(&path))
        .await
        .map_err(|e| DispatchError::Internal(format!("split task panicked: {e}")))?
}

fn split_blocking(path: &Path) -> Result<Vec<PathBuf>, DispatchError> {
    if !is_pdf_path(path) {
        return Err(DispatchError::NotAPdf {
            path: path.to_path_buf(),
        });
    }

    let doc = PagedDocument::open(path)?;
    let dir = output_dir(path);
    std::fs::create_dir_all(&dir).map_err(|e| DispatchError::OutputWriteFailed {
        path: dir.clone(),
        source: e,
    })?;

    let page_count = doc.page_count();
    let mut written = Vec::with_capacity(page_count);

    for index in 0..page_count {
        let out = dir.join(format!("page{index}.pdf"));
        doc.write_page(index, &out)?;
        info!("wrote {}", out.display());
        written.push(out);
    }

    Ok(written)
}

/// Split a PDF, then rename every produced page file from its content.
///
/// The rename pass discovers pages by listing the output directory, in
/// whatever order the filesystem yields. The listing is snapshotted before
/// the first rename — readdir behavior is unspecified while the directory
/// is being mutated, so renaming mid-iteration could skip or revisit
/// entries. A page whose content cannot be parsed is logged and skipped so
/// the remaining pages still get renamed; the first such failure is
/// returned after the pass completes. Renames already performed stay in
/// effect — there is no rollback.
pub async fn split_and_rename(path: impl AsRef<Path>) -> Result<(), DispatchError> {
    let path = path.as_ref();
    let pages = split_into_pages(path).await?;
    info!("split {} into {} pages", path.display(), pages.len());

    let dir = output_dir(path);
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| DispatchError::DirectoryReadFailed {
            path: dir.clone(),
            source: e,
        })?;

    let mut to_rename = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DispatchError::DirectoryReadFailed {
            path: dir.clone(),
            source: e,
        })?
    {
        to_rename.push(entry.path());
    }

    let mut first_failure: Option<DispatchError> = None;

    for page in to_rename {
        if let Err(e) = rename_from_content(&page).await {
            error!("rename failed for {}: {}", page.display(), e);
            first_failure.get_or_insert(e);
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_strips_everything_after_first_dot() {
        assert_eq!(
            output_dir(Path::new("/data/run-2024.01.pdf")),
            PathBuf::from("/data/run-2024")
        );
        assert_eq!(output_dir(Path::new("payslips.pdf")), PathBuf::from("payslips"));
    }

    #[tokio::test]
    async fn non_pdf_input_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("payslips.docx");
        std::fs::write(&input, "not a pdf").unwrap();

        let err = split_into_pages(&input).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotAPdf { .. }));
        assert!(!dir.path().join("payslips").exists());
    }
}
