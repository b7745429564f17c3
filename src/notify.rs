//! Matching-and-notification pipeline with retrying delivery.
//!
//! Flow: look the staff ID up in the user directory, scan a folder for the
//! first file whose name contains the ID's decimal digits, and deliver that
//! file by mail with bounded retry.
//!
//! ## Retry Strategy
//!
//! SMTP failures are frequently transient (greylisting, connection resets,
//! overloaded relays). Delivery retries up to `RetryPolicy::max_attempts`
//! times with the policy's backoff between attempts; attempts are strictly
//! sequential. Exhaustion is **logged and swallowed** — delivery failure is
//! an operator-visible outcome, not an error the caller can act on. The
//! attachment availability check re-runs on every attempt, since the
//! matched file can appear or disappear between attempts.
//!
//! Two further outcomes are normal results rather than errors: a staff ID
//! with no user record, and a scan with no matching file. Callers who need
//! an explicit no-match signal can run [`scan_folder`] themselves.

use crate::config::RetryPolicy;
use crate::directory::UserDirectory;
use crate::error::DispatchError;
use crate::mailer::{MailSender, OutgoingMessage, PdfAttachment};
use crate::pagedoc::is_pdf_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// The single folder entry whose name contains the target staff ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Bare file name, as listed.
    pub filename: String,
    /// Full path to the matched file.
    pub full_path: PathBuf,
}

/// Scan `folder` in filesystem listing order and return the first entry
/// whose name contains the decimal digits of `staff_id`.
///
/// Scanning stops at the first match; later entries are never examined,
/// even if they would also match. Listing order is platform-defined.
pub async fn scan_folder(
    folder: &Path,
    staff_id: i64,
) -> Result<Option<MatchResult>, DispatchError> {
    let needle = staff_id.to_string();

    let mut entries = tokio::fs::read_dir(folder).await.map_err(|e| {
        // A folder that exists but cannot be listed is a different failure
        // from a missing one; keep the distinction for callers.
        if e.kind() == std::io::ErrorKind::NotFound {
            DispatchError::FolderNotFound {
                path: folder.to_path_buf(),
            }
        } else {
            DispatchError::DirectoryReadFailed {
                path: folder.to_path_buf(),
                source: e,
            }
        }
    })?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DispatchError::DirectoryReadFailed {
            path: folder.to_path_buf(),
            source: e,
        })?
    {
        let filename = entry.file_name().to_string_lossy().into_owned();
        debug!("processing file {}", filename);
        if filename.contains(&needle) {
            return Ok(Some(MatchResult {
                filename,
                full_path: entry.path(),
            }));
        }
    }

    Ok(None)
}

/// The notification pipeline. Construct with the collaborators it needs;
/// their lifetimes are scoped to the caller, not to the process.
pub struct NotificationPipeline {
    directory: Arc<dyn UserDirectory>,
    mailer: Arc<dyn MailSender>,
    retry: RetryPolicy,
}

impl NotificationPipeline {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        mailer: Arc<dyn MailSender>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            directory,
            mailer,
            retry,
        }
    }

    /// Locate the user for `staff_id`, find their file in `folder`, and
    /// deliver it.
    ///
    /// Returns `Ok(())` for all of: delivered, user not found, no matching
    /// file, and delivery retries exhausted — the latter three are logged.
    /// Errors are reserved for a missing folder and directory-backend
    /// failures.
    pub async fn notify(&self, folder: &Path, staff_id: i64) -> Result<(), DispatchError> {
        // ── Step 1: Validate the folder ──────────────────────────────────
        if !folder.is_dir() {
            return Err(DispatchError::FolderNotFound {
                path: folder.to_path_buf(),
            });
        }

        // ── Step 2: Look the user up ─────────────────────────────────────
        let user = match self.directory.find_by_staff_id(staff_id).await? {
            Some(user) => user,
            None => {
                info!("ID: {} - user information not found", staff_id);
                return Ok(());
            }
        };

        // ── Step 3: Scan for the first matching file ─────────────────────
        let matched = match scan_folder(folder, staff_id).await? {
            Some(m) => m,
            None => {
                debug!("no file in {} matches staff ID {}", folder.display(), staff_id);
                return Ok(());
            }
        };
        info!("matched {} for staff ID {}", matched.filename, staff_id);

        // ── Step 4: Deliver with bounded retry ───────────────────────────
        self.send_with_retry(&user.email, staff_id, &matched).await;
        Ok(())
    }

    /// Deliver the notification, retrying transient failures.
    ///
    /// Never returns an error: exhaustion is logged. A missing recipient or
    /// filename aborts before the first attempt without consuming one.
    async fn send_with_retry(&self, recipient: &str, staff_id: i64, matched: &MatchResult) {
        if recipient.is_empty() || matched.filename.is_empty() {
            warn!("missing information for email notification; not sending");
            return;
        }

        let subject = format!("User ID: {} in File: {}", staff_id, matched.filename);
        let body = format!(
            "Hi {recipient},\n\nPlease find the attached file for your reference.\n\nRegards,\nYours Thankfully."
        );

        for attempt in 0..self.retry.max_attempts {
            // Re-checked every attempt: the file may have appeared or
            // vanished since the last one.
            let attachment = load_attachment(matched).await;

            let message = OutgoingMessage {
                to: recipient.to_string(),
                subject: subject.clone(),
                body: body.clone(),
                attachment,
            };

            match self.mailer.send(&message).await {
                Ok(()) => {
                    info!(
                        "email notification sent to {} for staff ID {}",
                        recipient, staff_id
                    );
                    return;
                }
                Err(e) => {
                    warn!(
                        "attempt {}/{} failed sending to {}: {}",
                        attempt + 1,
                        self.retry.max_attempts,
                        recipient,
                        e
                    );
                    if attempt + 1 < self.retry.max_attempts {
                        let delay = self.retry.delay(attempt);
                        info!("retrying email sending in {:?}", delay);
                        sleep(delay).await;
                    }
                }
            }
        }

        warn!(
            "maximum retries ({}) reached; email sending failed for staff ID {}",
            self.retry.max_attempts, staff_id
        );
    }
}

/// Read the matched file for attachment, if it qualifies.
///
/// Included only when the filename ends in `.pdf` (case-insensitively) and
/// the file is readable right now; otherwise the send proceeds text-only
/// with a warning.
async fn load_attachment(matched: &MatchResult) -> Option<PdfAttachment> {
    if !is_pdf_path(Path::new(&matched.filename)) {
        warn!(
            "{} is not a PDF file; sending without attachment",
            matched.filename
        );
        return None;
    }

    match tokio::fs::read(&matched.full_path).await {
        Ok(bytes) => Some(PdfAttachment {
            filename: matched.filename.clone(),
            bytes,
        }),
        Err(e) => {
            warn!(
                "{} could not be read ({}); sending without attachment",
                matched.full_path.display(),
                e
            );
            None
        }
    }
}
