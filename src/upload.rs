//! Document upload: local pre-submit checks, the "upload" workflow run,
//! and the transient banner state shown to the user.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mime_guess::mime;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::workflow::{Orchestrator, RunSummary, WorkflowError, WorkflowSpec};

/// Largest upload accepted locally.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ═══════════════════════════════════════════════════════════
// UploadFile
// ═══════════════════════════════════════════════════════════

/// A file selected for upload, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    file_name: String,
    declared_mime: Option<String>,
    mime_type: String,
    contents: Vec<u8>,
}

impl UploadFile {
    /// `declared_mime` is what the picker reported, if anything. Without it
    /// the type is guessed from the extension.
    pub fn new(file_name: impl Into<String>, declared_mime: Option<&str>, contents: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = match declared_mime {
            Some(declared) => declared.to_string(),
            None => mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .to_string(),
        };
        Self {
            file_name,
            declared_mime: declared_mime.map(str::to_string),
            mime_type,
            contents,
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;
        let contents = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, None, contents))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn declared_mime(&self) -> Option<&str> {
        self.declared_mime.as_deref()
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Local validation
// ═══════════════════════════════════════════════════════════

/// Why a file was refused before upload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("A file name is required")]
    MissingName,
    #[error("Only plain text (.txt) files are accepted, got '{file_name}' ({mime_type})")]
    WrongType { file_name: String, mime_type: String },
    #[error("'{0}' is empty")]
    Empty(String),
    #[error("'{file_name}' is {size} bytes, the limit is {limit} bytes")]
    TooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },
    #[error("'{0}' is not valid UTF-8 text")]
    NotUtf8(String),
}

impl From<UploadRejection> for WorkflowError {
    fn from(rejection: UploadRejection) -> Self {
        WorkflowError::Validation(rejection.to_string())
    }
}

/// Check that `file` is a non-empty UTF-8 plain text file within size.
///
/// Both signals must agree: an extension, when present, must map to
/// `text/plain`, and so must a declared MIME type. At least one of the two
/// has to be present.
pub fn validate_upload(file: &UploadFile) -> Result<(), UploadRejection> {
    let name = file.file_name().trim();
    if name.is_empty() {
        return Err(UploadRejection::MissingName);
    }

    let wrong_type = || UploadRejection::WrongType {
        file_name: name.to_string(),
        mime_type: file.mime_type().to_string(),
    };

    let has_extension = Path::new(name).extension().is_some();
    let extension_ok = has_extension
        && mime_guess::from_path(name)
            .iter()
            .any(|m| m.essence_str() == mime::TEXT_PLAIN.essence_str());
    let declared_ok = file.declared_mime().map(is_plain_text);

    match (has_extension, declared_ok) {
        (false, None) => return Err(wrong_type()),
        (true, _) if !extension_ok => return Err(wrong_type()),
        (_, Some(false)) => return Err(wrong_type()),
        _ => {}
    }

    if file.is_empty() {
        return Err(UploadRejection::Empty(name.to_string()));
    }
    if file.len() > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge {
            file_name: name.to_string(),
            size: file.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }
    if std::str::from_utf8(file.contents()).is_err() {
        return Err(UploadRejection::NotUtf8(name.to_string()));
    }
    Ok(())
}

fn is_plain_text(declared: &str) -> bool {
    declared
        .parse::<mime::Mime>()
        .map(|m| m.essence_str() == mime::TEXT_PLAIN.essence_str())
        .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════
// UploadWorkflow
// ═══════════════════════════════════════════════════════════

/// What the upload panel shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadBanner {
    Idle,
    Uploading {
        file_name: String,
    },
    /// Clears itself after the configured delay.
    Succeeded {
        file_name: String,
        document_id: Option<String>,
    },
    /// Stays until the next upload or `dismiss`.
    Failed {
        message: String,
    },
}

struct BannerSlot {
    banner: UploadBanner,
    generation: u64,
}

/// Upload workflow instance. Owns the banner and its reset timer.
pub struct UploadWorkflow {
    orchestrator: Arc<Orchestrator>,
    success_ttl: Duration,
    slot: Arc<Mutex<BannerSlot>>,
    reset_timer: Mutex<Option<JoinHandle<()>>>,
}

impl UploadWorkflow {
    pub fn new(orchestrator: Arc<Orchestrator>, success_ttl: Duration) -> Self {
        Self {
            orchestrator,
            success_ttl,
            slot: Arc::new(Mutex::new(BannerSlot {
                banner: UploadBanner::Idle,
                generation: 0,
            })),
            reset_timer: Mutex::new(None),
        }
    }

    pub fn banner(&self) -> UploadBanner {
        lock(&*self.slot).banner.clone()
    }

    /// Clear the banner now and drop any pending reset.
    pub fn dismiss(&self) {
        let generation = self.cancel_reset();
        set_banner(&self.slot, generation, UploadBanner::Idle);
    }

    /// Validate `file` locally, then run it as the "upload" workflow.
    ///
    /// Rejected files return `Validation` without any gateway call. The run
    /// slot is claimed before the banner changes, so a second submit while
    /// one is in flight returns `Busy` and leaves the first banner alone. A
    /// pending success reset from an earlier upload is cancelled once the
    /// slot is ours. Dropping the returned future mid-upload leaves a
    /// `Failed` banner.
    pub async fn submit(&self, file: UploadFile) -> Result<RunSummary, WorkflowError> {
        if let Err(rejection) = validate_upload(&file) {
            tracing::info!(file = file.file_name(), reason = %rejection, "Upload rejected locally");
            self.show_rejection(&rejection);
            return Err(rejection.into());
        }

        let file_name = file.file_name().to_string();
        let spec = WorkflowSpec::upload(file);
        let guard = self.orchestrator.begin(spec.name, &spec.steps)?;

        let generation = self.cancel_reset();
        set_banner(
            &self.slot,
            generation,
            UploadBanner::Uploading {
                file_name: file_name.clone(),
            },
        );
        let pending = PendingBanner {
            slot: &*self.slot,
            generation,
            settled: false,
        };

        let result = self
            .orchestrator
            .execute(guard, spec.steps, spec.affected)
            .await;

        match &result {
            Ok(summary) => {
                let shown = pending.settle(UploadBanner::Succeeded {
                    file_name,
                    document_id: summary.uploaded_document_id.clone(),
                });
                if shown {
                    self.schedule_reset(generation);
                }
            }
            Err(error) => {
                pending.settle(UploadBanner::Failed {
                    message: error.to_string(),
                });
            }
        }

        result
    }

    // ── Internal ────────────────────────────────────────────

    /// Show a local rejection unless an upload is on screen.
    fn show_rejection(&self, rejection: &UploadRejection) {
        if matches!(lock(&*self.slot).banner, UploadBanner::Uploading { .. }) {
            return;
        }
        let generation = self.cancel_reset();
        set_banner(
            &self.slot,
            generation,
            UploadBanner::Failed {
                message: rejection.to_string(),
            },
        );
    }

    /// Abort the pending reset and start a new banner generation.
    fn cancel_reset(&self) -> u64 {
        if let Some(handle) = lock(&self.reset_timer).take() {
            handle.abort();
        }
        let mut slot = lock(&*self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        slot.generation
    }

    fn schedule_reset(&self, generation: u64) {
        let slot = Arc::clone(&self.slot);
        let ttl = self.success_ttl;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut current = lock(&*slot);
            if current.generation == generation
                && matches!(current.banner, UploadBanner::Succeeded { .. })
            {
                current.banner = UploadBanner::Idle;
                tracing::debug!("Upload success banner cleared");
            }
        });
        *lock(&self.reset_timer) = Some(handle);
    }
}

impl Drop for UploadWorkflow {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.reset_timer).take() {
            handle.abort();
        }
    }
}

// ═══════════════════════════════════════════════════════════
// PendingBanner — settles the banner of a submit in flight
// ═══════════════════════════════════════════════════════════

/// Marks the banner `Failed` with `Interrupted` if dropped unsettled.
struct PendingBanner<'a> {
    slot: &'a Mutex<BannerSlot>,
    generation: u64,
    settled: bool,
}

impl PendingBanner<'_> {
    fn settle(mut self, banner: UploadBanner) -> bool {
        self.settled = true;
        set_banner(self.slot, self.generation, banner)
    }
}

impl Drop for PendingBanner<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!("Upload dropped before it finished");
        set_banner(
            self.slot,
            self.generation,
            UploadBanner::Failed {
                message: WorkflowError::Interrupted.to_string(),
            },
        );
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the banner unless a newer upload has taken over.
fn set_banner(slot: &Mutex<BannerSlot>, generation: u64, banner: UploadBanner) -> bool {
    let mut slot = lock(slot);
    if slot.generation != generation {
        return false;
    }
    slot.banner = banner;
    true
}
