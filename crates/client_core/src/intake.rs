//! Dual-file intake: slot assignment, completeness check and a single
//! in-flight submission to the record source.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::domain::FileKind;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{session::RecordSink, RecordSource, UploadError};

pub const MISSING_FILES_MESSAGE: &str =
    "Por favor, selecione um arquivo PDF e um arquivo Excel (XLSX).";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{}", MISSING_FILES_MESSAGE)]
    MissingFiles,
    #[error(transparent)]
    Upload(#[from] UploadError),
}

#[derive(Debug, Error)]
pub enum FileHandleError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("path '{}' has no file name", .0.display())]
    MissingName(PathBuf),
}

/// Binary content plus the filename used to classify and display it.
#[derive(Clone)]
pub struct FileHandle {
    name: String,
    content: Arc<[u8]>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: Arc::from(content.into()),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, FileHandleError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FileHandleError::MissingName(path.to_path_buf()))?;
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| FileHandleError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(name, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::classify(&self.name)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("len", &self.content.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilePair {
    pub pdf: Option<FileHandle>,
    pub spreadsheet: Option<FileHandle>,
}

impl FilePair {
    /// Puts `file` into its slot, replacing whatever was there.
    /// Files of any other type are ignored.
    pub fn assign(&mut self, file: FileHandle) -> Option<FileKind> {
        let kind = file.kind()?;
        match kind {
            FileKind::Pdf => self.pdf = Some(file),
            FileKind::Spreadsheet => self.spreadsheet = Some(file),
        }
        Some(kind)
    }

    pub fn slot(&self, kind: FileKind) -> Option<&FileHandle> {
        match kind {
            FileKind::Pdf => self.pdf.as_ref(),
            FileKind::Spreadsheet => self.spreadsheet.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pdf.is_some() && self.spreadsheet.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pdf.is_none() && self.spreadsheet.is_none()
    }

    pub fn clear(&mut self) {
        self.pdf = None;
        self.spreadsheet = None;
    }
}

/// Point-in-time view of the controller for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntakeStatus {
    pub uploading: bool,
    pub error: Option<String>,
    pub pdf_name: Option<String>,
    pub spreadsheet_name: Option<String>,
}

impl IntakeStatus {
    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.uploading && self.pdf_name.is_some() && self.spreadsheet_name.is_some()
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Records were handed to the sink and the slots were cleared.
    Delivered { records: usize },
    /// The service answered without a record list; nothing was applied.
    NoData,
    /// Another submission is still in flight.
    Busy,
    Failed(IntakeError),
}

#[derive(Default)]
struct IntakeState {
    files: FilePair,
    error: Option<String>,
}

/// Clears the in-flight flag when dropped, including when the `submit`
/// future is cancelled mid-upload.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct IntakeController<S: RecordSource> {
    source: S,
    inner: Mutex<IntakeState>,
    uploading: AtomicBool,
}

impl<S: RecordSource> IntakeController<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            inner: Mutex::new(IntakeState::default()),
            uploading: AtomicBool::new(false),
        }
    }

    /// Single entry point for picker and drag-and-drop selections.
    ///
    /// Allowed while uploading: the in-flight request already owns its copy
    /// of the files.
    pub async fn select_files(&self, handles: impl IntoIterator<Item = FileHandle>) {
        let mut guard = self.inner.lock().await;
        for handle in handles {
            let name = handle.name().to_string();
            match guard.files.assign(handle) {
                Some(kind) => debug!(file = %name, ?kind, "file assigned to slot"),
                None => debug!(file = %name, "ignoring file with unsupported extension"),
            }
        }
        guard.error = None;
    }

    pub async fn status(&self) -> IntakeStatus {
        let guard = self.inner.lock().await;
        IntakeStatus {
            uploading: self.uploading.load(Ordering::Acquire),
            error: guard.error.clone(),
            pdf_name: guard.files.pdf.as_ref().map(|f| f.name().to_string()),
            spreadsheet_name: guard
                .files
                .spreadsheet
                .as_ref()
                .map(|f| f.name().to_string()),
        }
    }

    pub async fn files(&self) -> FilePair {
        self.inner.lock().await.files.clone()
    }

    pub async fn submit<K>(&self, sink: &K) -> SubmitOutcome
    where
        K: RecordSink + ?Sized,
    {
        let (in_flight, pdf, spreadsheet) = {
            let mut guard = self.inner.lock().await;
            if self.uploading.load(Ordering::Acquire) {
                debug!("submission already in flight; ignoring submit");
                return SubmitOutcome::Busy;
            }
            let (Some(pdf), Some(spreadsheet)) =
                (guard.files.pdf.clone(), guard.files.spreadsheet.clone())
            else {
                guard.error = Some(IntakeError::MissingFiles.to_string());
                return SubmitOutcome::Failed(IntakeError::MissingFiles);
            };
            let Some(in_flight) = InFlight::acquire(&self.uploading) else {
                return SubmitOutcome::Busy;
            };
            guard.error = None;
            (in_flight, pdf, spreadsheet)
        };

        info!(
            pdf = %pdf.name(),
            spreadsheet = %spreadsheet.name(),
            "submitting files for processing"
        );
        let result = self.source.upload(&pdf, &spreadsheet).await;

        let mut guard = self.inner.lock().await;
        drop(in_flight);
        match result {
            Ok(reply) => match reply.into_records() {
                Some(records) => {
                    guard.files.clear();
                    drop(guard);
                    let count = records.len();
                    info!(records = count, "upload processed");
                    sink.receive(records);
                    SubmitOutcome::Delivered { records: count }
                }
                None => {
                    warn!("upload reply has no data field; keeping current records");
                    SubmitOutcome::NoData
                }
            },
            Err(err) => {
                error!(error = %err, "upload failed");
                guard.error = Some(err.to_string());
                SubmitOutcome::Failed(IntakeError::Upload(err))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
