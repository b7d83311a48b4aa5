use async_trait::async_trait;
use reqwest::{
    header::ACCEPT,
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::FileKind,
    protocol::{upload_route, UploadResponse, UPLOAD_FIELD},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub mod intake;
pub mod session;

pub use intake::{
    FileHandle, FileHandleError, FilePair, IntakeController, IntakeError, IntakeStatus,
    SubmitOutcome, MISSING_FILES_MESSAGE,
};
pub use session::{RecordSink, Session, SessionWatcher};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },
    #[error("failed to reach upload service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed upload reply: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid upload service url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Remote service that turns a PDF and a spreadsheet into records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn upload(
        &self,
        pdf: &FileHandle,
        spreadsheet: &FileHandle,
    ) -> Result<UploadResponse, UploadError>;
}

pub struct HttpRecordSource {
    http: Client,
    endpoint: Url,
}

impl HttpRecordSource {
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, UploadError> {
        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(upload_route().trim_start_matches('/'))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn file_part(file: &FileHandle) -> Result<Part, UploadError> {
    let part = Part::bytes(file.content().to_vec())
        .file_name(file.name().to_string())
        .mime_str(FileKind::mime_type(file.name()))?;
    Ok(part)
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn upload(
        &self,
        pdf: &FileHandle,
        spreadsheet: &FileHandle,
    ) -> Result<UploadResponse, UploadError> {
        // Both documents share one field name; the PDF goes first.
        let form = Form::new()
            .part(UPLOAD_FIELD, file_part(pdf)?)
            .part(UPLOAD_FIELD, file_part(spreadsheet)?);

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!(endpoint = %self.endpoint, bytes = body.len(), "upload reply received");
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
