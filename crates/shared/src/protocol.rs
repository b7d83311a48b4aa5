use serde::{Deserialize, Serialize};

use crate::domain::Record;

/// Multipart field name carrying both uploaded documents.
pub const UPLOAD_FIELD: &str = "files";

pub fn upload_route() -> &'static str {
    "/test-upload/"
}

pub fn health_route() -> &'static str {
    "/"
}

/// One element of the upload reply's `data` array: either a record, or a
/// per-file group wrapping its own record list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataEntry {
    Group { data: Vec<Record> },
    Record(Record),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<DataEntry>>,
}

impl UploadResponse {
    pub fn success(records: Vec<Record>) -> Self {
        Self {
            status: Some("success".to_string()),
            data: Some(records.into_iter().map(DataEntry::Record).collect()),
        }
    }

    /// Flattened record list, or `None` when the reply carries no `data` field.
    pub fn into_records(self) -> Option<Vec<Record>> {
        let entries = self.data?;
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                DataEntry::Record(record) => records.push(record),
                DataEntry::Group { data } => records.extend(data),
            }
        }
        Some(records)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
