use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::{aggregate::count_by, domain::Record, protocol::UploadResponse};
use tracing::info;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub records_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8001".into(),
            records_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:3004".into(),
            ],
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then `server.toml`, then environment; later sources win.
pub(crate) fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) {
            let get = |key: &str| file_cfg.get(key).and_then(value_text);
            if let Some(v) = get("bind_addr") {
                settings.server_bind = v;
            }
            if let Some(v) = get("records_path") {
                settings.records_path = Some(PathBuf::from(v));
            }
            if let Some(v) = get("max_upload_bytes") {
                if let Ok(parsed) = v.parse::<usize>() {
                    settings.max_upload_bytes = parsed;
                }
            }
            if let Some(v) = get("allowed_origins") {
                settings.allowed_origins = split_origins(&v);
            }
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__RECORDS_PATH") {
        settings.records_path = Some(PathBuf::from(v));
    }

    if let Some(v) = env("APP__MAX_UPLOAD_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_upload_bytes = parsed;
        }
    }

    if let Some(v) = env("APP__ALLOWED_ORIGINS") {
        settings.allowed_origins = split_origins(&v);
    }

    settings
}

fn value_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(toml::Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads the record fixture served by the upload route. Accepts either a bare
/// JSON array of records or a full upload reply.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let raw = fs::read(path)
        .with_context(|| format!("failed to read records fixture '{}'", path.display()))?;
    if let Ok(records) = serde_json::from_slice::<Vec<Record>>(&raw) {
        return Ok(records);
    }
    let reply: UploadResponse = serde_json::from_slice(&raw)
        .with_context(|| format!("records fixture '{}' is not valid JSON", path.display()))?;
    Ok(reply.into_records().unwrap_or_default())
}

pub fn log_record_stats(records: &[Record]) {
    info!(total = records.len(), "records fixture loaded");
    for (label, counts) in [
        ("status", count_by(records, Record::status_key)),
        ("sector", count_by(records, Record::sector_key)),
        ("hospital", count_by(records, Record::hospital_key)),
    ] {
        for (key, count) in counts {
            info!(group = label, %key, count, "fixture distribution");
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
