use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn no_env(_: &str) -> Option<String> {
    None
}

fn temp_path(name: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    env::temp_dir().join(format!("upa_server_{name}_{suffix}.json"))
}

#[test]
fn defaults_apply_without_sources() {
    let settings = settings_from_sources(None, no_env);
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_bind, "127.0.0.1:8001");
    assert_eq!(settings.records_path, None);
}

#[test]
fn file_values_override_defaults() {
    let file = r#"
        bind_addr = "0.0.0.0:9000"
        records_path = "inputs/merged.json"
        max_upload_bytes = 1024
        allowed_origins = ["https://a.example", " https://b.example"]
    "#;
    let settings = settings_from_sources(Some(file), no_env);
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(
        settings.records_path,
        Some(PathBuf::from("inputs/merged.json"))
    );
    assert_eq!(settings.max_upload_bytes, 1024);
    assert_eq!(
        settings.allowed_origins,
        ["https://a.example", "https://b.example"]
    );
}

#[test]
fn environment_overrides_file() {
    let file = r#"bind_addr = "0.0.0.0:9000""#;
    let settings = settings_from_sources(Some(file), |key| match key {
        "SERVER_BIND" => Some("127.0.0.1:1".to_string()),
        "APP__BIND_ADDR" => Some("127.0.0.1:2".to_string()),
        "APP__MAX_UPLOAD_BYTES" => Some("not-a-number".to_string()),
        _ => None,
    });
    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert_eq!(
        settings.max_upload_bytes,
        Settings::default().max_upload_bytes
    );
}

#[test]
fn malformed_file_is_ignored() {
    let settings = settings_from_sources(Some("this is not = = toml"), no_env);
    assert_eq!(settings, Settings::default());
}

#[test]
fn loads_bare_record_array() {
    let path = temp_path("array");
    fs::write(
        &path,
        r#"[{"Nome": "Ana", "Setor": "Triagem", "Status": "Alta"}]"#,
    )
    .expect("write fixture");

    let records = load_records(&path).expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_key(), "Alta");

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn loads_upload_reply_shape() {
    let path = temp_path("reply");
    fs::write(
        &path,
        r#"{"status": "success", "data": [{"data": [{"Nome": "Ana", "Setor": "Triagem"}]}]}"#,
    )
    .expect("write fixture");

    let records = load_records(&path).expect("records");
    assert_eq!(records.len(), 1);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn missing_fixture_is_an_error() {
    let err = load_records(&temp_path("missing")).expect_err("must fail");
    assert!(err.to_string().contains("failed to read records fixture"));
}
