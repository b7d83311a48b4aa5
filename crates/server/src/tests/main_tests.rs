use super::*;
use axum::{
    body::{self, Body},
    http::{header, Request},
};
use tower::ServiceExt;

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

fn fixture() -> Vec<Record> {
    vec![
        Record::new("Ana", "Triagem")
            .with_status("Alta")
            .with_entry("2024-03-05"),
        Record::new("Bruno", "Observação").with_status("Internado"),
    ]
}

fn test_app(records: Vec<Record>, settings: Settings) -> Router {
    build_router(Arc::new(AppState { records }), &settings)
}

fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::post("/test-upload/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn root_reports_api_is_up() {
    let app = test_app(Vec::new(), Settings::default());
    let request = Request::get("/").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let dto: HealthResponse = serde_json::from_slice(&body).expect("json");
    assert_eq!(dto.message, "API está funcionando");
}

#[tokio::test]
async fn upload_returns_fixture_records() {
    let app = test_app(fixture(), Settings::default());
    let body = multipart_body(&[
        ("files", "relatorio.pdf", &b"%PDF-1.7"[..]),
        ("files", "dados.xlsx", &b"PK\x03\x04"[..]),
    ]);
    let response = app.oneshot(upload_request(body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let reply: UploadResponse = serde_json::from_slice(&body).expect("json");
    assert_eq!(reply.status.as_deref(), Some("success"));
    assert_eq!(reply.into_records(), Some(fixture()));
}

#[tokio::test]
async fn upload_without_fixture_returns_empty_data() {
    let app = test_app(Vec::new(), Settings::default());
    let body = multipart_body(&[("files", "relatorio.pdf", &b"%PDF-1.7"[..])]);
    let response = app.oneshot(upload_request(body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn upload_without_file_parts_is_rejected() {
    let app = test_app(fixture(), Settings::default());
    let body = multipart_body(&[("other", "notes.txt", &b"hello"[..])]);
    let response = app.oneshot(upload_request(body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let err: ApiError = serde_json::from_slice(&body).expect("json");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let settings = Settings {
        max_upload_bytes: 64,
        ..Settings::default()
    };
    let app = test_app(fixture(), settings);
    let big = vec![b'x'; 1024];
    let body = multipart_body(&[("files", "relatorio.pdf", &big[..])]);
    let response = app.oneshot(upload_request(body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let app = test_app(Vec::new(), Settings::default());
    let request = Request::get("/")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}
