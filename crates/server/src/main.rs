use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::Record,
    error::{ApiError, ErrorCode},
    protocol::{health_route, upload_route, HealthResponse, UploadResponse, UPLOAD_FIELD},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};
use tracing::{error, info, warn};

mod config;

use config::{load_records, load_settings, log_record_stats, Settings};

const FILE_READ_TIMEOUT: Duration = Duration::from_secs(30);

struct AppState {
    records: Vec<Record>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let records = match &settings.records_path {
        Some(path) => load_records(path).map_err(|error| {
            error!(path = %path.display(), %error, "failed to load records fixture");
            error
        })?,
        None => {
            info!("no records fixture configured; uploads will return an empty list");
            Vec::new()
        }
    };
    log_record_stats(&records);

    let app = build_router(Arc::new(AppState { records }), &settings);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, settings: &Settings) -> Router {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(health_route(), get(read_root))
        .route(upload_route(), post(upload_files))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

async fn read_root() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "API está funcionando".to_string(),
    })
}

fn validation(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(ErrorCode::Validation, message)),
    )
}

async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut received = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                let status = e.status();
                warn!(error = %e, "malformed multipart body");
                let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    ErrorCode::PayloadTooLarge
                } else {
                    ErrorCode::Validation
                };
                return Err((status, Json(ApiError::new(code, e.body_text()))));
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let bytes = match tokio::time::timeout(FILE_READ_TIMEOUT, field.bytes()).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                error!(%filename, error = %e, "failed to read uploaded file");
                return Err((
                    e.status(),
                    Json(ApiError::new(ErrorCode::Internal, "Erro ao processar arquivo")),
                ));
            }
            Err(_) => {
                error!(%filename, "timed out reading uploaded file");
                return Err((
                    StatusCode::REQUEST_TIMEOUT,
                    Json(ApiError::new(
                        ErrorCode::Timeout,
                        "Timeout ao processar arquivo",
                    )),
                ));
            }
        };
        info!(%filename, size_bytes = bytes.len(), "file received");
        received += 1;
    }

    if received == 0 {
        return Err(validation("no files received"));
    }
    info!(files = received, records = state.records.len(), "upload processed");
    Ok(Json(UploadResponse::success(state.records.clone())))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
