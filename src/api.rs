// 🌐 REST API - upload endpoint and store status (axum)
//
// Batches run on a blocking worker; the single SQLite connection is shared
// behind a mutex so only one batch touches the store at a time.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, TryLockError};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::db::SqliteStore;
use crate::error::{IngestError, StoreError};
use crate::ingest::{ingest_upload, IngestOptions};

/// Uploads larger than this are refused before reaching the pipeline
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<SqliteStore>>,
    pub options: IngestOptions,
}

impl AppState {
    pub fn new(store: SqliteStore, options: IngestOptions) -> Self {
        AppState {
            db: Arc::new(Mutex::new(store)),
            options,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "OK" }))
}

/// GET /api/db-status - Connection check and row counts
///
/// Never waits on the store lock: a running batch answers 503.
async fn db_status(State(state): State<AppState>) -> Response {
    match state.db.try_lock() {
        Ok(store) => (StatusCode::OK, Json(store.status())).into_response(),
        Err(TryLockError::WouldBlock) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Store busy, try again")
        }
        Err(TryLockError::Poisoned(_)) => {
            error!("Store lock poisoned while checking status");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Store unavailable")
        }
    }
}

/// POST /api/meter-reading-uploads - Multipart upload with a `file` part
async fn upload_meter_readings(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(e) => {
                        warn!("Failed to read upload body: {}", e);
                        return error_response(StatusCode::BAD_REQUEST, "Failed to read uploaded file");
                    }
                }
                break;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart request: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Malformed multipart request");
            }
        }
    }

    let Some((file_name, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file provided or file is empty");
    };

    let outcome = tokio::task::spawn_blocking(move || {
        let mut store = state.db.lock().map_err(|_| {
            IngestError::Lookup(StoreError::Unavailable("store lock poisoned".to_string()))
        })?;
        ingest_upload(&mut *store, &file_name, &bytes, &state.options)
    })
    .await;

    match outcome {
        Ok(Ok(report)) => {
            info!(
                "Upload {} processed: {} accepted, {} rejected",
                report.batch_id,
                report.accepted(),
                report.rejected()
            );
            (StatusCode::OK, Json(report.result)).into_response()
        }
        Ok(Err(IngestError::InvalidInput(message))) => {
            error_response(StatusCode::BAD_REQUEST, &message)
        }
        Ok(Err(e)) => {
            error!("Error processing meter readings: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing the file",
            )
        }
        Err(e) => {
            error!("Ingestion worker failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing the file",
            )
        }
    }
}

/// Build the `/api` router
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/db-status", get(db_status))
        .route("/meter-reading-uploads", post(upload_meter_readings))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
