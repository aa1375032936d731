//! HTTP server for the cue sheet editor.
//!
//! # API Endpoints
//!
//! | Method | Path                      | Description                               |
//! |--------|---------------------------|-------------------------------------------|
//! | GET    | `/health`                 | Health check                              |
//! | POST   | `/api/import`             | Upload CSV/XLSX, returns proposed mapping |
//! | PUT    | `/api/import/mapping`     | Replace the staged mapping                |
//! | POST   | `/api/import/commit`      | Apply mapping, replace rows               |
//! | DELETE | `/api/import`             | Discard the staged import                 |
//! | GET    | `/api/rows`               | Rows and session info                     |
//! | POST   | `/api/rows`               | Add (or insert) a row                     |
//! | DELETE | `/api/rows`               | Remove all rows                           |
//! | PUT    | `/api/rows/{id}`          | Partial row update                        |
//! | DELETE | `/api/rows/{id}`          | Delete a row                              |
//! | GET    | `/api/rows/{id}/errors`   | First error per field for one row         |
//! | PUT    | `/api/session`            | Rename the session                        |
//! | POST   | `/api/session/new`        | Start a new, empty session                |
//! | GET    | `/api/validate`           | Validation report for all rows            |
//! | GET    | `/api/export`             | Download the CSV (409 when refused)       |
//! | GET    | `/api/events`             | SSE stream of store changes               |
//! | GET    | `/api/logs`               | SSE stream of activity logs               |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, sse::KeepAlive, IntoResponse, Json, Response, Sse},
    routing::{get, post, put},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{
    api_error, export_error, import_error, AddRowRequest, ApiError, ImportPreview, RenameRequest,
    RowsResponse, SessionInfo,
};
use crate::config::Config;
use crate::error::ServerResult;
use crate::export::export_csv;
use crate::import::{read_table, CommitSummary, ImportSession};
use crate::mapping::ColumnMapping;
use crate::models::{Field, Row, RowPatch};
use crate::store::{RowStore, StoreEvent};
use crate::validation::{get_field_errors, validate_all_rows, ValidationReport};

const KEEP_ALIVE_SECS: u64 = 15;

/// Everything one editing session owns.
#[derive(Debug, Default)]
pub struct Workspace {
    pub store: RowStore,
    pub import: ImportSession,
}

/// Shared server state.
pub struct AppState {
    workspace: Mutex<Workspace>,
    events: broadcast::Sender<StoreEvent>,
    config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        let mut workspace = Workspace::default();

        let sender = events.clone();
        workspace.store.subscribe(move |event| {
            // No listeners is fine
            let _ = sender.send(*event);
        });
        workspace.store.set_file_name(&config.default_session_name());

        Arc::new(Self {
            workspace: Mutex::new(workspace),
            events,
            config,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Workspace>, ApiError> {
        self.workspace
            .lock()
            .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "Session state poisoned"))
    }
}

/// Build the router with all routes and layers.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/import", post(upload_import).delete(cancel_import))
        .route("/api/import/mapping", put(update_mapping))
        .route("/api/import/commit", post(commit_import))
        .route("/api/rows", get(list_rows).post(add_row).delete(clear_rows))
        .route("/api/rows/{id}", put(update_row).delete(delete_row))
        .route("/api/rows/{id}/errors", get(row_errors))
        .route("/api/session", put(rename_session))
        .route("/api/session/new", post(new_session))
        .route("/api/validate", get(validate))
        .route("/api/export", get(export))
        .route("/api/events", get(sse_events))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> ServerResult<()> {
    let port = config.port;
    let app = router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🎧 Cue sheet server running on http://localhost:{}", port);
    println!("   POST /api/import  - Upload CSV or XLSX");
    println!("   GET  /api/rows    - Current cue sheet");
    println!("   GET  /api/export  - Download CSV");
    println!("   GET  /api/events  - SSE store changes");
    println!("   GET  /api/logs    - SSE activity log");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Meta
// =============================================================================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cuesheet",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(KEEP_ALIVE_SECS))
        .text("keep-alive")
}

/// SSE stream of store changes.
async fn sse_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|result| {
        let event = result.ok()?;
        let json = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().event("store").data(json)))
    });

    Sse::new(stream).keep_alive(keep_alive())
}

/// SSE stream of activity logs; recent history is replayed first.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let replay: Vec<Result<Event, Infallible>> = LOG_BROADCASTER
        .recent()
        .iter()
        .filter_map(|entry| serde_json::to_string(entry).ok())
        .map(|json| Ok(Event::default().data(json)))
        .collect();

    let live = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(tokio_stream::iter(replay).chain(live)).keep_alive(keep_alive())
}

// =============================================================================
// Import
// =============================================================================

async fn upload_import(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportPreview>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, &format!("Read error: {}", e)))?;
            upload = Some((name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No file provided"))?;

    let ticket = state.lock()?.import.begin_read(&file_name).map_err(|e| import_error(&e))?;
    log_info(format!("Received {} ({} bytes)", file_name, bytes.len()));

    // Decode off the async runtime; the workspace is unlocked meanwhile.
    let kind = ticket.kind;
    let result = tokio::task::spawn_blocking(move || read_table(kind, &bytes))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;

    let mut workspace = state.lock()?;
    let staged = workspace
        .import
        .finish_read(ticket, result)
        .map_err(|e| import_error(&e))?;
    Ok(Json(ImportPreview::from(staged)))
}

async fn update_mapping(
    State(state): State<Arc<AppState>>,
    Json(mapping): Json<ColumnMapping>,
) -> Result<Json<ImportPreview>, ApiError> {
    let mut workspace = state.lock()?;
    let staged = workspace.import.set_mapping(mapping).map_err(|e| import_error(&e))?;
    Ok(Json(ImportPreview::from(staged)))
}

async fn commit_import(State(state): State<Arc<AppState>>) -> Result<Json<CommitSummary>, ApiError> {
    let mut guard = state.lock()?;
    let workspace = &mut *guard;
    let summary = workspace
        .import
        .commit(&mut workspace.store)
        .map_err(|e| import_error(&e))?;
    Ok(Json(summary))
}

async fn cancel_import(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let cancelled = state.lock()?.import.cancel();
    Ok(Json(json!({ "cancelled": cancelled })))
}

// =============================================================================
// Rows
// =============================================================================

async fn list_rows(State(state): State<Arc<AppState>>) -> Result<Json<RowsResponse>, ApiError> {
    let workspace = state.lock()?;
    Ok(Json(RowsResponse::from(&workspace.store)))
}

async fn add_row(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddRowRequest>,
) -> Result<(StatusCode, Json<Row>), ApiError> {
    let mut workspace = state.lock()?;
    let row = match request.before_id {
        Some(before) => workspace.store.insert_row_before(&before, request.row),
        None => workspace.store.add_row(request.row),
    };
    Ok((StatusCode::CREATED, Json(row)))
}

async fn update_row(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<RowPatch>,
) -> Result<Json<Row>, ApiError> {
    let mut workspace = state.lock()?;
    if !workspace.store.update_row(&id, patch) {
        return Err(row_not_found(&id));
    }
    workspace
        .store
        .row(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| row_not_found(&id))
}

async fn delete_row(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.lock()?.store.delete_row(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(row_not_found(&id))
    }
}

async fn clear_rows(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.lock()?.store.clear_all_rows();
    Ok(StatusCode::NO_CONTENT)
}

async fn row_errors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BTreeMap<Field, String>>, ApiError> {
    let workspace = state.lock()?;
    let row = workspace.store.row(&id).ok_or_else(|| row_not_found(&id))?;
    Ok(Json(get_field_errors(row, workspace.store.rows())))
}

fn row_not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, &format!("Row not found: {}", id))
}

// =============================================================================
// Session, validation, export
// =============================================================================

async fn rename_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<SessionInfo>, ApiError> {
    let mut workspace = state.lock()?;
    workspace.store.set_file_name(&request.name);
    Ok(Json(SessionInfo::from(&workspace.store)))
}

async fn new_session(State(state): State<Arc<AppState>>) -> Result<Json<SessionInfo>, ApiError> {
    let name = state.config.default_session_name();
    let mut workspace = state.lock()?;
    workspace.import.cancel();
    workspace.store.reset();
    workspace.store.set_file_name(&name);
    log_info(format!("New session: {}", name));
    Ok(Json(SessionInfo::from(&workspace.store)))
}

async fn validate(State(state): State<Arc<AppState>>) -> Result<Json<ValidationReport>, ApiError> {
    let workspace = state.lock()?;
    Ok(Json(validate_all_rows(workspace.store.rows())))
}

async fn export(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let file = export_csv(&mut state.lock()?.store).map_err(export_error)?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content,
    )
        .into_response())
}
