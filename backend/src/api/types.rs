//! Request and response bodies for the HTTP API.
//!
//! All JSON uses camelCase keys, matching the row model.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ExportError, ImportError};
use crate::import::{FileKind, StagedImport};
use crate::mapping::{ColumnMapping, MappingCheck};
use crate::models::{Row, RowDraft};
use crate::store::RowStore;

/// Data rows included in an import preview.
pub const PREVIEW_ROWS: usize = 5;

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<Value>);

// =============================================================================
// Import
// =============================================================================

/// Staged import as shown on the mapping screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub file_name: String,
    pub kind: FileKind,
    pub headers: Vec<String>,
    pub row_count: usize,
    /// First few data rows, raw.
    pub preview: Vec<Vec<String>>,
    pub mapping: ColumnMapping,
    /// Mapping covers everything export needs (year aside).
    pub export_ready: MappingCheck,
    /// Mapping is good enough to commit.
    pub import_ready: MappingCheck,
}

impl From<&StagedImport> for ImportPreview {
    fn from(staged: &StagedImport) -> Self {
        Self {
            file_name: staged.file_name.clone(),
            kind: staged.kind,
            headers: staged.table.headers.clone(),
            row_count: staged.table.rows.len(),
            preview: staged.table.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
            mapping: staged.mapping.clone(),
            export_ready: staged.export_check(),
            import_ready: staged.import_check(),
        }
    }
}

// =============================================================================
// Rows and session
// =============================================================================

/// Body of `POST /api/rows`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRowRequest {
    /// Insert before this row instead of appending.
    #[serde(default)]
    pub before_id: Option<String>,
    #[serde(flatten)]
    pub row: RowDraft,
}

/// Body of `PUT /api/session`.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub file_name: String,
    pub row_count: usize,
    pub has_unsaved_changes: bool,
}

impl From<&RowStore> for SessionInfo {
    fn from(store: &RowStore) -> Self {
        Self {
            file_name: store.file_name().to_string(),
            row_count: store.row_count(),
            has_unsaved_changes: store.has_unsaved_changes(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsResponse {
    pub session: SessionInfo,
    pub rows: Vec<Row>,
}

impl From<&RowStore> for RowsResponse {
    fn from(store: &RowStore) -> Self {
        Self {
            session: SessionInfo::from(store),
            rows: store.rows().to_vec(),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Create an error body.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

pub fn api_error(status: StatusCode, error: &str) -> ApiError {
    (status, Json(error_response(error)))
}

fn import_status(error: &ImportError) -> StatusCode {
    match error {
        ImportError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ImportError::Encrypted
        | ImportError::UnsupportedFormat(_)
        | ImportError::Corrupt(_)
        | ImportError::NoHeaders
        | ImportError::NoDataRows
        | ImportError::MappingIncomplete { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ImportError::Superseded | ImportError::NothingStaged => StatusCode::CONFLICT,
        ImportError::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Import failure with its user-facing message.
pub fn import_error(error: &ImportError) -> ApiError {
    let mut body = error_response(&error.user_message());
    body["detail"] = Value::String(error.to_string());
    if let ImportError::MappingIncomplete { missing } = error {
        body["missing"] = json!(missing);
    }
    (import_status(error), Json(body))
}

/// Export refusal; invalid exports carry the full report.
pub fn export_error(error: ExportError) -> ApiError {
    let mut body = error_response(&error.to_string());
    if let ExportError::Invalid { report } = error {
        body["report"] = json!(report);
    }
    (StatusCode::CONFLICT, Json(body))
}
