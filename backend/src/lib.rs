//! # Cuesheet - cue sheet import, validation and export
//!
//! Builds timestamped playlists ("cue sheets") of music, talk and ad
//! segments and exports them in the fixed CSV dialect consumed by broadcast
//! automation systems.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐
//! │ CSV / XLSX │──▶│   Parser   │──▶│  Mapping   │──▶│ Validation │──▶│   Export   │
//! │   bytes    │   │ (auto-enc) │   │ (aliases)  │   │  (rules)   │   │ (CRLF CSV) │
//! └────────────┘   └────────────┘   └────────────┘   └────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cuesheet::{apply_mapping, auto_map, parse, serialize, validate_all_rows};
//!
//! let table = parse("Time,Type,Song,Artist,Album\n00:00:00.000,Music,Intro,Band,LP\n");
//! let rows = apply_mapping(&table, &auto_map(&table.headers));
//!
//! assert!(validate_all_rows(&rows).valid);
//! assert!(serialize(&rows).ends_with("00:00:00.000,music,Intro,Band,LP,"));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Row model, media types, canonical fields
//! - [`offset`] - `HH:MM:SS.mmm` codec
//! - [`parser`] - CSV tokenizer and spreadsheet adapter
//! - [`mapping`] - Header auto-mapping
//! - [`validation`] - Row rules
//! - [`export`] - CSV serialization and file names
//! - [`store`] - Observable row store
//! - [`import`] - Import staging
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod offset;

// Parsing and mapping
pub mod mapping;
pub mod parser;

// Validation
pub mod validation;

// Export
pub mod export;

// State
pub mod import;
pub mod store;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, ExportError, ImportError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{normalize_media_type, Field, MediaType, Row, RowDraft, RowPatch};

// =============================================================================
// Re-exports - Parser
// =============================================================================

pub use parser::{parse, parse_bytes, parse_lines, read_xlsx_bytes, ParsedTable};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{
    apply_mapping, auto_map, check_import_mapping_complete, check_mapping_complete,
    ColumnMapping, MappingCheck,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    get_field_errors, has_errors, validate_all_rows, validate_row, ErrorKind, FieldError,
    RowError, ValidationReport,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{escape_field, export_csv, sanitize_filename, serialize, ExportedFile};

// =============================================================================
// Re-exports - State and configuration
// =============================================================================

pub use config::Config;
pub use import::{FileKind, ImportSession, StagedImport};
pub use store::{RowStore, StoreEvent};

// =============================================================================
// Re-exports - Server
// =============================================================================

pub mod server {
    pub use crate::api::server::*;
}
