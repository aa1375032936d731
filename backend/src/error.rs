//! Error types for the cue sheet pipeline.
//!
//! Only failures that stop an operation live here:
//!
//! - [`ImportError`] - File type, file read and mapping failures
//! - [`ExportError`] - Export refusals
//! - [`ConfigError`] - Bad environment configuration
//! - [`ServerError`] - HTTP server failures
//!
//! Row-level validation problems are plain data (see
//! [`crate::validation::FieldError`]) and never appear as `Err`.

use thiserror::Error;

use crate::models::Field;
use crate::validation::ValidationReport;

// =============================================================================
// Import Errors
// =============================================================================

/// Errors while reading an import file or committing its mapping.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Extension other than `.csv` / `.xlsx`.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    /// Password-protected workbook.
    #[error("Encrypted workbook")]
    Encrypted,

    /// Readable container, unsupported content.
    #[error("Unsupported workbook format: {0}")]
    UnsupportedFormat(String),

    /// Damaged or unexpected binary structure.
    #[error("Corrupt file: {0}")]
    Corrupt(String),

    /// No header row.
    #[error("No column headers found")]
    NoHeaders,

    /// Header row only.
    #[error("No data rows found")]
    NoDataRows,

    /// A required canonical field has no source column.
    #[error("Required fields not mapped: {}", join_fields(.missing))]
    MappingIncomplete { missing: Vec<Field> },

    /// A newer file selection replaced this read.
    #[error("File read superseded by a newer selection")]
    Superseded,

    /// Commit or mapping edit without a staged import.
    #[error("No import in progress")]
    NothingStaged,
}

fn join_fields(fields: &[Field]) -> String {
    fields.iter().map(Field::key).collect::<Vec<_>>().join(", ")
}

impl ImportError {
    /// Classify a spreadsheet decoder failure by its description.
    pub fn from_decoder_message(message: String) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("encrypt") || lower.contains("password") {
            ImportError::Encrypted
        } else if lower.contains("unsupported") {
            ImportError::UnsupportedFormat(message)
        } else {
            ImportError::Corrupt(message)
        }
    }

    /// Text suitable for showing to the person who picked the file.
    pub fn user_message(&self) -> String {
        match self {
            ImportError::UnsupportedFileType(_) => {
                "Invalid file type. Please upload a CSV or XLSX file.".to_string()
            }
            ImportError::Encrypted => {
                "This file appears to be password-protected. Please provide an unprotected file."
                    .to_string()
            }
            ImportError::UnsupportedFormat(_) => {
                "This file format is not supported. Please use a standard CSV or XLSX file."
                    .to_string()
            }
            ImportError::Corrupt(_) => {
                "Error processing file structure. The file may be corrupted or in an unexpected format."
                    .to_string()
            }
            ImportError::Read(e) => format!("Error reading file: {}. Please try again.", e),
            ImportError::NoHeaders => {
                "No column headers found in file. The first row should contain column names."
                    .to_string()
            }
            ImportError::NoDataRows => {
                "No data rows found in file. The file appears to contain only headers.".to_string()
            }
            ImportError::MappingIncomplete { missing } => {
                format!("Required fields not mapped: {}", join_fields(missing))
            }
            ImportError::Superseded => "A newer file was selected; this one was ignored.".to_string(),
            ImportError::NothingStaged => "No import in progress.".to_string(),
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Reasons an export is refused.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The cue sheet has no rows.
    #[error("No data to export. Add rows first.")]
    NoData,

    /// At least one row failed validation.
    #[error("Cannot export: {} error(s) found. Correct errors before exporting.", .report.errors.len())]
    Invalid { report: ValidationReport },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Import failure.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Export refusal.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration problem.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Socket or runtime failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
