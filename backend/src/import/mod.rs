//! Import flow: file → parsed table → staged mapping → rows in the store.
//!
//! ```text
//! begin_read(name) ──▶ ReadTicket ──▶ read_table(bytes) ──▶ finish_read(ticket, table)
//!                                                                 │
//!                              set_mapping(..) ◀── StagedImport ◀─┘
//!                                    │
//!                               commit(store) ──▶ rows replaced, report returned
//! ```
//!
//! Reading is the only asynchronous step. Each `begin_read` bumps a
//! generation counter; `finish_read` rejects a ticket from an older
//! generation with [`ImportError::Superseded`], so a slow read can never
//! overwrite the staging of a newer file selection.

use serde::Serialize;
use std::path::Path;

use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::error::{ImportError, ImportResult};
use crate::mapping::{
    apply_mapping, auto_map, check_import_mapping_complete, check_mapping_complete, ColumnMapping,
    MappingCheck,
};
use crate::parser::{self, read_xlsx_bytes, ParsedTable};
use crate::store::RowStore;
use crate::validation::{validate_all_rows, ValidationReport};

// =============================================================================
// File kinds
// =============================================================================

/// Accepted import formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Xlsx,
}

impl FileKind {
    /// Detect the format from a file name (extension, any case).
    pub fn detect(file_name: &str) -> ImportResult<Self> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileKind::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(FileKind::Xlsx)
        } else {
            Err(ImportError::UnsupportedFileType(file_name.to_string()))
        }
    }
}

/// Decode raw file bytes into a table.
pub fn read_table(kind: FileKind, bytes: &[u8]) -> ImportResult<ParsedTable> {
    match kind {
        FileKind::Csv => {
            let result = parser::parse_bytes(bytes);
            log_success(format!("Detected encoding: {}", result.encoding));
            Ok(result.table)
        }
        FileKind::Xlsx => read_xlsx_bytes(bytes),
    }
}

/// Read and decode a file from disk.
pub async fn read_file(path: &Path) -> ImportResult<ParsedTable> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let kind = FileKind::detect(&name)?;
    let bytes = tokio::fs::read(path).await?;
    read_table(kind, &bytes)
}

/// Reject tables the mapping step cannot work with.
pub fn check_table(table: &ParsedTable) -> ImportResult<()> {
    if table.headers.is_empty() {
        return Err(ImportError::NoHeaders);
    }
    if table.rows.is_empty() {
        return Err(ImportError::NoDataRows);
    }
    Ok(())
}

// =============================================================================
// Session
// =============================================================================

/// Proof that a read was started; hand it back to [`ImportSession::finish_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTicket {
    generation: u64,
    pub file_name: String,
    pub kind: FileKind,
}

/// A parsed file waiting for the user to confirm its mapping.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedImport {
    pub file_name: String,
    pub kind: FileKind,
    pub table: ParsedTable,
    pub mapping: ColumnMapping,
}

impl StagedImport {
    /// Completeness for a clean export.
    pub fn export_check(&self) -> MappingCheck {
        check_mapping_complete(&self.mapping)
    }

    /// Completeness required to commit.
    pub fn import_check(&self) -> MappingCheck {
        check_import_mapping_complete(&self.mapping)
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub imported: usize,
    /// Validation of the rows now in the store.
    pub report: ValidationReport,
}

/// Staging area between reading a file and committing it.
#[derive(Debug, Default)]
pub struct ImportSession {
    generation: u64,
    staged: Option<StagedImport>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a read for a newly selected file.
    ///
    /// Unsupported extensions are rejected here, before any bytes are read,
    /// and leave the session untouched. Otherwise any staged import is
    /// discarded and earlier tickets become stale.
    pub fn begin_read(&mut self, file_name: &str) -> ImportResult<ReadTicket> {
        let kind = FileKind::detect(file_name).map_err(|e| {
            log_error(e.user_message());
            e
        })?;

        self.generation += 1;
        self.staged = None;
        log_info(format!("Reading {}...", file_name));

        Ok(ReadTicket {
            generation: self.generation,
            file_name: file_name.to_string(),
            kind,
        })
    }

    /// Complete a read and stage its table with an automatic mapping.
    pub fn finish_read(
        &mut self,
        ticket: ReadTicket,
        result: ImportResult<ParsedTable>,
    ) -> ImportResult<&StagedImport> {
        if ticket.generation != self.generation {
            log_warning(format!("Ignoring stale read of {}", ticket.file_name));
            return Err(ImportError::Superseded);
        }

        let table = result
            .and_then(|table| check_table(&table).map(|_| table))
            .map_err(|e| {
                log_error(e.user_message());
                e
            })?;

        log_success(format!(
            "Found {} columns, {} data rows",
            table.headers.len(),
            table.rows.len()
        ));

        let mapping = auto_map(&table.headers);
        for (field, header) in mapping.iter() {
            log_info_indent(format!("{} ← {}", field, header), 1);
        }
        let check = check_mapping_complete(&mapping);
        if !check.complete {
            let missing: Vec<&str> = check.missing.iter().map(|f| f.key()).collect();
            log_warning(format!("Not mapped automatically: {}", missing.join(", ")));
        }

        Ok(self.staged.insert(StagedImport {
            file_name: ticket.file_name,
            kind: ticket.kind,
            table,
            mapping,
        }))
    }

    /// Read bytes that are already in memory in one step.
    pub fn load_bytes(&mut self, file_name: &str, bytes: &[u8]) -> ImportResult<&StagedImport> {
        let ticket = self.begin_read(file_name)?;
        let result = read_table(ticket.kind, bytes);
        self.finish_read(ticket, result)
    }

    /// Read a file from disk in one step.
    pub async fn load_file(&mut self, path: &Path) -> ImportResult<&StagedImport> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let ticket = self.begin_read(&name)?;
        let result = match tokio::fs::read(path).await {
            Ok(bytes) => read_table(ticket.kind, &bytes),
            Err(e) => Err(e.into()),
        };
        self.finish_read(ticket, result)
    }

    pub fn staged(&self) -> Option<&StagedImport> {
        self.staged.as_ref()
    }

    /// Replace the staged mapping with a user-edited one.
    pub fn set_mapping(&mut self, mapping: ColumnMapping) -> ImportResult<&StagedImport> {
        let staged = self.staged.as_mut().ok_or(ImportError::NothingStaged)?;
        staged.mapping = mapping;
        Ok(staged)
    }

    /// Drop the staged import. Returns `false` when nothing was staged.
    pub fn cancel(&mut self) -> bool {
        self.staged.take().is_some()
    }

    /// Apply the staged mapping and replace the store's rows.
    ///
    /// Only the title must be mapped; the returned report lists everything
    /// that still blocks export. On a mapping error the import stays staged.
    pub fn commit(&mut self, store: &mut RowStore) -> ImportResult<CommitSummary> {
        let staged = self.staged.as_ref().ok_or(ImportError::NothingStaged)?;

        let check = staged.import_check();
        if !check.complete {
            let err = ImportError::MappingIncomplete {
                missing: check.missing,
            };
            log_error(err.user_message());
            return Err(err);
        }

        let rows = apply_mapping(&staged.table, &staged.mapping);
        let imported = rows.len();
        self.staged = None;

        store.import_rows(rows);
        let report = validate_all_rows(store.rows());

        log_success(format!("Imported {} rows", imported));
        if !report.valid {
            log_warning(format!(
                "{} error(s) in {} row(s) must be corrected before export",
                report.errors.len(),
                report.invalid_rows()
            ));
        }

        Ok(CommitSummary { imported, report })
    }
}
