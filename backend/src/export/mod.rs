//! CSV export for the broadcast automation format.
//!
//! Output is byte-exact:
//!
//! - header `offset,media_type,title,artist,album,year`
//! - rows sorted by ascending offset (unparseable offsets sort as zero)
//! - media type lowercased, title/artist/album quoted when needed
//! - CRLF between lines, no trailing line break, no byte-order mark
//!
//! # Example
//!
//! ```rust
//! use cuesheet::export::serialize;
//! use cuesheet::Row;
//!
//! let mut row = Row::new();
//! row.offset = "00:00:05.000".into();
//! row.title = "Hello, World".into();
//!
//! let csv = serialize(&[row]);
//! assert_eq!(
//!     csv,
//!     "offset,media_type,title,artist,album,year\r\n00:00:05.000,music,\"Hello, World\",,,"
//! );
//! ```

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::api::logs::{log_success, log_warning};
use crate::error::{ExportError, ExportResult};
use crate::models::{Field, Row};
use crate::offset;
use crate::store::RowStore;
use crate::validation::validate_all_rows;

/// Fixed header line of the export format.
pub const HEADER: &str = "offset,media_type,title,artist,album,year";

/// Line separator required by the consumer.
pub const LINE_ENDING: &str = "\r\n";

/// File name used when the session has none.
pub const FALLBACK_NAME: &str = "cue-sheet";

static INVALID_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid filename pattern"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid pattern"));

// =============================================================================
// Serialization
// =============================================================================

/// Quote a value when it contains a comma, a double quote or a line break.
///
/// Embedded quotes are doubled. Not idempotent: escaping an escaped value
/// quotes it again.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn serialize_row(row: &Row) -> String {
    [
        row.offset.clone(),
        row.media_type.to_lowercase(),
        escape_field(row.get(Field::Title)),
        escape_field(row.get(Field::Artist)),
        escape_field(row.get(Field::Album)),
        row.year.clone(),
    ]
    .join(",")
}

/// Serialize rows into the export format.
///
/// Sorting is stable and works on a copy; offsets and years are written
/// as stored, without re-validation.
pub fn serialize(rows: &[Row]) -> String {
    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort_by_key(|row| offset::sort_key(&row.offset));

    std::iter::once(HEADER.to_string())
        .chain(sorted.into_iter().map(serialize_row))
        .collect::<Vec<_>>()
        .join(LINE_ENDING)
}

// =============================================================================
// File names
// =============================================================================

/// Make a session name safe for use as a file name.
///
/// Reserved characters become `-`, whitespace runs become a single `-`,
/// and dash runs collapse.
pub fn sanitize_filename(name: &str) -> String {
    let name = INVALID_FILENAME_CHARS.replace_all(name, "-");
    let name = WHITESPACE_RUN.replace_all(&name, "-");
    let name = DASH_RUN.replace_all(&name, "-");
    name.trim().to_string()
}

/// Append `.csv` unless the name already ends with it (any case).
pub fn ensure_csv_extension(name: &str) -> String {
    if name.to_lowercase().ends_with(".csv") {
        name.to_string()
    } else {
        format!("{name}.csv")
    }
}

/// Final download name for a session name, with fallback for empty names.
pub fn export_filename(session_name: &str) -> String {
    let name = if session_name.is_empty() {
        FALLBACK_NAME
    } else {
        session_name
    };
    ensure_csv_extension(&sanitize_filename(name))
}

/// Suggested name for a new session: `<prefix>-YYYY-MM-DD` (local date).
pub fn default_session_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Local::now().format("%Y-%m-%d"))
}

// =============================================================================
// Export
// =============================================================================

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub filename: String,
    pub content: String,
    pub row_count: usize,
}

/// Export the store, or refuse.
///
/// An empty store is refused before validation runs. Any validation error
/// refuses the export with the full report. On success the store is
/// marked saved.
pub fn export_csv(store: &mut RowStore) -> ExportResult<ExportedFile> {
    if !store.has_rows() {
        log_warning("No data to export");
        return Err(ExportError::NoData);
    }

    let report = validate_all_rows(store.rows());
    if !report.valid {
        log_warning(format!(
            "Export blocked: {} error(s) in {} row(s)",
            report.errors.len(),
            report.invalid_rows()
        ));
        return Err(ExportError::Invalid { report });
    }

    let file = ExportedFile {
        filename: export_filename(store.file_name()),
        content: serialize(store.rows()),
        row_count: store.row_count(),
    };
    store.mark_saved();

    log_success(format!("Exported {} rows to {}", file.row_count, file.filename));
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RowDraft;
    use crate::parser;

    fn row(offset: &str, media_type: &str, title: &str) -> Row {
        let mut row = Row::new();
        row.offset = offset.into();
        row.media_type = media_type.into();
        row.title = title.into();
        row
    }

    fn full_row(offset: &str) -> RowDraft {
        RowDraft {
            offset: offset.into(),
            media_type: "music".into(),
            title: "X".into(),
            artist: "Y".into(),
            album: "Z".into(),
            year: "2020".into(),
        }
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field(""), "");
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field("cr\ronly"), "\"cr\ronly\"");
    }

    #[test]
    fn test_escape_field_not_idempotent() {
        let once = escape_field("a,\"b\"");
        let twice = escape_field(&once);
        assert_ne!(once, twice);
        assert_eq!(twice, "\"\"\"a,\"\"\"\"b\"\"\"\"\"\"\"");

        // Values that need no quoting are stable.
        assert_eq!(escape_field(&escape_field("plain")), "plain");
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize(&[]), HEADER);
    }

    #[test]
    fn test_serialize_sorts_by_offset() {
        let rows = vec![
            row("00:10:00.000", "talk", "third"),
            row("00:00:05.000", "MUSIC", "second"),
            row("garbage", "ad", "first"),
        ];
        let csv = serialize(&rows);
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "garbage,ad,first,,,");
        assert_eq!(lines[2], "00:00:05.000,music,second,,,");
        assert_eq!(lines[3], "00:10:00.000,talk,third,,,");
        assert!(!csv.ends_with("\r\n"));
        assert!(!csv.starts_with('\u{feff}'));

        // Input order untouched.
        assert_eq!(rows[0].title, "third");
    }

    #[test]
    fn test_sort_is_stable() {
        let rows = vec![row("", "music", "a"), row("bad", "music", "b"), row("", "music", "c")];
        let csv = serialize(&rows);
        let titles: Vec<&str> = csv
            .split("\r\n")
            .skip(1)
            .map(|l| l.split(',').nth(2).unwrap_or(""))
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_output_readable_by_csv_crate() {
        let mut tricky = row("00:00:01.000", "music", "Hello, \"World\"");
        tricky.artist = "Line\nBreak".into();
        tricky.album = "Plain".into();
        tricky.year = "1999".into();

        let csv = serialize(&[tricky.clone()]);
        let mut reader = csv::ReaderBuilder::new().from_reader(csv.as_bytes());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADER.split(',').collect::<Vec<_>>());

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[2], tricky.title);
        assert_eq!(&record[3], tricky.artist);
        assert_eq!(&record[5], "1999");
    }

    #[test]
    fn test_round_trip_through_parser() {
        let mut a = row("00:01:00.000", "Talk", "Intro, part 1");
        a.artist = "Host \"DJ\" Name".into();
        let mut b = row("00:00:00.000", "music", "Opening");
        b.album = "Multi\r\nline".into();

        let table = parser::parse(&serialize(&[a.clone(), b.clone()]));

        assert_eq!(table.headers, HEADER.split(',').collect::<Vec<_>>());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], "Opening");
        // Quoted CRLF comes back as LF after line-ending normalization.
        assert_eq!(table.rows[0][4], "Multi\nline");
        assert_eq!(table.rows[1][1], "talk");
        assert_eq!(table.rows[1][2], a.title);
        assert_eq!(table.rows[1][3], a.artist);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Show"), "My-Show");
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j"), "a-b-c-d-e-f-g-h-i-j");
        assert_eq!(sanitize_filename("a -- b"), "a-b");
        assert_eq!(sanitize_filename("tab\tand\nnewline"), "tab-and-newline");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn test_ensure_csv_extension() {
        assert_eq!(ensure_csv_extension("show"), "show.csv");
        assert_eq!(ensure_csv_extension("show.csv"), "show.csv");
        assert_eq!(ensure_csv_extension("SHOW.CSV"), "SHOW.CSV");
        assert_eq!(ensure_csv_extension("show.txt"), "show.txt.csv");
    }

    #[test]
    fn test_export_filename_fallback() {
        assert_eq!(export_filename(""), "cue-sheet.csv");
        assert_eq!(export_filename("Late Night"), "Late-Night.csv");
    }

    #[test]
    fn test_default_session_name_shape() {
        let name = default_session_name("cue-sheet");
        let re = Regex::new(r"^cue-sheet-[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap();
        assert!(re.is_match(&name), "{name}");
    }

    #[test]
    fn test_export_refuses_empty_store() {
        let mut store = RowStore::new();
        assert!(matches!(export_csv(&mut store), Err(ExportError::NoData)));
    }

    #[test]
    fn test_export_refuses_invalid_rows() {
        let mut store = RowStore::new();
        store.add_row(full_row("00:00:00.000"));
        store.add_row(full_row("00:00:00.000"));

        match export_csv(&mut store) {
            Err(ExportError::Invalid { report }) => {
                assert!(!report.valid);
                assert_eq!(report.errors.len(), 2);
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn test_export_success_marks_saved() {
        let mut store = RowStore::new();
        store.set_file_name("Drive Time");
        store.add_row(full_row("00:03:45.000"));
        store.add_row(full_row("00:00:00.000"));

        let file = export_csv(&mut store).unwrap();

        assert_eq!(file.filename, "Drive-Time.csv");
        assert_eq!(file.row_count, 2);
        assert_eq!(
            file.content,
            "offset,media_type,title,artist,album,year\r\n\
             00:00:00.000,music,X,Y,Z,2020\r\n\
             00:03:45.000,music,X,Y,Z,2020"
        );
        assert!(!store.has_unsaved_changes());
    }
}
