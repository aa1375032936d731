//! Spreadsheet adapter: first worksheet of an `.xlsx` file into a [`ParsedTable`].
//!
//! Spreadsheets store time-of-day as a fraction of a 24-hour day. Columns
//! where most sampled values look like such fractions are converted to
//! `HH:MM:SS.mmm` offsets so they can be mapped like any CSV column.

use std::collections::BTreeSet;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use super::ParsedTable;
use crate::error::{ImportError, ImportResult};
use crate::offset::{self, MS_PER_DAY};

/// Number of leading data rows inspected per column.
pub const TIME_SAMPLE_ROWS: usize = 10;

/// Share of non-empty sampled values that must be day fractions.
pub const TIME_COLUMN_THRESHOLD: f64 = 0.8;

const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// A raw spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl SheetCell {
    /// Empty cells and empty strings carry no value.
    pub fn is_empty(&self) -> bool {
        match self {
            SheetCell::Empty => true,
            SheetCell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Stringified cell value, untrimmed.
    pub fn to_text(&self) -> String {
        match self {
            SheetCell::Empty => String::new(),
            SheetCell::Number(n) => n.to_string(),
            SheetCell::Text(s) => s.clone(),
            SheetCell::Bool(b) => b.to_string(),
        }
    }

    /// The value as a fraction of a day, if it is a number in `[0, 1)`.
    pub fn as_day_fraction(&self) -> Option<f64> {
        match self {
            SheetCell::Number(n) if (0.0..1.0).contains(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&Data> for SheetCell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => SheetCell::Empty,
            Data::Int(n) => SheetCell::Number(*n as f64),
            Data::Float(n) => SheetCell::Number(*n),
            Data::String(s) => SheetCell::Text(s.clone()),
            Data::Bool(b) => SheetCell::Bool(*b),
            // Serial number, so time-formatted cells are detected as fractions
            Data::DateTime(dt) => SheetCell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => SheetCell::Text(s.clone()),
            Data::Error(e) => SheetCell::Text(e.to_string()),
        }
    }
}

/// Convert a day fraction into an offset string.
///
/// Milliseconds are rounded; a rounded value of 1000 carries into the seconds.
pub fn day_fraction_to_offset(fraction: f64) -> String {
    let total_ms = (fraction * MS_PER_DAY as f64).round().max(0.0) as u64;
    offset::format(total_ms)
}

/// Columns whose sampled non-empty values are mostly day fractions.
pub fn detect_time_columns(rows: &[Vec<SheetCell>], width: usize) -> BTreeSet<usize> {
    let sample = &rows[..rows.len().min(TIME_SAMPLE_ROWS)];

    (0..width)
        .filter(|&col| {
            let values: Vec<&SheetCell> = sample
                .iter()
                .filter_map(|row| row.get(col))
                .filter(|cell| !cell.is_empty())
                .collect();
            if values.is_empty() {
                return false;
            }
            let fractions = values.iter().filter(|c| c.as_day_fraction().is_some()).count();
            fractions as f64 / values.len() as f64 >= TIME_COLUMN_THRESHOLD
        })
        .collect()
}

fn placeholder_header(index: usize) -> String {
    format!("Column {}", index + 1)
}

fn mentions_time(header: &str) -> bool {
    let lower = header.to_lowercase();
    ["time", "offset", "duration"].iter().any(|w| lower.contains(w))
}

/// Build a table from a grid of spreadsheet cells.
///
/// The first row supplies headers (blank ones become `Column N`); fully
/// empty data rows are dropped; time columns are converted to offsets.
pub fn table_from_cells(cells: Vec<Vec<SheetCell>>) -> ParsedTable {
    let mut grid = cells.into_iter();
    let header_cells = match grid.next() {
        Some(h) => h,
        None => return ParsedTable::default(),
    };

    let mut headers: Vec<String> = header_cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let text = cell.to_text().trim().to_string();
            if text.is_empty() {
                placeholder_header(i)
            } else {
                text
            }
        })
        .collect();

    let data: Vec<Vec<SheetCell>> = grid
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    let time_columns = detect_time_columns(&data, headers.len());

    let rows = data
        .iter()
        .map(|row| {
            (0..headers.len())
                .map(|i| {
                    let cell = row.get(i).unwrap_or(&SheetCell::Empty);
                    match cell.as_day_fraction() {
                        Some(f) if time_columns.contains(&i) => day_fraction_to_offset(f),
                        _ => cell.to_text().trim().to_string(),
                    }
                })
                .collect()
        })
        .collect();

    for &col in &time_columns {
        let header = &headers[col];
        if !mentions_time(header) && header.starts_with("Column ") {
            headers[col] = format!("Time (Column {})", col + 1);
        }
    }

    ParsedTable { headers, rows }
}

/// Whether a compound-file container holds an encrypted OOXML package.
fn is_encrypted_package(bytes: &[u8]) -> bool {
    let marker: Vec<u8> = "EncryptedPackage"
        .encode_utf16()
        .flat_map(|u| u.to_le_bytes())
        .collect();
    bytes.windows(marker.len()).any(|w| w == marker.as_slice())
}

/// Read the first worksheet of an `.xlsx` workbook held in memory.
pub fn read_xlsx_bytes(bytes: &[u8]) -> ImportResult<ParsedTable> {
    if bytes.starts_with(&CFB_MAGIC) {
        return Err(if is_encrypted_package(bytes) {
            ImportError::Encrypted
        } else {
            ImportError::UnsupportedFormat("legacy binary workbook".to_string())
        });
    }

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ImportError::from_decoder_message(e.to_string()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| ImportError::from_decoder_message(e.to_string()))?,
        None => return Ok(ParsedTable::default()),
    };

    let cells = range
        .rows()
        .map(|row| row.iter().map(SheetCell::from).collect())
        .collect();

    Ok(table_from_cells(cells))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> SheetCell {
        SheetCell::Text(s.to_string())
    }

    fn num(n: f64) -> SheetCell {
        SheetCell::Number(n)
    }

    #[test]
    fn test_day_fraction_to_offset() {
        assert_eq!(day_fraction_to_offset(0.0), "00:00:00.000");
        assert_eq!(day_fraction_to_offset(0.5), "12:00:00.000");
        // 00:03:45 = 225 s
        assert_eq!(day_fraction_to_offset(225.0 / 86_400.0), "00:03:45.000");
        assert_eq!(day_fraction_to_offset(1.5 / 86_400.0), "00:00:01.500");
    }

    #[test]
    fn test_day_fraction_rounding_carries() {
        // 59.9996 seconds rounds up to a full minute
        assert_eq!(day_fraction_to_offset(59.9996 / 86_400.0), "00:01:00.000");
    }

    #[test]
    fn test_time_column_detected_and_converted() {
        let cells = vec![
            vec![text("Start"), text("Title")],
            vec![num(0.0), text("Intro")],
            vec![num(225.0 / 86_400.0), text("Song")],
        ];
        let table = table_from_cells(cells);

        assert_eq!(table.headers, vec!["Start", "Title"]);
        assert_eq!(table.rows[0], vec!["00:00:00.000", "Intro"]);
        assert_eq!(table.rows[1], vec!["00:03:45.000", "Song"]);
    }

    #[test]
    fn test_threshold_requires_eighty_percent() {
        // 4 of 5 non-empty values are fractions: exactly 80%
        let mut rows = vec![vec![num(0.1)], vec![num(0.2)], vec![num(0.3)], vec![num(0.4)]];
        rows.push(vec![text("n/a")]);
        assert!(detect_time_columns(&rows, 1).contains(&0));

        // 3 of 5: not a time column
        rows[0] = vec![num(12.0)];
        assert!(detect_time_columns(&rows, 1).is_empty());
    }

    #[test]
    fn test_detection_samples_first_ten_rows_only() {
        let mut rows: Vec<Vec<SheetCell>> = (0..10).map(|_| vec![num(0.25)]).collect();
        rows.extend((0..20).map(|_| vec![text("late")]));
        assert!(detect_time_columns(&rows, 1).contains(&0));
    }

    #[test]
    fn test_empty_cells_ignored_in_detection() {
        let rows = vec![vec![SheetCell::Empty], vec![num(0.5)], vec![text("")]];
        assert!(detect_time_columns(&rows, 1).contains(&0));

        let all_empty = vec![vec![SheetCell::Empty]];
        assert!(detect_time_columns(&all_empty, 1).is_empty());
    }

    #[test]
    fn test_placeholder_headers_and_relabel() {
        let cells = vec![
            vec![SheetCell::Empty, text(""), text("Title")],
            vec![num(0.5), text("x"), text("A")],
        ];
        let table = table_from_cells(cells);

        assert_eq!(table.headers, vec!["Time (Column 1)", "Column 2", "Title"]);
        assert_eq!(table.rows[0][0], "12:00:00.000");
    }

    #[test]
    fn test_named_time_header_not_relabelled() {
        let cells = vec![vec![text("Air time")], vec![num(0.5)]];
        let table = table_from_cells(cells);
        assert_eq!(table.headers, vec!["Air time"]);
    }

    #[test]
    fn test_empty_rows_dropped_and_cells_stringified() {
        let cells = vec![
            vec![text("Title"), text("Year")],
            vec![SheetCell::Empty, text("")],
            vec![text("  Song  "), num(2020.0)],
            vec![text("Live"), SheetCell::Bool(true)],
        ];
        let table = table_from_cells(cells);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["Song", "2020"]);
        assert_eq!(table.rows[1], vec!["Live", "true"]);
    }

    #[test]
    fn test_short_rows_padded_to_header_width() {
        let cells = vec![vec![text("a"), text("b"), text("c")], vec![text("1")]];
        let table = table_from_cells(cells);
        assert_eq!(table.rows[0], vec!["1", "", ""]);
    }

    #[test]
    fn test_out_of_range_numbers_in_time_column_stringified() {
        let rows: Vec<Vec<SheetCell>> = vec![
            vec![text("Time")],
            vec![num(0.1)],
            vec![num(0.2)],
            vec![num(0.3)],
            vec![num(0.4)],
            vec![num(1.5)],
        ];
        let table = table_from_cells(rows);
        assert_eq!(table.rows[4][0], "1.5");
    }

    #[test]
    fn test_empty_grid() {
        assert_eq!(table_from_cells(Vec::new()), ParsedTable::default());
    }

    #[test]
    fn test_garbage_bytes_are_corrupt() {
        let err = read_xlsx_bytes(b"definitely not a zip archive").unwrap_err();
        assert!(matches!(err, ImportError::Corrupt(_)));
    }

    #[test]
    fn test_encrypted_container_detected() {
        let mut bytes = CFB_MAGIC.to_vec();
        bytes.extend(vec![0u8; 64]);
        bytes.extend("EncryptedPackage".encode_utf16().flat_map(|u| u.to_le_bytes()));
        assert!(matches!(read_xlsx_bytes(&bytes), Err(ImportError::Encrypted)));

        let legacy = CFB_MAGIC.to_vec();
        assert!(matches!(
            read_xlsx_bytes(&legacy),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }
}
