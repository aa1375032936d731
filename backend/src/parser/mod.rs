//! Tabular input parsing: CSV text and spreadsheet cells into a [`ParsedTable`].
//!
//! The CSV tokenizer is a single-pass RFC 4180-style scanner (comma
//! delimiter, double-quote quoting, `""` escapes, quoted newlines). Raw file
//! bytes go through encoding detection first so that Latin-1 and
//! Windows-1252 exports from older playout systems decode correctly.

pub mod xlsx;

use serde::{Deserialize, Serialize};

pub use xlsx::{read_xlsx_bytes, table_from_cells, SheetCell};

/// Headers plus raw string rows, as read from an import file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTable {
    /// First line of the file, untouched.
    pub headers: Vec<String>,
    /// Remaining non-blank lines.
    pub rows: Vec<Vec<String>>,
}

/// Result of decoding and parsing raw CSV bytes.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: ParsedTable,
    /// Detected or used encoding
    pub encoding: String,
}

/// Tokenize CSV text into lines of cells.
///
/// Line endings are normalized to `\n` first. Quoted fields may contain
/// commas, doubled quotes and newlines. A final line without a trailing
/// newline is still emitted.
pub fn parse_lines(text: &str) -> Vec<Vec<String>> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut current)),
            '\n' => {
                fields.push(std::mem::take(&mut current));
                lines.push(std::mem::take(&mut fields));
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        lines.push(fields);
    }

    lines
}

/// Parse CSV text into headers and data rows.
///
/// Empty or whitespace-only input yields an empty table. Data lines whose
/// cells are all blank are dropped.
///
/// # Example
/// ```
/// let table = cuesheet::parser::parse("name,desc\n\"John Doe\",\"Hello, World\"");
/// assert_eq!(table.headers, vec!["name", "desc"]);
/// assert_eq!(table.rows[0], vec!["John Doe", "Hello, World"]);
/// ```
pub fn parse(text: &str) -> ParsedTable {
    if text.trim().is_empty() {
        return ParsedTable::default();
    }

    let mut lines = parse_lines(text).into_iter();
    let headers = match lines.next() {
        Some(h) => h,
        None => return ParsedTable::default(),
    };

    let rows = lines
        .filter(|cells| cells.iter().any(|cell| !cell.trim().is_empty()))
        .collect();

    ParsedTable { headers, rows }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "utf-8".to_string();
    }
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the given encoding label.
///
/// Never fails: unknown labels and invalid sequences fall back to lossy
/// UTF-8. A leading byte-order mark is removed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let codec = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => encoding_rs::UTF_8,
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252,
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252,
        other => encoding_rs::Encoding::for_label(other.as_bytes()).unwrap_or(encoding_rs::UTF_8),
    };
    codec.decode(bytes).0.into_owned()
}

/// Decode CSV bytes with encoding detection and parse them.
pub fn parse_bytes(bytes: &[u8]) -> ParseResult {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    ParseResult {
        table: parse(&content),
        encoding,
    }
}
