//! Row validation rules for the cue sheet export format.
//!
//! Every rule runs independently, so a single row can report several
//! problems at once. Errors are returned as data; nothing here fails.
//!
//! # Rules
//!
//! | Field     | Requirement                                                  |
//! |-----------|--------------------------------------------------------------|
//! | offset    | required, `HH:MM:SS.mmm`, MM/SS < 60, unique across rows     |
//! | mediaType | required, one of music, talk, id, promo, ad (any case)       |
//! | title     | required, at most 500 characters                             |
//! | artist    | required for music/talk, otherwise length-checked only       |
//! | album     | optional, at most 500 characters                             |
//! | year      | optional, 4 digits within 1900..=2100                        |
//!
//! # Example
//!
//! ```rust
//! use cuesheet::{validate_all_rows, Row};
//!
//! let mut row = Row::new();
//! row.offset = "00:03:45.000".into();
//! row.title = "X".into();
//! row.artist = "Y".into();
//!
//! let report = validate_all_rows(&[row]);
//! assert!(report.valid);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Field, MediaType, Row, MAX_FIELD_LENGTH};
use crate::offset::{self, TimeComponent};

/// Lowest accepted year.
pub const MIN_YEAR: u32 = 1900;
/// Highest accepted year.
pub const MAX_YEAR: u32 = 2100;

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}$").expect("valid year pattern"));

// =============================================================================
// Error data
// =============================================================================

/// Category of a validation problem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Value does not match the expected pattern or vocabulary.
    Format,
    /// Numeric value out of bounds.
    Range,
    /// Required value missing.
    Required,
    /// Offset already used by another row.
    Duplicate,
    /// Free text too long.
    Length,
}

/// A problem with one field of one row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: Field,
    pub kind: ErrorKind,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

/// A field error tagged with the row it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_id: String,
    /// 1-based position of the row in the collection.
    pub row_num: usize,
    pub field: Field,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of validating a whole collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<RowError>,
}

impl ValidationReport {
    /// Number of distinct rows with at least one error.
    pub fn invalid_rows(&self) -> usize {
        let mut ids: Vec<&str> = self.errors.iter().map(|e| e.row_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Position of another row that already uses an offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateOffset {
    pub row_id: String,
    pub row_num: usize,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn too_long(value: &str) -> bool {
    value.chars().count() > MAX_FIELD_LENGTH
}

fn length_error(field: Field) -> FieldError {
    FieldError::new(
        field,
        ErrorKind::Length,
        format!("{} must be {} characters or less", field.label(), MAX_FIELD_LENGTH),
    )
}

// =============================================================================
// Field rules
// =============================================================================

/// Validate the offset of the row `row_id`, including duplicates in `all_rows`.
pub fn validate_offset(offset: &str, row_id: &str, all_rows: &[Row]) -> Vec<FieldError> {
    if is_blank(offset) {
        return vec![FieldError::new(Field::Offset, ErrorKind::Required, "Offset is required")];
    }

    if !offset::has_offset_shape(offset) {
        return vec![FieldError::new(
            Field::Offset,
            ErrorKind::Format,
            "Offset must be in HH:MM:SS.mmm format (e.g., 00:03:45.000)",
        )];
    }

    if !offset::is_valid_format(offset) {
        return vec![FieldError::new(
            Field::Offset,
            ErrorKind::Range,
            "Offset minutes and seconds must be between 00 and 59",
        )];
    }

    match find_duplicate_offset(offset, row_id, all_rows) {
        Some(dup) => vec![FieldError::new(
            Field::Offset,
            ErrorKind::Duplicate,
            format!("Offset {} is already used in row {}", offset, dup.row_num),
        )],
        None => Vec::new(),
    }
}

/// Find the first row other than `exclude_id` whose offset text equals `offset`.
pub fn find_duplicate_offset(offset: &str, exclude_id: &str, all_rows: &[Row]) -> Option<DuplicateOffset> {
    all_rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.id != exclude_id && row.offset == offset)
        .map(|(i, row)| DuplicateOffset {
            row_id: row.id.clone(),
            row_num: i + 1,
        })
}

/// Validate a media type value.
pub fn validate_media_type(media_type: &str) -> Vec<FieldError> {
    if is_blank(media_type) {
        return vec![FieldError::new(
            Field::MediaType,
            ErrorKind::Required,
            "Media type is required",
        )];
    }

    if MediaType::parse(media_type).is_none() {
        let allowed: Vec<&str> = MediaType::ALL.iter().map(MediaType::as_str).collect();
        return vec![FieldError::new(
            Field::MediaType,
            ErrorKind::Format,
            format!("Media type must be one of: {}", allowed.join(", ")),
        )];
    }

    Vec::new()
}

/// Validate a text field that must be present.
pub fn validate_required_field(value: &str, field: Field) -> Vec<FieldError> {
    if is_blank(value) {
        return vec![FieldError::new(
            field,
            ErrorKind::Required,
            format!("{} is required", field.label()),
        )];
    }
    if too_long(value) {
        return vec![length_error(field)];
    }
    Vec::new()
}

/// Validate a text field that may be empty.
pub fn validate_optional_field(value: &str, field: Field) -> Vec<FieldError> {
    if !is_blank(value) && too_long(value) {
        return vec![length_error(field)];
    }
    Vec::new()
}

/// Validate an optional year.
pub fn validate_year(year: &str) -> Vec<FieldError> {
    if is_blank(year) {
        return Vec::new();
    }

    if !YEAR_PATTERN.is_match(year) {
        return vec![FieldError::new(
            Field::Year,
            ErrorKind::Format,
            "Year must be a 4-digit number",
        )];
    }

    match year.parse::<u32>() {
        Ok(n) if (MIN_YEAR..=MAX_YEAR).contains(&n) => Vec::new(),
        _ => vec![FieldError::new(
            Field::Year,
            ErrorKind::Range,
            format!("Year must be between {} and {}", MIN_YEAR, MAX_YEAR),
        )],
    }
}

// =============================================================================
// Row rules
// =============================================================================

/// Validate one row against the full collection.
pub fn validate_row(row: &Row, all_rows: &[Row]) -> Vec<FieldError> {
    let mut errors = Vec::new();

    errors.extend(validate_offset(&row.offset, &row.id, all_rows));
    errors.extend(validate_media_type(&row.media_type));
    errors.extend(validate_required_field(&row.title, Field::Title));

    let artist_required = MediaType::parse(&row.media_type).is_some_and(|t| t.requires_artist());
    if artist_required {
        errors.extend(validate_required_field(&row.artist, Field::Artist));
    } else {
        errors.extend(validate_optional_field(&row.artist, Field::Artist));
    }

    errors.extend(validate_optional_field(&row.album, Field::Album));
    errors.extend(validate_year(&row.year));

    errors
}

/// Validate every row; the collection is exportable iff the report is valid.
pub fn validate_all_rows(rows: &[Row]) -> ValidationReport {
    let errors: Vec<RowError> = rows
        .iter()
        .enumerate()
        .flat_map(|(i, row)| {
            validate_row(row, rows).into_iter().map(move |e| RowError {
                row_id: row.id.clone(),
                row_num: i + 1,
                field: e.field,
                kind: e.kind,
                message: e.message,
            })
        })
        .collect();

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// Whether a row has at least one error.
pub fn has_errors(row: &Row, all_rows: &[Row]) -> bool {
    !validate_row(row, all_rows).is_empty()
}

/// First error message per field, for inline display next to cells.
pub fn get_field_errors(row: &Row, all_rows: &[Row]) -> BTreeMap<Field, String> {
    let mut by_field = BTreeMap::new();
    for error in validate_row(row, all_rows) {
        by_field.entry(error.field).or_insert(error.message);
    }
    by_field
}

/// Clamp a time component into its allowed range.
pub fn clamp_time_component(value: i64, component: TimeComponent) -> u64 {
    value.clamp(0, component.max() as i64) as u64
}

/// Parse user input for a time component leniently and clamp it.
///
/// Reads an optional sign and the leading digits; anything else is ignored.
/// No digits gives 0, and digit runs too long for `i64` saturate.
pub fn parse_time_component(text: &str, component: TimeComponent) -> u64 {
    let trimmed = text.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];

    if digits.is_empty() || negative {
        return 0;
    }
    // Only overflow can fail here
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    clamp_time_component(value, component)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, offset: &str) -> Row {
        Row {
            id: id.into(),
            offset: offset.into(),
            media_type: "music".into(),
            title: "Song".into(),
            artist: "Artist".into(),
            album: "Album".into(),
            year: String::new(),
        }
    }

    fn kinds(errors: &[FieldError]) -> Vec<(Field, ErrorKind)> {
        errors.iter().map(|e| (e.field, e.kind)).collect()
    }

    #[test]
    fn test_valid_full_row() {
        let r = Row {
            id: "1".into(),
            offset: "00:03:45.000".into(),
            media_type: "music".into(),
            title: "X".into(),
            artist: "Y".into(),
            album: "Z".into(),
            year: "2020".into(),
        };
        assert!(validate_row(&r, std::slice::from_ref(&r)).is_empty());
    }

    #[test]
    fn test_empty_row_reports_every_required_field() {
        let mut r = row("2", "");
        r.media_type = String::new();
        r.title = String::new();
        r.artist = String::new();
        r.album = String::new();

        let errors = validate_row(&r, &[]);
        assert_eq!(
            kinds(&errors),
            vec![
                (Field::Offset, ErrorKind::Required),
                (Field::MediaType, ErrorKind::Required),
                (Field::Title, ErrorKind::Required),
            ]
        );
    }

    #[test]
    fn test_missing_artist_for_music_and_talk() {
        for media_type in ["music", "TALK"] {
            let mut r = row("1", "00:00:00.000");
            r.media_type = media_type.into();
            r.artist = "  ".into();
            let errors = validate_row(&r, &[]);
            assert_eq!(kinds(&errors), vec![(Field::Artist, ErrorKind::Required)]);
        }
    }

    #[test]
    fn test_artist_optional_for_other_types() {
        for media_type in ["id", "promo", "ad"] {
            let mut r = row("1", "00:00:00.000");
            r.media_type = media_type.into();
            r.artist = String::new();
            assert!(validate_row(&r, &[]).is_empty(), "{media_type}");
        }
    }

    #[test]
    fn test_artist_length_checked_when_optional() {
        let mut r = row("1", "00:00:00.000");
        r.media_type = "ad".into();
        r.artist = "a".repeat(501);
        assert_eq!(kinds(&validate_row(&r, &[])), vec![(Field::Artist, ErrorKind::Length)]);
    }

    #[test]
    fn test_offset_errors() {
        assert_eq!(validate_offset("", "1", &[])[0].kind, ErrorKind::Required);
        assert_eq!(validate_offset("1:00", "1", &[])[0].kind, ErrorKind::Format);
        assert_eq!(validate_offset("00:61:00.000", "1", &[])[0].kind, ErrorKind::Range);
        assert!(validate_offset("00:59:59.999", "1", &[]).is_empty());
    }

    #[test]
    fn test_find_duplicate_offset() {
        let rows = vec![row("1", "00:00:00.000"), row("2", "00:01:00.000")];
        assert_eq!(find_duplicate_offset("00:00:00.000", "1", &rows), None);
        assert_eq!(
            find_duplicate_offset("00:00:00.000", "3", &rows),
            Some(DuplicateOffset {
                row_id: "1".into(),
                row_num: 1
            })
        );
        assert_eq!(find_duplicate_offset("00:02:00.000", "3", &rows), None);
    }

    #[test]
    fn test_duplicate_pair_reports_one_error_per_row() {
        let rows = vec![row("a", "00:00:00.000"), row("b", "00:00:00.000")];
        let report = validate_all_rows(&rows);

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.kind == ErrorKind::Duplicate));

        assert_eq!(report.errors[0].row_id, "a");
        assert_eq!(report.errors[0].row_num, 1);
        assert!(report.errors[0].message.ends_with("row 2"));

        assert_eq!(report.errors[1].row_id, "b");
        assert_eq!(report.errors[1].row_num, 2);
        assert!(report.errors[1].message.ends_with("row 1"));
    }

    #[test]
    fn test_media_type_case_insensitive() {
        assert!(validate_media_type("MUSIC").is_empty());
        for t in ["music", "talk", "id", "promo", "ad"] {
            assert!(validate_media_type(t).is_empty());
        }
        assert_eq!(validate_media_type("song")[0].kind, ErrorKind::Format);
        assert_eq!(validate_media_type("")[0].kind, ErrorKind::Required);
    }

    #[test]
    fn test_year_rules() {
        assert!(validate_year("").is_empty());
        assert!(validate_year("2024").is_empty());
        assert!(validate_year("1900").is_empty());
        assert!(validate_year("2100").is_empty());
        assert_eq!(validate_year("1899")[0].kind, ErrorKind::Range);
        assert_eq!(validate_year("2101")[0].kind, ErrorKind::Range);
        assert_eq!(validate_year("202")[0].kind, ErrorKind::Format);
        assert_eq!(validate_year("20245")[0].kind, ErrorKind::Format);
        assert_eq!(validate_year("abcd")[0].kind, ErrorKind::Format);
    }

    #[test]
    fn test_required_field_whitespace() {
        assert!(!validate_required_field("", Field::Title).is_empty());
        assert!(!validate_required_field("   ", Field::Title).is_empty());
        assert!(validate_required_field("Hello", Field::Title).is_empty());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let accented = "é".repeat(500);
        assert!(validate_required_field(&accented, Field::Title).is_empty());
        let too_long = "é".repeat(501);
        assert_eq!(validate_required_field(&too_long, Field::Title)[0].kind, ErrorKind::Length);
    }

    #[test]
    fn test_validate_all_rows_tags_positions() {
        let mut bad = row("x", "00:00:01.000");
        bad.year = "1800".into();
        let rows = vec![row("ok", "00:00:00.000"), bad];

        let report = validate_all_rows(&rows);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row_id, "x");
        assert_eq!(report.errors[0].row_num, 2);
        assert_eq!(report.errors[0].field, Field::Year);
        assert_eq!(report.invalid_rows(), 1);
    }

    #[test]
    fn test_get_field_errors_keeps_first_message() {
        let mut r = row("1", "bad");
        r.title = String::new();
        let errors = get_field_errors(&r, &[]);
        assert_eq!(errors.len(), 2);
        assert!(errors[&Field::Offset].contains("HH:MM:SS.mmm"));
        assert_eq!(errors[&Field::Title], "Title is required");
        assert!(has_errors(&r, &[]));
    }

    #[test]
    fn test_clamp_time_component() {
        assert_eq!(clamp_time_component(150, TimeComponent::Hours), 99);
        assert_eq!(clamp_time_component(-5, TimeComponent::Minutes), 0);
        assert_eq!(clamp_time_component(75, TimeComponent::Seconds), 59);
        assert_eq!(clamp_time_component(1500, TimeComponent::Milliseconds), 999);
        assert_eq!(clamp_time_component(42, TimeComponent::Minutes), 42);
    }

    #[test]
    fn test_parse_time_component() {
        assert_eq!(parse_time_component("12", TimeComponent::Minutes), 12);
        assert_eq!(parse_time_component("abc", TimeComponent::Minutes), 0);
        assert_eq!(parse_time_component("75x", TimeComponent::Seconds), 59);
        assert_eq!(parse_time_component("-3", TimeComponent::Hours), 0);
        assert_eq!(parse_time_component("", TimeComponent::Milliseconds), 0);
    }

    #[test]
    fn test_parse_time_component_sign_and_overflow() {
        assert_eq!(parse_time_component("+5", TimeComponent::Minutes), 5);
        assert_eq!(parse_time_component(" +42s", TimeComponent::Seconds), 42);
        assert_eq!(parse_time_component("+", TimeComponent::Hours), 0);
        assert_eq!(
            parse_time_component("99999999999999999999999", TimeComponent::Milliseconds),
            999
        );
        assert_eq!(
            parse_time_component("-99999999999999999999999", TimeComponent::Minutes),
            0
        );
    }
}
