//! Turn a parsed table into rows using a column mapping.

use std::collections::HashMap;

use super::{normalize_header, ColumnMapping};
use crate::models::{normalize_media_type, Field, Row};
use crate::parser::ParsedTable;

/// Build one row per data line.
///
/// Every row gets a fresh id, `music` as media type and empty strings
/// elsewhere; mapped fields then take the trimmed cell of their column when
/// the line is long enough to have one.
/// Header lookup ignores case and surrounding whitespace; with duplicate
/// headers the first column wins. Media types are lowercased when they are
/// recognized and kept as-is otherwise, so validation can flag them.
pub fn apply_mapping(table: &ParsedTable, mapping: &ColumnMapping) -> Vec<Row> {
    let mut index_by_header: HashMap<String, usize> = HashMap::new();
    for (i, header) in table.headers.iter().enumerate() {
        index_by_header.entry(normalize_header(header)).or_insert(i);
    }

    let columns: Vec<(Field, usize)> = mapping
        .iter()
        .filter_map(|(field, header)| {
            index_by_header
                .get(&normalize_header(header))
                .map(|&i| (field, i))
        })
        .collect();

    table
        .rows
        .iter()
        .map(|cells| {
            let mut row = Row::new();
            for &(field, index) in &columns {
                let Some(cell) = cells.get(index) else {
                    continue;
                };
                let value = cell.trim();
                if field == Field::MediaType {
                    let normalized = normalize_media_type(value).unwrap_or(value);
                    row.set(field, normalized);
                } else {
                    row.set(field, value);
                }
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::auto_map;

    fn table(headers: &[&str], rows: &[&[&str]]) -> ParsedTable {
        ParsedTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_apply_auto_mapping() {
        let t = table(
            &["Time", "Type", "Song", "Artist", "Album", "Year"],
            &[&["00:00:00.000", " MUSIC ", " Hello ", "Adele", "25", "2015"]],
        );
        let rows = apply_mapping(&t, &auto_map(&t.headers));

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.offset, "00:00:00.000");
        assert_eq!(row.media_type, "music");
        assert_eq!(row.title, "Hello");
        assert_eq!(row.artist, "Adele");
        assert_eq!(row.album, "25");
        assert_eq!(row.year, "2015");
        assert!(!row.id.is_empty());
    }

    #[test]
    fn test_defaults_for_unmapped_fields() {
        let t = table(&["Title"], &[&["A"], &["B"]]);
        let rows = apply_mapping(&t, &auto_map(&t.headers));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].media_type, "music");
        assert_eq!(rows[0].offset, "");
        assert_eq!(rows[0].artist, "");
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[test]
    fn test_unknown_media_type_preserved() {
        let t = table(&["title", "type"], &[&["x", " Jingle "]]);
        let rows = apply_mapping(&t, &auto_map(&t.headers));
        assert_eq!(rows[0].media_type, "Jingle");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let t = table(&[" SONG "], &[&["x"]]);
        let mut mapping = ColumnMapping::default();
        mapping.set(Field::Title, Some("song".into()));
        assert_eq!(apply_mapping(&t, &mapping)[0].title, "x");
    }

    #[test]
    fn test_short_rows_and_missing_columns() {
        let t = table(&["title", "artist"], &[&["only title"]]);
        let mut mapping = auto_map(&t.headers);
        mapping.set(Field::Album, Some("does not exist".into()));

        let rows = apply_mapping(&t, &mapping);
        assert_eq!(rows[0].title, "only title");
        assert_eq!(rows[0].artist, "");
        assert_eq!(rows[0].album, "");
    }

    #[test]
    fn test_short_row_keeps_default_media_type() {
        let t = table(&["Title", "Type"], &[&["Only title"], &["Talk show", "TALK"]]);
        let rows = apply_mapping(&t, &auto_map(&t.headers));

        assert_eq!(rows[0].title, "Only title");
        assert_eq!(rows[0].media_type, "music");
        assert_eq!(rows[1].media_type, "talk");
    }

    #[test]
    fn test_duplicate_headers_first_wins() {
        let t = table(&["Title", "title"], &[&["first", "second"]]);
        let rows = apply_mapping(&t, &auto_map(&t.headers));
        assert_eq!(rows[0].title, "first");
    }
}
