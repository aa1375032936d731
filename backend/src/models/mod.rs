//! Domain models for the cue sheet pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Row`] - One timed segment of a cue sheet
//! - [`MediaType`] - Closed category of a segment (music, talk, id, promo, ad)
//! - [`Field`] - The six canonical fields of the export format
//! - [`RowDraft`] / [`RowPatch`] - Inputs for creating and editing rows

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length (in characters) of the free-text fields.
pub const MAX_FIELD_LENGTH: usize = 500;

/// Generate a fresh, opaque row identifier.
pub fn new_row_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Media Type
// =============================================================================

/// Category of a cue sheet segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Song or instrumental.
    #[default]
    Music,
    /// Spoken segment.
    Talk,
    /// Station identification.
    Id,
    /// Station or show promotion.
    Promo,
    /// Advertisement.
    Ad,
}

impl MediaType {
    /// All media types in canonical order.
    pub const ALL: [MediaType; 5] = [
        MediaType::Music,
        MediaType::Talk,
        MediaType::Id,
        MediaType::Promo,
        MediaType::Ad,
    ];

    /// Parse a media type, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "music" => Some(Self::Music),
            "talk" => Some(Self::Talk),
            "id" => Some(Self::Id),
            "promo" => Some(Self::Promo),
            "ad" => Some(Self::Ad),
            _ => None,
        }
    }

    /// Lowercase wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Music => "music",
            Self::Talk => "talk",
            Self::Id => "id",
            Self::Promo => "promo",
            Self::Ad => "ad",
        }
    }

    /// Whether rows of this type must name an artist.
    pub fn requires_artist(&self) -> bool {
        matches!(self, Self::Music | Self::Talk)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw media type into its canonical lowercase form.
///
/// Returns `None` for empty or unrecognized values.
pub fn normalize_media_type(value: &str) -> Option<&'static str> {
    MediaType::parse(value).map(|t| t.as_str())
}

// =============================================================================
// Canonical Fields
// =============================================================================

/// One of the six canonical columns of the export format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Offset,
    MediaType,
    Title,
    Artist,
    Album,
    Year,
}

impl Field {
    /// All fields in export column order.
    pub const ALL: [Field; 6] = [
        Field::Offset,
        Field::MediaType,
        Field::Title,
        Field::Artist,
        Field::Album,
        Field::Year,
    ];

    /// Key used in JSON payloads and error reports.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Offset => "offset",
            Self::MediaType => "mediaType",
            Self::Title => "title",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Year => "year",
        }
    }

    /// Column name in the exported CSV header.
    pub fn csv_column(&self) -> &'static str {
        match self {
            Self::Offset => "offset",
            Self::MediaType => "media_type",
            Self::Title => "title",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Year => "year",
        }
    }

    /// Human-readable label used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Offset => "Offset",
            Self::MediaType => "Media type",
            Self::Title => "Title",
            Self::Artist => "Artist",
            Self::Album => "Album",
            Self::Year => "Year",
        }
    }

    /// Parse a field key (`mediaType`) or CSV column name (`media_type`).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.key() == key || f.csv_column() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// Row
// =============================================================================

/// A single cue sheet entry.
///
/// `media_type` is kept as text so that unrecognized values survive an
/// import and can be corrected by the user; validation flags them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Opaque identifier, stable for the row's lifetime.
    pub id: String,
    /// `HH:MM:SS.mmm` offset from the start of the broadcast.
    #[serde(default)]
    pub offset: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Optional 4-digit year.
    #[serde(default)]
    pub year: String,
}

impl Row {
    /// Create an empty row with a fresh id and the default media type.
    pub fn new() -> Self {
        Self::with_media_type(MediaType::Music)
    }

    /// Create an empty row with a fresh id and the given media type.
    pub fn with_media_type(media_type: MediaType) -> Self {
        Self {
            id: new_row_id(),
            offset: String::new(),
            media_type: media_type.as_str().to_string(),
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            year: String::new(),
        }
    }

    /// Read a canonical field.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Offset => &self.offset,
            Field::MediaType => &self.media_type,
            Field::Title => &self.title,
            Field::Artist => &self.artist,
            Field::Album => &self.album,
            Field::Year => &self.year,
        }
    }

    /// Overwrite a canonical field.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Offset => self.offset = value,
            Field::MediaType => self.media_type = value,
            Field::Title => self.title = value,
            Field::Artist => self.artist = value,
            Field::Album => self.album = value,
            Field::Year => self.year = value,
        }
    }
}

impl Default for Row {
    fn default() -> Self {
        Self::new()
    }
}

/// Field values for a row that does not exist yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDraft {
    #[serde(default)]
    pub offset: String,
    /// Empty means "use the store's default for this operation".
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub year: String,
}

impl RowDraft {
    /// Materialize into a row with a fresh id.
    pub fn into_row(self, default_type: MediaType) -> Row {
        let media_type = if self.media_type.is_empty() {
            default_type.as_str().to_string()
        } else {
            self.media_type
        };
        Row {
            id: new_row_id(),
            offset: self.offset,
            media_type,
            title: self.title,
            artist: self.artist,
            album: self.album,
            year: self.year,
        }
    }
}

/// Partial update of a row: only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl RowPatch {
    /// Patch that sets a single field.
    pub fn field(field: Field, value: impl Into<String>) -> Self {
        let mut patch = Self::default();
        let value = Some(value.into());
        match field {
            Field::Offset => patch.offset = value,
            Field::MediaType => patch.media_type = value,
            Field::Title => patch.title = value,
            Field::Artist => patch.artist = value,
            Field::Album => patch.album = value,
            Field::Year => patch.year = value,
        }
        patch
    }

    /// Apply the patch in place.
    pub fn apply_to(self, row: &mut Row) {
        let updates = [
            (Field::Offset, self.offset),
            (Field::MediaType, self.media_type),
            (Field::Title, self.title),
            (Field::Artist, self.artist),
            (Field::Album, self.album),
            (Field::Year, self.year),
        ];
        for (field, value) in updates {
            if let Some(value) = value {
                row.set(field, value);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parse_is_case_insensitive() {
        assert_eq!(MediaType::parse("MUSIC"), Some(MediaType::Music));
        assert_eq!(MediaType::parse("  Promo "), Some(MediaType::Promo));
        assert_eq!(MediaType::parse("song"), None);
        assert_eq!(MediaType::parse(""), None);
    }

    #[test]
    fn test_normalize_media_type() {
        assert_eq!(normalize_media_type("Talk"), Some("talk"));
        assert_eq!(normalize_media_type("jingle"), None);
    }

    #[test]
    fn test_requires_artist() {
        assert!(MediaType::Music.requires_artist());
        assert!(MediaType::Talk.requires_artist());
        assert!(!MediaType::Ad.requires_artist());
        assert!(!MediaType::Id.requires_artist());
    }

    #[test]
    fn test_field_keys() {
        assert_eq!(Field::MediaType.key(), "mediaType");
        assert_eq!(Field::MediaType.csv_column(), "media_type");
        assert_eq!(Field::from_key("media_type"), Some(Field::MediaType));
        assert_eq!(Field::from_key("mediaType"), Some(Field::MediaType));
        assert_eq!(Field::from_key("genre"), None);
    }

    #[test]
    fn test_row_ids_are_unique() {
        let a = Row::new();
        let b = Row::new();
        assert_ne!(a.id, b.id);
        assert_eq!(a.media_type, "music");
    }

    #[test]
    fn test_draft_default_media_type() {
        let row = RowDraft::default().into_row(MediaType::Talk);
        assert_eq!(row.media_type, "talk");

        let row = RowDraft {
            media_type: "ad".into(),
            ..Default::default()
        }
        .into_row(MediaType::Talk);
        assert_eq!(row.media_type, "ad");
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut row = Row::new();
        row.title = "Old".into();
        row.artist = "Someone".into();

        RowPatch::field(Field::Title, "New").apply_to(&mut row);

        assert_eq!(row.title, "New");
        assert_eq!(row.artist, "Someone");
    }

    #[test]
    fn test_row_serialization_uses_camel_case() {
        let mut row = Row::new();
        row.media_type = "promo".into();
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["mediaType"], "promo");
    }
}
