//! Ordered alias rules for header matching.
//!
//! Order matters twice: fields are tried top to bottom, and within a pass
//! the first header (in file order) that matches any alias wins.

use crate::models::Field;

/// One field's aliases for both passes.
#[derive(Debug, Clone, Copy)]
pub struct AliasRule {
    pub field: Field,
    /// Whole-header matches (normalized header equals alias).
    pub exact: &'static [&'static str],
    /// Substring matches, used only when no exact match exists.
    pub partial: &'static [&'static str],
}

/// Alias rules in matching order.
pub const ALIAS_RULES: [AliasRule; 6] = [
    AliasRule {
        field: Field::Offset,
        exact: &[
            "offset",
            "time",
            "timestamp",
            "start",
            "start_time",
            "timecode",
            "position",
            "duration",
            "length",
        ],
        partial: &["time", "offset", "duration"],
    },
    AliasRule {
        field: Field::MediaType,
        exact: &[
            "media_type",
            "mediatype",
            "type",
            "category",
            "kind",
            "content_type",
            "media",
        ],
        partial: &["type", "media", "category"],
    },
    AliasRule {
        field: Field::Title,
        exact: &[
            "title",
            "song",
            "track",
            "song_title",
            "track_title",
            "name",
            "track_name",
            "song_name",
        ],
        partial: &["title", "song", "track", "name"],
    },
    AliasRule {
        field: Field::Artist,
        exact: &[
            "artist",
            "performer",
            "band",
            "singer",
            "by",
            "artist_name",
            "contributing artist",
            "contributing_artist",
        ],
        partial: &["artist", "performer", "singer"],
    },
    AliasRule {
        field: Field::Album,
        exact: &["album", "album_title", "record", "release", "album_name", "cd"],
        partial: &["album", "record", "release"],
    },
    AliasRule {
        field: Field::Year,
        exact: &["year", "release_year", "date", "released", "release_date", "yr"],
        partial: &["year", "date"],
    },
];

/// Header text as compared against aliases.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

impl AliasRule {
    pub fn matches_exact(&self, normalized: &str) -> bool {
        self.exact.contains(&normalized)
    }

    pub fn matches_partial(&self, normalized: &str) -> bool {
        self.partial.iter().any(|alias| normalized.contains(alias))
    }
}
