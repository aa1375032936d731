//! Column mapping: foreign headers to the six canonical fields.
//!
//! [`auto_map`] proposes a mapping in two passes over [`rules::ALIAS_RULES`]:
//!
//! 1. **Exact** - the trimmed, lowercased header equals an alias.
//! 2. **Partial** - for fields still unmapped, the header contains an alias.
//!    Headers already claimed by another field are skipped.
//!
//! A header is claimed by at most one field. The proposal can be edited
//! before [`apply_mapping`] turns the table into rows.
//!
//! Two completeness levels exist: [`check_mapping_complete`] (everything the
//! export needs except year) and [`check_import_mapping_complete`] (title
//! only, the rest can be fixed in the grid).

pub mod apply;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::models::Field;

pub use apply::apply_mapping;
pub use rules::{normalize_header, AliasRule, ALIAS_RULES};

/// Fields required for an export-ready mapping.
pub const EXPORT_REQUIRED: [Field; 5] = [
    Field::Offset,
    Field::MediaType,
    Field::Title,
    Field::Artist,
    Field::Album,
];

/// Fields required before an import may be committed.
pub const IMPORT_REQUIRED: [Field; 1] = [Field::Title];

/// Source header chosen for each canonical field, or `None` when unmapped.
///
/// Values hold the original header text, not the normalized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    #[serde(default)]
    pub offset: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

impl ColumnMapping {
    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Offset => &self.offset,
            Field::MediaType => &self.media_type,
            Field::Title => &self.title,
            Field::Artist => &self.artist,
            Field::Album => &self.album,
            Field::Year => &self.year,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Offset => &mut self.offset,
            Field::MediaType => &mut self.media_type,
            Field::Title => &mut self.title,
            Field::Artist => &mut self.artist,
            Field::Album => &mut self.album,
            Field::Year => &mut self.year,
        }
    }

    /// Header mapped to `field`. An empty header string counts as unmapped.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref().filter(|h| !h.is_empty())
    }

    pub fn set(&mut self, field: Field, header: Option<String>) {
        *self.slot_mut(field) = header;
    }

    pub fn is_mapped(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Whether some field already uses this exact header text.
    pub fn claims(&self, header: &str) -> bool {
        Field::ALL.iter().any(|f| self.get(*f) == Some(header))
    }

    /// Mapped fields with their headers, in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|h| (f, h)))
    }
}

/// Outcome of a completeness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingCheck {
    pub complete: bool,
    pub missing: Vec<Field>,
}

/// Propose a mapping for the given headers.
///
/// # Example
/// ```
/// use cuesheet::mapping::auto_map;
/// use cuesheet::Field;
///
/// let headers = vec!["Start Time".to_string(), "Song".to_string()];
/// let mapping = auto_map(&headers);
/// assert_eq!(mapping.get(Field::Title), Some("Song"));
/// assert_eq!(mapping.get(Field::Offset), Some("Start Time"));
/// ```
pub fn auto_map(headers: &[String]) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut mapping = ColumnMapping::default();

    // Exact pass
    for rule in &ALIAS_RULES {
        let hit = headers
            .iter()
            .zip(&normalized)
            .find(|(original, norm)| rule.matches_exact(norm) && !mapping.claims(original));
        if let Some((original, _)) = hit {
            mapping.set(rule.field, Some(original.clone()));
        }
    }

    // Partial pass
    for rule in &ALIAS_RULES {
        if mapping.is_mapped(rule.field) {
            continue;
        }
        let hit = headers
            .iter()
            .zip(&normalized)
            .find(|(original, norm)| !mapping.claims(original) && rule.matches_partial(norm));
        if let Some((original, _)) = hit {
            mapping.set(rule.field, Some(original.clone()));
        }
    }

    mapping
}

fn check_required(mapping: &ColumnMapping, required: &[Field]) -> MappingCheck {
    let missing: Vec<Field> = required
        .iter()
        .copied()
        .filter(|f| !mapping.is_mapped(*f))
        .collect();
    MappingCheck {
        complete: missing.is_empty(),
        missing,
    }
}

/// Export-ready completeness: offset, mediaType, title, artist and album.
pub fn check_mapping_complete(mapping: &ColumnMapping) -> MappingCheck {
    check_required(mapping, &EXPORT_REQUIRED)
}

/// Import-minimum completeness: title only.
pub fn check_import_mapping_complete(mapping: &ColumnMapping) -> MappingCheck {
    check_required(mapping, &IMPORT_REQUIRED)
}
