//! Offset codec: `HH:MM:SS.mmm` strings <-> integer milliseconds.
//!
//! Hours are two digits with no semantic upper bound; minutes and seconds are
//! range-checked only by [`is_valid_format`].

use once_cell::sync::Lazy;
use regex::Regex;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Milliseconds in a 24-hour day.
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

// ASCII classes on purpose: `\d` would accept any Unicode digit.
static OFFSET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2})\.([0-9]{3})$").expect("valid offset pattern")
});

/// Split an offset into its four numeric components, shape-checked only.
fn components(text: &str) -> Option<[u64; 4]> {
    let caps = OFFSET_PATTERN.captures(text)?;
    let mut parts = [0u64; 4];
    for (i, part) in parts.iter_mut().enumerate() {
        *part = caps.get(i + 1)?.as_str().parse().ok()?;
    }
    Some(parts)
}

/// Parse an offset into milliseconds.
///
/// Returns `None` for anything that is not exactly `DD:DD:DD.DDD`.
///
/// # Example
/// ```
/// assert_eq!(cuesheet::offset::parse("01:23:45.678"), Some(5_025_678));
/// assert_eq!(cuesheet::offset::parse("00:00:00"), None);
/// ```
pub fn parse(text: &str) -> Option<u64> {
    let [h, m, s, ms] = components(text)?;
    Some(h * MS_PER_HOUR + m * MS_PER_MINUTE + s * MS_PER_SECOND + ms)
}

/// Whether the text is a well-formed offset with minutes and seconds below 60.
pub fn is_valid_format(text: &str) -> bool {
    matches!(components(text), Some([_, m, s, _]) if m < 60 && s < 60)
}

/// Whether the text has the offset shape, regardless of component ranges.
pub fn has_offset_shape(text: &str) -> bool {
    OFFSET_PATTERN.is_match(text)
}

/// Format milliseconds as `HH:MM:SS.mmm`.
///
/// Hours are zero-padded to at least two digits and never wrap.
pub fn format(ms: u64) -> String {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;
    build(hours, minutes, seconds, millis)
}

/// Assemble an offset from already-clamped components. No validation.
pub fn build(hours: u64, minutes: u64, seconds: u64, millis: u64) -> String {
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Sort key used by export: unparseable offsets count as zero.
pub fn sort_key(text: &str) -> u64 {
    parse(text).unwrap_or(0)
}

/// One editable component of an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeComponent {
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimeComponent {
    /// Inclusive upper bound for the component.
    pub fn max(&self) -> u64 {
        match self {
            Self::Hours => 99,
            Self::Minutes | Self::Seconds => 59,
            Self::Milliseconds => 999,
        }
    }
}
