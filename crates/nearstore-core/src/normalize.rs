use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical form of an address used as a geocoder query and cache key.
///
/// Strips diacritics (NFD, then drops combining marks), removes `.` and `,`,
/// and collapses whitespace. Applying it twice yields the same string.
#[must_use]
pub fn normalize_address(raw: &str) -> String {
    let stripped: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| *c != '.' && *c != ',')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
