//! Canonical formatting for multi-value text properties.

/// Delimiter the CRM uses for multi-value properties.
pub const CANONICAL_DELIMITER: char = ';';

/// Normalize a free-form associates list to `a;b;c`.
///
/// Semicolons take priority over commas as the input delimiter; a string
/// with neither is a single entry. Entries are trimmed and blank entries
/// dropped. Returns `None` for blank input or when nothing survives.
pub fn normalize_associates(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let delimiter = if raw.contains(';') {
        ';'
    } else if raw.contains(',') {
        ','
    } else {
        return Some(raw.to_string());
    };

    let joined = raw
        .split(delimiter)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(&CANONICAL_DELIMITER.to_string());

    (!joined.is_empty()).then_some(joined)
}
