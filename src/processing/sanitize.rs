//! Helpers for normalizing client-supplied filenames.

const FALLBACK_FILENAME: &str = "upload";

/// Reduce an arbitrary client filename to a safe single path component.
///
/// Path separators become spaces, characters outside ASCII alphanumerics and `_ . -` are
/// dropped, whitespace runs collapse to `_`, and leading or trailing `.`/`_` are stripped. A
/// name that sanitizes to nothing falls back to `upload`.
pub fn secure_filename(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return FALLBACK_FILENAME.to_string();
    };

    let spaced: String = raw
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { ' ' } else { ch })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
        .collect();
    let trimmed = filtered.trim_matches(|ch| ch == '.' || ch == '_');

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}
