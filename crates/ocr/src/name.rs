use crate::lines::collapse_whitespace;

/// Deduplication key for an item name: lowercase ASCII letters, digits and single
/// spaces only. Never shown to users.
pub fn normalize(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();
    collapse_whitespace(&kept)
}

/// Display form: whitespace collapsed, case and punctuation kept.
pub fn prettify(name: &str) -> String {
    collapse_whitespace(name)
}

/// Join the tokens not flagged in `excluded`.
pub(crate) fn join_remaining(tokens: &[String], excluded: &[bool]) -> String {
    tokens
        .iter()
        .zip(excluded)
        .filter(|(_, skip)| !**skip)
        .map(|(t, _)| t.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
