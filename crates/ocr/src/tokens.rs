/// Split a line into non-empty whitespace-separated tokens, in order.
pub fn tokenize(line: &str) -> Vec<String> {
    line.replace('\t', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Strip leading/trailing punctuation so `"pcs."` and `"EUR:"` compare as words.
pub(crate) fn bare_word(token: &str) -> &str {
    token.trim_matches(|c: char| c.is_ascii_punctuation() && c != '$')
}
