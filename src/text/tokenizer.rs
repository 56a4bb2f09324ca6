//! Tokenization shared by the text and vector indices.

/// Split text into lowercase alphanumeric tokens.
///
/// Any non-alphanumeric character separates tokens; single-character
/// tokens are dropped unless they are digits.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .filter(|t| t.chars().count() > 1 || t.chars().all(|c| c.is_ascii_digit()))
        .map(|t| t.to_lowercase())
        .collect()
}
