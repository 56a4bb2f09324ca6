//! Content hashing for document-vector invalidation
//!
//! Generates stable hashes of note content that ignore line-ending and
//! trailing-whitespace differences, so re-saving a note from another
//! editor does not trigger a vector recomputation.

use sha2::{Digest, Sha256};

/// Hash note content (normalized) as lowercase hex SHA-256.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    for line in normalize_lines(content) {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Split into lines without trailing whitespace, dropping trailing blank lines.
fn normalize_lines(content: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = content.lines().map(|l| l.trim_end()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
