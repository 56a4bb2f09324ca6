//! Keyword search.
//!
//! An in-memory BM25 inverted index over title and tag tokens, rebuilt from
//! the note snapshot. The tokenizer is shared with the vector index.

pub mod bm25;
pub mod tokenizer;

pub use bm25::TextIndex;
pub use tokenizer::tokenize;
