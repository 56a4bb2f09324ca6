//! Semantic similarity over averaged word embeddings.
//!
//! # Layout
//!
//! - [`index`]: in-memory word and document vectors, cosine search
//! - [`import`]: streaming GloVe-style import with progress callbacks
//! - [`persistence`]: `ENGRAM_VEC` binary file, with a document section
//!   that can be rewritten without touching the word section
//! - [`store`]: index + path + [`PersistenceStrategy`]

pub mod import;
pub mod index;
pub mod persistence;
pub mod store;

pub use import::{ImportProgress, ImportStats, PROGRESS_INTERVAL};
pub use index::{DocVector, VectorIndex};
pub use persistence::{VECTOR_MAGIC, VECTOR_VERSION};
pub use store::{EnsureOutcome, PersistenceStrategy, VectorStore};
