//! Query engine.
//!
//! Picks a retrieval mode, dispatches to the filter evaluator and the text,
//! vector and graph indices, merges and re-ranks, then truncates. Results
//! are bare `(id, score, reason)` triples until [`QueryEngine::hydrate`]
//! loads content for the ones the caller keeps.
//!
//! | mode         | source                              | score            |
//! |--------------|-------------------------------------|------------------|
//! | `filter`     | EQL evaluation over the snapshot    | 1.0              |
//! | `text`       | BM25 over title + tags              | raw BM25         |
//! | `vector`     | cosine of averaged word vectors     | cosine           |
//! | `hybrid`     | weighted normalized text + vector   | [0, 1]           |
//! | `activation` | text seeds + spreading activation   | [0, 1]           |

pub mod engine;
pub mod filter;
pub mod merge;
pub mod models;

pub use engine::{hydrate, QueryEngine, Summarize, SyncStats};
pub use models::{HydratedResult, MatchReason, QueryMode, QueryResult};
