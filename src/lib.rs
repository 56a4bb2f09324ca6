//! Engram Cortex
//!
//! Retrieval core for Engram knowledge bases ("cortexes"), where notes
//! ("Neuronas") are typed nodes linked by weighted, typed connections:
//! - EQL filter queries evaluated against note fields and links
//! - BM25 keyword search over titles and tags
//! - Cosine similarity over averaged word embeddings
//! - Spreading activation over a persisted graph index
//! - A query engine that picks, fuses and truncates, then hydrates lazily

pub mod activation;
pub mod config;
pub mod cortex;
pub mod eql;
pub mod error;
pub mod graph;
pub mod logging;
pub mod neurona;
pub mod query;
pub mod text;
pub mod vectors;

mod binary;

pub use config::EngramConfig;
pub use error::{EngramError, EngramResult};
pub use neurona::{Connection, ConnectionType, Neurona, NeuronaContext, NeuronaType, NoteStore};
pub use query::{MatchReason, QueryEngine, QueryMode, QueryResult};
