//! Neurona data model
//!
//! Neuronas are typed knowledge nodes with a typed context union and
//! weighted outgoing connections. This module also defines the note-store
//! and summarizer collaborator traits and the content hash used to decide
//! when a document vector is stale.

pub mod context;
pub mod hashing;
pub mod models;
pub mod store;

pub use context::{FieldValue, NeuronaContext};
pub use hashing::hash_content;
pub use models::{
    effective_weight, Connection, ConnectionType, Neurona, NeuronaType, DEFAULT_CONNECTION_WEIGHT,
};
pub use store::{ContentSummarizer, MemoryNoteStore, NoteStore};
