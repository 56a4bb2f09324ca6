//! Graph index.
//!
//! Persisted adjacency over Neurona connections, so a query can look up a
//! node's typed, weighted edges without re-reading every note.
//!
//! ## Architecture
//!
//! ```text
//! NoteStore snapshot ──► GraphIndex::from_neuronas ──► petgraph::DiGraph + id map
//!                                                          │
//!                                       save ──► graph.idx ──► load
//!                                                          │
//!                                   outgoing / incoming / trace ──► activation, query
//! ```
//!
//! ## Modules
//!
//! - [`models`]: `GraphIndex`, edge views and build records
//! - [`persistence`]: little-endian binary layout with validating loader
//! - [`traversal`]: breadth-first dependency trace

pub mod models;
pub mod persistence;
pub mod traversal;

pub use models::{Edge, EdgeRecord, GraphEdge, GraphIndex, GraphNode};
pub use persistence::{GRAPH_MAGIC, GRAPH_VERSION};
pub use traversal::TraceStep;
