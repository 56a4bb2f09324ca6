//! Cortex discovery.

pub mod discover;

pub use discover::{find_cortex, DirectoryProbe, FsProbe, CORTEX_MARKER};
