//! Binary persistence for the graph index.
//!
//! File format (all integers little-endian):
//!
//! ```text
//! magic "ENGRAM_GRAPH" (12) | version u8 | node_count u32 | edge_count u32
//! node table: node_count × { id_len u16 | id bytes }
//! edge table: edge_count × { source u32 | type u8 | weight u8 | target_len u16 | target bytes }
//! ```
//!
//! `source` is a position in the node table. `weight` 0 means unweighted.
//! Targets are stored by id so dangling references survive a round trip.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::binary::{
    bounded_capacity, len_u32, read_index_file, write_atomic, write_u16, write_u32, ByteReader,
};
use crate::error::{EngramError, EngramResult};
use crate::neurona::ConnectionType;

use super::models::{EdgeRecord, GraphIndex};

pub const GRAPH_MAGIC: &[u8; 12] = b"ENGRAM_GRAPH";
pub const GRAPH_VERSION: u8 = 1;

const HEADER_LEN: usize = 12 + 1 + 4 + 4;
const MIN_NODE_RECORD: usize = 2 + 1;
const MIN_EDGE_RECORD: usize = 4 + 1 + 1 + 2 + 1;
const REBUILD_HINT: &str = "rebuild the graph index from the note store (sync)";

impl GraphIndex {
    /// Serialize to the binary layout.
    pub fn to_bytes(&self) -> EngramResult<Vec<u8>> {
        let node_ids: Vec<&str> = self.node_ids().collect();
        let positions: HashMap<&str, u32> = node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as u32))
            .collect();
        let edges = self.edges();

        let mut out = Vec::with_capacity(HEADER_LEN + node_ids.len() * 16 + edges.len() * 24);
        out.extend_from_slice(GRAPH_MAGIC);
        out.push(GRAPH_VERSION);
        write_u32(&mut out, len_u32(node_ids.len(), "node count")?)?;
        write_u32(&mut out, len_u32(edges.len(), "edge count")?)?;

        for id in &node_ids {
            write_u16(&mut out, id_len(id)?)?;
            out.extend_from_slice(id.as_bytes());
        }

        for edge in &edges {
            let source = positions.get(edge.source_id).copied().ok_or_else(|| {
                EngramError::corrupt(format!("edge source '{}' is not indexed", edge.source_id))
            })?;
            write_u32(&mut out, source)?;
            out.push(edge.connection_type.code());
            out.push(edge.weight);
            write_u16(&mut out, id_len(edge.target_id)?)?;
            out.extend_from_slice(edge.target_id.as_bytes());
        }

        Ok(out)
    }

    /// Decode the binary layout, validating every count and length.
    pub fn from_bytes(data: &[u8], path: &Path) -> EngramResult<Self> {
        if data.len() < GRAPH_MAGIC.len() || &data[..GRAPH_MAGIC.len()] != GRAPH_MAGIC {
            return Err(EngramError::Format {
                path: path.to_path_buf(),
                reason: "bad magic (expected ENGRAM_GRAPH)".to_string(),
            });
        }
        let mut r = ByteReader::new(data);
        r.bytes(GRAPH_MAGIC.len(), "magic")?;

        let version = r.u8("version")?;
        if version != GRAPH_VERSION {
            return Err(EngramError::Format {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported version {} (expected {})",
                    version, GRAPH_VERSION
                ),
            });
        }

        let node_count = r.u32("node count")? as usize;
        let edge_count = r.u32("edge count")? as usize;
        let minimum = node_count
            .saturating_mul(MIN_NODE_RECORD)
            .saturating_add(edge_count.saturating_mul(MIN_EDGE_RECORD));
        if minimum > r.remaining() {
            return Err(EngramError::corrupt(format!(
                "counts ({} nodes, {} edges) exceed payload of {} bytes",
                node_count,
                edge_count,
                r.remaining()
            )));
        }

        let mut nodes = Vec::with_capacity(bounded_capacity(
            node_count,
            r.remaining(),
            MIN_NODE_RECORD,
        ));
        let mut seen = std::collections::HashSet::with_capacity(nodes.capacity());
        for _ in 0..node_count {
            let len = r.u16("node id length")? as usize;
            if len == 0 {
                return Err(EngramError::corrupt(format!(
                    "empty node id at offset {}",
                    r.position()
                )));
            }
            let id = r.string(len, "node id")?;
            if !seen.insert(id.clone()) {
                return Err(EngramError::corrupt(format!("duplicate node id '{}'", id)));
            }
            nodes.push(id);
        }

        let mut edges = Vec::with_capacity(bounded_capacity(
            edge_count,
            r.remaining(),
            MIN_EDGE_RECORD,
        ));
        for _ in 0..edge_count {
            let source = r.u32("edge source")? as usize;
            let code = r.u8("edge type")?;
            let weight = r.u8("edge weight")?;
            let target_len = r.u16("edge target length")? as usize;
            let target = r.string(target_len, "edge target")?;

            let source_id = nodes.get(source).ok_or_else(|| {
                EngramError::corrupt(format!(
                    "edge source index {} out of range ({} nodes)",
                    source, node_count
                ))
            })?;
            let connection_type = ConnectionType::from_code(code).ok_or_else(|| {
                EngramError::corrupt(format!("unknown connection type code {}", code))
            })?;
            if weight > 100 {
                return Err(EngramError::corrupt(format!(
                    "edge weight {} outside [0, 100]",
                    weight
                )));
            }
            if target.is_empty() {
                return Err(EngramError::corrupt("empty edge target"));
            }
            edges.push(EdgeRecord::new(
                source_id.clone(),
                target,
                connection_type,
                weight,
            ));
        }
        r.finish("edge table")?;

        GraphIndex::build(nodes, edges)
    }

    /// Persist to `path` via temp file + rename.
    pub fn save(&self, path: &Path) -> EngramResult<()> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)?;
        info!(
            path = %path.display(),
            nodes = self.node_count(),
            edges = self.edge_count(),
            bytes = bytes.len(),
            "Saved graph index"
        );
        Ok(())
    }

    /// Load from `path`. Any inconsistency is an error; nothing is partially loaded.
    pub fn load(path: &Path) -> EngramResult<Self> {
        let data = read_index_file(path, REBUILD_HINT)?;
        let index = Self::from_bytes(&data, path)?;
        debug!(
            path = %path.display(),
            nodes = index.node_count(),
            edges = index.edge_count(),
            "Loaded graph index"
        );
        Ok(index)
    }
}

fn id_len(id: &str) -> EngramResult<u16> {
    u16::try_from(id.len())
        .map_err(|_| {
            let head: String = id.chars().take(32).collect();
            EngramError::corrupt(format!("id longer than 65535 bytes: {}...", head))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphIndex {
        GraphIndex::build(
            ["req.1", "test.1", "issue.1"],
            [
                EdgeRecord::new("req.1", "test.1", ConnectionType::ValidatedBy, 90),
                EdgeRecord::new("test.1", "req.1", ConnectionType::Validates, 0),
                EdgeRecord::new("issue.1", "req.9", ConnectionType::BlockedBy, 30),
            ],
        )
        .unwrap()
    }

    fn edge_set(g: &GraphIndex) -> Vec<(String, String, ConnectionType, u8)> {
        g.edges()
            .iter()
            .map(|e| {
                (
                    e.source_id.to_string(),
                    e.target_id.to_string(),
                    e.connection_type,
                    e.weight,
                )
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_preserves_nodes_edges_and_weights() {
        let g = sample();
        let bytes = g.to_bytes().unwrap();
        let back = GraphIndex::from_bytes(&bytes, Path::new("mem")).unwrap();

        let nodes: Vec<&str> = back.node_ids().collect();
        assert_eq!(nodes, vec!["req.1", "test.1", "issue.1"]);
        assert_eq!(edge_set(&back), edge_set(&g));
        assert!(back.outgoing("issue.1", None)[0].dangling);
    }

    #[test]
    fn test_header_is_little_endian() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(&bytes[..12], b"ENGRAM_GRAPH");
        assert_eq!(bytes[12], GRAPH_VERSION);
        assert_eq!(&bytes[13..17], &3u32.to_le_bytes());
        assert_eq!(&bytes[17..21], &3u32.to_le_bytes());
    }

    #[test]
    fn test_bad_magic_is_format_error() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = b'X';
        let err = GraphIndex::from_bytes(&bytes, Path::new("mem")).unwrap_err();
        assert!(matches!(err, EngramError::Format { .. }));
    }

    #[test]
    fn test_bad_version_is_format_error() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[12] = 9;
        let err = GraphIndex::from_bytes(&bytes, Path::new("mem")).unwrap_err();
        assert!(matches!(err, EngramError::Format { .. }));
    }

    #[test]
    fn test_truncation_is_corrupt() {
        let bytes = sample().to_bytes().unwrap();
        for cut in [HEADER_LEN - 1, HEADER_LEN + 3, bytes.len() - 1] {
            let err = GraphIndex::from_bytes(&bytes[..cut], Path::new("mem")).unwrap_err();
            assert!(
                matches!(err, EngramError::IndexCorrupt { .. }),
                "cut at {} gave {:?}",
                cut,
                err
            );
        }
    }

    #[test]
    fn test_inflated_count_is_corrupt() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[13..17].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = GraphIndex::from_bytes(&bytes, Path::new("mem")).unwrap_err();
        assert!(matches!(err, EngramError::IndexCorrupt { .. }));
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.push(0);
        let err = GraphIndex::from_bytes(&bytes, Path::new("mem")).unwrap_err();
        assert!(matches!(err, EngramError::IndexCorrupt { .. }));
    }

    #[test]
    fn test_missing_file_is_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = GraphIndex::load(&dir.path().join("graph.idx")).unwrap_err();
        assert!(matches!(err, EngramError::MissingIndex { .. }));
        assert!(err.requires_rebuild());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".engram").join("graph.idx");
        let g = sample();
        g.save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let back = GraphIndex::load(&path).unwrap();
        assert_eq!(back.node_count(), 3);
        assert_eq!(edge_set(&back), edge_set(&g));
    }
}
