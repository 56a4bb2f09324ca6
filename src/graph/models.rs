//! Graph index data models.
//!
//! - [`GraphNode`] / [`GraphEdge`]: node and edge weights stored in petgraph
//! - [`EdgeRecord`]: owned edge description used to build an index
//! - [`Edge`]: borrowed view returned by traversal queries
//! - [`GraphIndex`]: petgraph wrapper with id ↔ NodeIndex mapping
//!
//! The connection graph is cyclic, so nodes are addressed by id through an
//! arena (`DiGraph`) plus a lookup map rather than by references.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngramError, EngramResult};
use crate::neurona::{effective_weight, ConnectionType, Neurona};

// ============================================================================
// Node / edge weights
// ============================================================================

/// A node in the adjacency arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    /// False for phantom nodes created for dangling edge targets.
    pub indexed: bool,
}

/// Edge payload: connection type plus the raw weight (0 = unweighted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub connection_type: ConnectionType,
    pub weight: u8,
}

/// Owned edge description, as found in a note snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub connection_type: ConnectionType,
    /// Raw weight in [0, 100]; 0 means no explicit weight.
    pub weight: u8,
}

impl EdgeRecord {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        connection_type: ConnectionType,
        weight: u8,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            connection_type,
            weight,
        }
    }
}

/// Borrowed view of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    pub source_id: &'a str,
    pub target_id: &'a str,
    pub connection_type: ConnectionType,
    /// Raw weight (0 = unweighted).
    pub weight: u8,
    /// True when the target is not in the node set (forward reference).
    pub dangling: bool,
}

impl Edge<'_> {
    /// Weight used for propagation; unweighted edges count as 50.
    pub fn effective_weight(&self) -> u8 {
        effective_weight(Some(self.weight))
    }
}

// ============================================================================
// GraphIndex: petgraph wrapper with ID mapping
// ============================================================================

/// Id-keyed adjacency over the Neurona connection graph.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    graph: DiGraph<GraphNode, GraphEdge>,
    id_to_index: HashMap<String, NodeIndex>,
    indexed_count: usize,
}

impl GraphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            id_to_index: HashMap::with_capacity(nodes),
            indexed_count: 0,
        }
    }

    /// Build from a full snapshot of node ids and edges.
    ///
    /// Every edge source must be a listed node; targets may be dangling.
    pub fn build<N, S, E>(nodes: N, edges: E) -> EngramResult<Self>
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        E: IntoIterator<Item = EdgeRecord>,
    {
        let mut index = Self::new();
        for id in nodes {
            index.add_node(id);
        }
        for edge in edges {
            if !index.contains(&edge.source) {
                return Err(EngramError::corrupt(format!(
                    "edge source '{}' is not in the node set",
                    edge.source
                )));
            }
            index.add_edge(&edge.source, &edge.target, edge.connection_type, edge.weight);
        }
        Ok(index)
    }

    /// Build from a Neurona snapshot, one edge per connection.
    pub fn from_neuronas(neuronas: &[Neurona]) -> Self {
        let edge_total = neuronas.iter().map(|n| n.connections.len()).sum();
        let mut index = Self::with_capacity(neuronas.len(), edge_total);
        for n in neuronas {
            index.add_node(n.id.clone());
        }
        for n in neuronas {
            for c in &n.connections {
                index.add_edge(&n.id, &c.target_id, c.connection_type, c.weight.unwrap_or(0));
            }
        }
        index
    }

    /// Add an indexed node, promoting an existing phantom with the same id.
    pub fn add_node(&mut self, id: impl Into<String>) -> NodeIndex {
        let id = id.into();
        if let Some(&idx) = self.id_to_index.get(&id) {
            if !self.graph[idx].indexed {
                self.graph[idx].indexed = true;
                self.indexed_count += 1;
            }
            return idx;
        }
        let idx = self.graph.add_node(GraphNode {
            id: id.clone(),
            indexed: true,
        });
        self.id_to_index.insert(id, idx);
        self.indexed_count += 1;
        idx
    }

    fn phantom(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode {
            id: id.to_string(),
            indexed: false,
        });
        self.id_to_index.insert(id.to_string(), idx);
        idx
    }

    /// Add an edge. The source is created as a node if unknown; an unknown
    /// target becomes a phantom (dangling reference).
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        connection_type: ConnectionType,
        weight: u8,
    ) -> EdgeIndex {
        let from = self.add_node(source);
        let to = self.phantom(target);
        self.graph.add_edge(
            from,
            to,
            GraphEdge {
                connection_type,
                weight: weight.min(100),
            },
        )
    }

    /// True when `id` is in the node set (phantoms excluded).
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index
            .get(id)
            .is_some_and(|&idx| self.graph[idx].indexed)
    }

    /// Indexed node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| &self.graph[idx])
            .filter(|n| n.indexed)
            .map(|n| n.id.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.indexed_count
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed_count == 0
    }

    /// Every edge in insertion order.
    pub fn edges(&self) -> Vec<Edge<'_>> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some(self.view(from, to, &self.graph[e]))
            })
            .collect()
    }

    /// Outgoing edges of `id`, optionally restricted to one connection type.
    ///
    /// Edges come back in the order they were added. Unknown ids yield an
    /// empty list; dangling targets are returned with `dangling = true`.
    pub fn outgoing(&self, id: &str, filter: Option<ConnectionType>) -> Vec<Edge<'_>> {
        self.directed(id, Direction::Outgoing, filter)
    }

    /// Incoming edges of `id` (including edges pointing at a phantom).
    pub fn incoming(&self, id: &str, filter: Option<ConnectionType>) -> Vec<Edge<'_>> {
        self.directed(id, Direction::Incoming, filter)
    }

    fn directed(
        &self,
        id: &str,
        direction: Direction,
        filter: Option<ConnectionType>,
    ) -> Vec<Edge<'_>> {
        let Some(&idx) = self.id_to_index.get(id) else {
            return Vec::new();
        };
        let mut found: Vec<(EdgeIndex, Edge<'_>)> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| filter.map_or(true, |t| e.weight().connection_type == t))
            .map(|e| (e.id(), self.view(e.source(), e.target(), e.weight())))
            .collect();
        // petgraph yields adjacency newest-first
        found.sort_by_key(|(eid, _)| eid.index());
        found.into_iter().map(|(_, e)| e).collect()
    }

    fn view(&self, from: NodeIndex, to: NodeIndex, edge: &GraphEdge) -> Edge<'_> {
        let target = &self.graph[to];
        Edge {
            source_id: &self.graph[from].id,
            target_id: &target.id,
            connection_type: edge.connection_type,
            weight: edge.weight,
            dangling: !target.indexed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neurona::{Connection, NeuronaType};

    #[test]
    fn test_build_rejects_unknown_source() {
        let result = GraphIndex::build(
            ["a"],
            [EdgeRecord::new("ghost", "a", ConnectionType::Parent, 10)],
        );
        assert!(matches!(result, Err(EngramError::IndexCorrupt { .. })));
    }

    #[test]
    fn test_dangling_target_is_not_a_node() {
        let g = GraphIndex::build(
            ["a"],
            [EdgeRecord::new("a", "future", ConnectionType::Next, 0)],
        )
        .unwrap();
        assert_eq!(g.node_count(), 1);
        assert!(!g.contains("future"));

        let out = g.outgoing("a", None);
        assert_eq!(out.len(), 1);
        assert!(out[0].dangling);
        assert_eq!(out[0].effective_weight(), 50);
        assert!(g.outgoing("future", None).is_empty());
    }

    #[test]
    fn test_phantom_promoted_when_node_arrives() {
        let mut g = GraphIndex::new();
        g.add_edge("a", "b", ConnectionType::Child, 70);
        assert!(!g.contains("b"));
        g.add_node("b");
        assert!(g.contains("b"));
        assert_eq!(g.node_count(), 2);
        assert!(!g.outgoing("a", None)[0].dangling);
    }

    #[test]
    fn test_outgoing_keeps_declaration_order_and_filters() {
        let n = Neurona::new("req.1", "Req", NeuronaType::Requirement)
            .with_connection(Connection::weighted(ConnectionType::ValidatedBy, "test.1", 90))
            .with_connection(Connection::new(ConnectionType::Parent, "epic.1"))
            .with_connection(Connection::weighted(ConnectionType::ValidatedBy, "test.2", 40));
        let g = GraphIndex::from_neuronas(&[n]);

        let all: Vec<&str> = g.outgoing("req.1", None).iter().map(|e| e.target_id).collect();
        assert_eq!(all, vec!["test.1", "epic.1", "test.2"]);

        let validated: Vec<&str> = g
            .outgoing("req.1", Some(ConnectionType::ValidatedBy))
            .iter()
            .map(|e| e.target_id)
            .collect();
        assert_eq!(validated, vec!["test.1", "test.2"]);

        let incoming = g.incoming("test.2", None);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source_id, "req.1");
    }

    #[test]
    fn test_cycles_are_representable() {
        let g = GraphIndex::build(
            ["a", "b"],
            [
                EdgeRecord::new("a", "b", ConnectionType::Related, 100),
                EdgeRecord::new("b", "a", ConnectionType::Related, 100),
            ],
        )
        .unwrap();
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.outgoing("b", None)[0].target_id, "a");
    }
}
