//! Dependency tracing over the graph index.
//!
//! Breadth-first walk along outgoing connections, reporting each reachable
//! node once at the lowest level it was found.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::neurona::ConnectionType;

use super::models::GraphIndex;

/// One node reached by [`GraphIndex::trace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub id: String,
    /// Distance from the start node (1 = direct connection).
    pub level: usize,
    /// Node the walk came from.
    pub via: String,
    pub connection_type: ConnectionType,
    /// True when the node is referenced but not indexed.
    pub dangling: bool,
}

impl GraphIndex {
    /// Trace dependencies of `start` up to `max_depth` levels.
    ///
    /// The start node itself is not reported. Dangling targets are reported
    /// but never expanded. Order is breadth-first, then declaration order.
    pub fn trace(&self, start: &str, max_depth: usize) -> Vec<TraceStep> {
        let mut steps = Vec::new();
        if max_depth == 0 || !self.contains(start) {
            return steps;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(start);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((start, 0));

        while let Some((current, level)) = queue.pop_front() {
            if level >= max_depth {
                continue;
            }
            for edge in self.outgoing(current, None) {
                if !visited.insert(edge.target_id) {
                    continue;
                }
                steps.push(TraceStep {
                    id: edge.target_id.to_string(),
                    level: level + 1,
                    via: current.to_string(),
                    connection_type: edge.connection_type,
                    dangling: edge.dangling,
                });
                if !edge.dangling {
                    queue.push_back((edge.target_id, level + 1));
                }
            }
        }

        steps
    }
}
