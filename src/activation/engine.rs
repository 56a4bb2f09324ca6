//! Spreading activation over the graph index.
//!
//! 1. **Seeding**: directly matched nodes start with their normalized score
//! 2. **Spreading**: each step pushes `signal * weight / 100` along outgoing
//!    edges; contributions to one target are summed and clamped to 1.0
//! 3. **Ranking**: noise filter, then descending score with id tie-break
//!
//! The walk is breadth-first by step over sorted maps, so identical seeds
//! and graphs always produce identical output.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::graph::GraphIndex;

use super::config::ActivationConfig;

/// Tolerance for comparisons against the cutoff and noise floor.
const EPSILON: f64 = 1e-9;

// ============================================================================
// Result types
// ============================================================================

/// How a node was activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationSource {
    /// Present in the seed set.
    Direct,
    /// First reached through the graph.
    Propagated {
        /// Node whose edge delivered the largest contribution.
        via: String,
        /// Steps from the seed set.
        hops: usize,
    },
}

/// A node with its final activation score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activated {
    pub id: String,
    /// Accumulated signal in (0, 1].
    pub score: f64,
    pub source: ActivationSource,
}

// ============================================================================
// Engine
// ============================================================================

/// Stateless activation runner; all state lives in one `run` call.
#[derive(Debug, Clone, Default)]
pub struct ActivationEngine {
    config: ActivationConfig,
}

struct Incoming {
    sum: f64,
    best_via: String,
    best: f64,
}

impl ActivationEngine {
    pub fn new(config: ActivationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ActivationConfig {
        &self.config
    }

    fn edge_weight(&self, raw: u8) -> f64 {
        let w = if raw == 0 {
            self.config.default_weight
        } else {
            raw
        };
        f64::from(w.min(100)) / 100.0
    }

    /// Spread `seeds` over `graph` and return the surviving nodes, ranked.
    ///
    /// Seed scores are clamped to 1.0; non-positive seeds are ignored. A
    /// seed listed twice keeps its highest score.
    pub fn run(&self, graph: &GraphIndex, seeds: &[(String, f64)]) -> Vec<Activated> {
        let mut scores: HashMap<String, f64> = HashMap::new();
        let mut sources: HashMap<String, ActivationSource> = HashMap::new();
        let mut frontier: BTreeMap<String, f64> = BTreeMap::new();

        for (id, score) in seeds {
            if !score.is_finite() || *score <= 0.0 {
                continue;
            }
            let s = score.min(1.0);
            let entry = scores.entry(id.clone()).or_insert(0.0);
            if s > *entry {
                *entry = s;
                frontier.insert(id.clone(), s);
            }
            sources.insert(id.clone(), ActivationSource::Direct);
        }

        debug!(seeds = frontier.len(), "Activation: seeded");

        for hop in 1..=self.config.max_hops {
            let mut incoming: BTreeMap<String, Incoming> = BTreeMap::new();

            for (id, signal) in &frontier {
                if *signal <= self.config.cutoff + EPSILON {
                    trace!(id = %id, signal, "Activation: below cutoff, not propagating");
                    continue;
                }
                for edge in graph.outgoing(id, None) {
                    if edge.dangling {
                        continue;
                    }
                    let contribution = signal * self.edge_weight(edge.weight);
                    if contribution <= 0.0 {
                        continue;
                    }
                    let slot = incoming
                        .entry(edge.target_id.to_string())
                        .or_insert_with(|| Incoming {
                            sum: 0.0,
                            best_via: id.clone(),
                            best: 0.0,
                        });
                    slot.sum += contribution;
                    if contribution > slot.best {
                        slot.best = contribution;
                        slot.best_via = id.clone();
                    }
                }
            }

            let mut next: BTreeMap<String, f64> = BTreeMap::new();
            for (target, slot) in incoming {
                let previous = scores.get(&target).copied().unwrap_or(0.0);
                let updated = (previous + slot.sum.min(1.0)).min(1.0);
                let gained = updated - previous;
                if gained <= EPSILON {
                    continue;
                }
                scores.insert(target.clone(), updated);
                sources
                    .entry(target.clone())
                    .or_insert_with(|| ActivationSource::Propagated {
                        via: slot.best_via.clone(),
                        hops: hop,
                    });
                next.insert(target, gained);
            }

            debug!(hop, activated = next.len(), "Activation: step");
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let mut results: Vec<Activated> = scores
            .into_iter()
            .filter(|(_, score)| *score + EPSILON >= self.config.noise_floor)
            .map(|(id, score)| {
                let source = sources
                    .remove(&id)
                    .unwrap_or(ActivationSource::Direct);
                Activated { id, score, source }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(
            results = results.len(),
            top = results.first().map(|r| r.score).unwrap_or(0.0),
            "Activation: ranked"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeRecord;
    use crate::neurona::ConnectionType;

    fn graph(nodes: &[&str], edges: &[(&str, &str, u8)]) -> GraphIndex {
        let edges: Vec<EdgeRecord> = edges
            .iter()
            .map(|(s, t, w)| EdgeRecord::new(*s, *t, ConnectionType::RelatesTo, *w))
            .collect();
        GraphIndex::build(nodes.iter().copied(), edges).unwrap()
    }

    fn seed(id: &str, score: f64) -> Vec<(String, f64)> {
        vec![(id.to_string(), score)]
    }

    fn score_of(results: &[Activated], id: &str) -> Option<f64> {
        results.iter().find(|r| r.id == id).map(|r| r.score)
    }

    #[test]
    fn test_full_weight_chain_has_no_decay() {
        let g = graph(&["a", "b", "c"], &[("a", "b", 100), ("b", "c", 100)]);
        let results = ActivationEngine::default().run(&g, &seed("a", 1.0));
        assert_eq!(score_of(&results, "b"), Some(1.0));
        assert_eq!(score_of(&results, "c"), Some(1.0));
        assert_eq!(
            results.iter().find(|r| r.id == "c").unwrap().source,
            ActivationSource::Propagated {
                via: "b".into(),
                hops: 2
            }
        );
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_signal_at_cutoff_does_not_propagate() {
        let g = graph(&["a", "b", "c"], &[("a", "b", 20), ("b", "c", 100)]);
        let results = ActivationEngine::default().run(&g, &seed("a", 1.0));
        let b = score_of(&results, "b").unwrap();
        assert!((b - 0.2).abs() < 1e-12);
        assert_eq!(score_of(&results, "c"), None);
    }

    #[test]
    fn test_unweighted_edge_halves_signal() {
        let g = graph(&["a", "b"], &[("a", "b", 0)]);
        let results = ActivationEngine::default().run(&g, &seed("a", 0.8));
        assert!((score_of(&results, "b").unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_propagation_is_linear_in_weight() {
        for w in [1u8, 25, 50, 73, 100] {
            let g = graph(&["a", "b"], &[("a", "b", w)]);
            let config = ActivationConfig {
                noise_floor: 0.0,
                ..Default::default()
            };
            let results = ActivationEngine::new(config).run(&g, &seed("a", 0.9));
            let expected = 0.9 * f64::from(w) / 100.0;
            assert!((score_of(&results, "b").unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_summation_is_clamped() {
        let g = graph(
            &["a", "b", "c"],
            &[("a", "c", 80), ("b", "c", 80)],
        );
        let seeds = vec![("a".to_string(), 1.0), ("b".to_string(), 1.0)];
        let results = ActivationEngine::default().run(&g, &seeds);
        assert_eq!(score_of(&results, "c"), Some(1.0));
        assert!(results.iter().all(|r| r.score <= 1.0));
    }

    #[test]
    fn test_cycles_terminate() {
        let g = graph(&["a", "b"], &[("a", "b", 100), ("b", "a", 100)]);
        let results = ActivationEngine::default().run(&g, &seed("a", 0.9));
        assert_eq!(score_of(&results, "a"), Some(1.0));
        assert!((score_of(&results, "b").unwrap() - 0.9).abs() < 1e-12);
        assert_eq!(results[0].source, ActivationSource::Direct);
    }

    #[test]
    fn test_noise_floor_drops_weak_nodes() {
        let g = graph(&["a", "b", "c"], &[("a", "b", 5), ("a", "c", 10)]);
        let results = ActivationEngine::default().run(&g, &seed("a", 1.0));
        assert_eq!(score_of(&results, "b"), None);
        assert!((score_of(&results, "c").unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_dangling_targets_are_skipped() {
        let edges = vec![EdgeRecord::new("a", "ghost", ConnectionType::Next, 100)];
        let g = GraphIndex::build(["a"], edges).unwrap();
        let results = ActivationEngine::default().run(&g, &seed("a", 1.0));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_hop_cap_bounds_walk() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b", 100), ("b", "c", 100), ("c", "d", 100)],
        );
        let config = ActivationConfig {
            max_hops: 2,
            ..Default::default()
        };
        let results = ActivationEngine::new(config).run(&g, &seed("a", 1.0));
        assert!(score_of(&results, "c").is_some());
        assert_eq!(score_of(&results, "d"), None);
    }

    #[test]
    fn test_deterministic_ties() {
        let g = graph(&["s", "y", "x"], &[("s", "y", 50), ("s", "x", 50)]);
        let first = ActivationEngine::default().run(&g, &seed("s", 1.0));
        for _ in 0..5 {
            assert_eq!(ActivationEngine::default().run(&g, &seed("s", 1.0)), first);
        }
        let ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s", "x", "y"]);
    }
}
