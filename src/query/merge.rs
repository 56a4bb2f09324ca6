//! Hybrid score fusion: `text_weight * text / max_text + vector_weight * vector / max_vector`.
//!
//! Each list is normalized by its own maximum, so raw BM25 and cosine
//! scores land on the same [0, 1] scale before weighting. An id missing
//! from one list contributes 0 from that side.

use std::collections::BTreeMap;

use crate::config::HybridConfig;

/// Scale scores into (0, 1] by the list maximum. Non-positive scores are dropped.
pub fn normalize(scores: &[(String, f64)]) -> Vec<(String, f64)> {
    let max = scores
        .iter()
        .map(|(_, s)| *s)
        .filter(|s| s.is_finite())
        .fold(0.0f64, f64::max);
    if max <= 0.0 {
        return Vec::new();
    }
    scores
        .iter()
        .filter(|(_, s)| s.is_finite() && *s > 0.0)
        .map(|(id, s)| (id.clone(), s / max))
        .collect()
}

/// Merge text and vector rankings.
///
/// Sorted by descending merged score, ties by ascending id, so equal
/// inputs always yield the same order.
pub fn merge_hybrid(
    text: &[(String, f64)],
    vector: &[(String, f64)],
    weights: &HybridConfig,
) -> Vec<(String, f64)> {
    let mut merged: BTreeMap<String, f64> = BTreeMap::new();

    for (id, score) in normalize(text) {
        *merged.entry(id).or_default() += weights.text_weight * score;
    }
    for (id, score) in normalize(vector) {
        *merged.entry(id).or_default() += weights.vector_weight * score;
    }

    let mut ranked: Vec<(String, f64)> = merged.into_iter().filter(|(_, s)| *s > 0.0).collect();
    sort_ranked(&mut ranked);
    ranked
}

/// Descending score, ascending id.
pub fn sort_ranked(ranked: &mut [(String, f64)]) {
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn test_normalize_by_max() {
        let n = normalize(&list(&[("a", 4.0), ("b", 2.0), ("c", 0.0)]));
        assert_eq!(n, list(&[("a", 1.0), ("b", 0.5)]));
        assert!(normalize(&list(&[("a", 0.0)])).is_empty());
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_weighted_merge() {
        let text = list(&[("a", 10.0), ("b", 5.0)]);
        let vector = list(&[("b", 0.9), ("c", 0.45)]);
        let merged = merge_hybrid(&text, &vector, &HybridConfig::default());

        let get = |id: &str| merged.iter().find(|(i, _)| i == id).unwrap().1;
        assert!((get("a") - 0.6).abs() < 1e-12);
        assert!((get("b") - (0.3 + 0.4)).abs() < 1e-12);
        assert!((get("c") - 0.2).abs() < 1e-12);
        assert_eq!(merged[0].0, "b");
    }

    #[test]
    fn test_merge_is_deterministic_on_ties() {
        let text = list(&[("z", 1.0), ("m", 1.0)]);
        let vector = list(&[("a", 1.0)]);
        let weights = HybridConfig {
            text_weight: 0.5,
            vector_weight: 0.5,
            activate: false,
        };
        let first = merge_hybrid(&text, &vector, &weights);
        let ids: Vec<&str> = first.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
        for _ in 0..5 {
            assert_eq!(merge_hybrid(&text, &vector, &weights), first);
        }
    }

    #[test]
    fn test_missing_vector_side_keeps_text_order() {
        let text = list(&[("b", 3.0), ("a", 6.0)]);
        let merged = merge_hybrid(&text, &[], &HybridConfig::default());
        let ids: Vec<&str> = merged.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
