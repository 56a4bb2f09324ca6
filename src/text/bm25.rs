//! BM25 keyword index over Neurona titles and tags.

use std::collections::HashMap;

use tracing::debug;

use crate::neurona::Neurona;

use super::tokenizer::tokenize;

/// BM25 term-frequency saturation.
const K1: f64 = 1.2;
/// BM25 length normalization.
const B: f64 = 0.75;

#[derive(Debug, Clone)]
struct Posting {
    doc: usize,
    tf: u32,
}

/// Inverted index of title + tag tokens with BM25 scoring.
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    ids: Vec<String>,
    lengths: Vec<u32>,
    postings: HashMap<String, Vec<Posting>>,
    total_len: u64,
    avg_len: f64,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a Neurona snapshot.
    pub fn build(neuronas: &[Neurona]) -> Self {
        let mut index = Self::new();
        for n in neuronas {
            let mut text = n.title.clone();
            for tag in &n.tags {
                text.push(' ');
                text.push_str(tag);
            }
            index.add_document(&n.id, &text);
        }
        debug!(
            documents = index.len(),
            terms = index.postings.len(),
            "Built text index"
        );
        index
    }

    /// Index one document's text.
    pub fn add_document(&mut self, id: &str, text: &str) {
        let doc = self.ids.len();
        let tokens = tokenize(text);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for t in &tokens {
            *counts.entry(t.clone()).or_insert(0) += 1;
        }
        for (term, tf) in counts {
            self.postings.entry(term).or_default().push(Posting { doc, tf });
        }
        self.ids.push(id.to_string());
        self.lengths.push(tokens.len() as u32);
        self.total_len += tokens.len() as u64;
        self.avg_len = self.total_len as f64 / self.ids.len() as f64;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn idf(&self, doc_freq: usize) -> f64 {
        let n = self.ids.len() as f64;
        let df = doc_freq as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score every document matching at least one query token.
    ///
    /// Sorted by descending score, ties by ascending id. Documents with no
    /// matching token are not returned.
    pub fn search(&self, query: &str) -> Vec<(String, f64)> {
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();

        let mut scores: HashMap<usize, f64> = HashMap::new();
        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(postings.len());
            for p in postings {
                let tf = p.tf as f64;
                let len_norm = if self.avg_len > 0.0 {
                    self.lengths[p.doc] as f64 / self.avg_len
                } else {
                    1.0
                };
                let score = idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * len_norm));
                *scores.entry(p.doc).or_insert(0.0) += score;
            }
        }

        let mut ranked: Vec<(String, f64)> = scores
            .into_iter()
            .filter(|(_, s)| *s > 0.0)
            .map(|(doc, s)| (self.ids[doc].clone(), s))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        debug!(query = %query, hits = ranked.len(), "Text search");
        ranked
    }
}
