//! Word and document vectors with cosine search.
//!
//! A document vector is the arithmetic mean of the word vectors of the
//! document's tokens that exist in the vocabulary. All vectors in one index
//! share a single dimension, fixed by the first vector inserted.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngramError, EngramResult};
use crate::text::tokenize;

/// A stored document vector plus the hash of the content it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocVector {
    pub vector: Vec<f32>,
    /// Content hash, present when the vector was persisted under `on_save`
    /// or `eager`.
    pub content_hash: Option<String>,
}

/// Word embeddings plus per-Neurona document vectors.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    /// 0 until the first vector fixes it.
    pub(crate) dimension: usize,
    pub(crate) word_vectors: HashMap<String, Vec<f32>>,
    pub(crate) doc_vectors: BTreeMap<String, DocVector>,
    /// Byte offset of the document section in the file this index was last
    /// saved to or loaded from.
    pub(crate) doc_section_offset: Option<u64>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension shared by all vectors, or `None` while the index is empty.
    pub fn dimension(&self) -> Option<usize> {
        (self.dimension > 0).then_some(self.dimension)
    }

    pub fn word_count(&self) -> usize {
        self.word_vectors.len()
    }

    pub fn document_count(&self) -> usize {
        self.doc_vectors.len()
    }

    pub fn word_vector(&self, token: &str) -> Option<&[f32]> {
        self.word_vectors.get(token).map(|v| v.as_slice())
    }

    pub fn document(&self, id: &str) -> Option<&DocVector> {
        self.doc_vectors.get(id)
    }

    pub fn document_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.doc_vectors.keys().map(|k| k.as_str())
    }

    fn check_dimension(&mut self, len: usize) -> EngramResult<()> {
        if len == 0 {
            return Err(EngramError::DimensionMismatch {
                expected: self.dimension,
                found: 0,
            });
        }
        if self.dimension == 0 {
            self.dimension = len;
            return Ok(());
        }
        if self.dimension != len {
            return Err(EngramError::DimensionMismatch {
                expected: self.dimension,
                found: len,
            });
        }
        Ok(())
    }

    /// Insert or replace a word vector.
    pub fn insert_word(&mut self, token: impl Into<String>, vector: Vec<f32>) -> EngramResult<()> {
        self.check_dimension(vector.len())?;
        self.word_vectors.insert(token.into(), vector);
        Ok(())
    }

    /// Insert or replace a document vector in memory only.
    pub fn insert_document(
        &mut self,
        id: impl Into<String>,
        vector: Vec<f32>,
        content_hash: Option<String>,
    ) -> EngramResult<()> {
        self.check_dimension(vector.len())?;
        self.doc_vectors.insert(
            id.into(),
            DocVector {
                vector,
                content_hash,
            },
        );
        Ok(())
    }

    pub fn remove_document(&mut self, id: &str) -> Option<DocVector> {
        self.doc_vectors.remove(id)
    }

    /// Mean of the word vectors of the resolvable tokens in `content`.
    ///
    /// Returns `None` when no token is in the vocabulary.
    pub fn document_vector(&self, content: &str) -> Option<Vec<f32>> {
        if self.dimension == 0 {
            return None;
        }
        let mut sum = vec![0.0f64; self.dimension];
        let mut resolved = 0usize;
        for token in tokenize(content) {
            if let Some(v) = self.word_vectors.get(&token) {
                for (acc, x) in sum.iter_mut().zip(v) {
                    *acc += *x as f64;
                }
                resolved += 1;
            }
        }
        if resolved == 0 {
            return None;
        }
        Some(sum.into_iter().map(|x| (x / resolved as f64) as f32).collect())
    }

    /// Rank documents by cosine similarity to `query`.
    ///
    /// Descending score, ties by ascending id. Zero-norm documents are skipped.
    pub fn search(&self, query: &[f32]) -> EngramResult<Vec<(String, f64)>> {
        if self.dimension != 0 && query.len() != self.dimension {
            return Err(EngramError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }
        let query_norm = norm(query);
        if query_norm == 0.0 {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(String, f64)> = self
            .doc_vectors
            .iter()
            .filter_map(|(id, doc)| {
                let doc_norm = norm(&doc.vector);
                if doc_norm == 0.0 {
                    return None;
                }
                let dot: f64 = query
                    .iter()
                    .zip(&doc.vector)
                    .map(|(a, b)| *a as f64 * *b as f64)
                    .sum();
                Some((id.clone(), dot / (query_norm * doc_norm)))
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(ranked)
    }

    /// Average the query's tokens and rank documents against it.
    pub fn search_text(&self, query: &str) -> EngramResult<Vec<(String, f64)>> {
        match self.document_vector(query) {
            Some(q) => {
                let ranked = self.search(&q)?;
                debug!(query = %query, hits = ranked.len(), "Vector search");
                Ok(ranked)
            }
            None => {
                debug!(query = %query, "Vector search: no query token in vocabulary");
                Ok(Vec::new())
            }
        }
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> VectorIndex {
        let mut idx = VectorIndex::new();
        idx.insert_word("sensor", vec![1.0, 0.0]).unwrap();
        idx.insert_word("temperature", vec![0.0, 1.0]).unwrap();
        idx.insert_word("display", vec![-1.0, 0.0]).unwrap();
        idx
    }

    #[test]
    fn test_document_vector_is_mean_of_known_tokens() {
        let idx = index();
        let v = idx.document_vector("Temperature sensor foobar").unwrap();
        assert_eq!(v, vec![0.5, 0.5]);
        assert!(idx.document_vector("nothing known here").is_none());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut idx = index();
        let err = idx.insert_word("bad", vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            EngramError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        ));
        assert!(idx.insert_document("n", vec![1.0], None).is_err());
        assert!(idx.search(&[1.0]).is_err());
    }

    #[test]
    fn test_cosine_ranking_and_ties() {
        let mut idx = index();
        idx.insert_document("b", vec![1.0, 0.0], None).unwrap();
        idx.insert_document("a", vec![2.0, 0.0], None).unwrap();
        idx.insert_document("c", vec![0.0, 1.0], None).unwrap();
        idx.insert_document("z", vec![0.0, 0.0], None).unwrap();

        let hits = idx.search(&[1.0, 0.0]).unwrap();
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
        assert!(hits[2].1.abs() < 1e-9);
    }

    #[test]
    fn test_search_text_without_known_tokens_is_empty() {
        let mut idx = index();
        idx.insert_document("a", vec![1.0, 0.0], None).unwrap();
        assert!(idx.search_text("unknown words").unwrap().is_empty());
        assert_eq!(idx.search_text("sensor").unwrap()[0].0, "a");
    }
}
