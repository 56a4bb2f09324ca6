//! Collaborator interfaces for the note store and content summarizer.
//!
//! The retrieval core never reads note files itself. It asks a [`NoteStore`]
//! for a read-only snapshot and, after ranking, optionally hands hydrated
//! content to a [`ContentSummarizer`].

use std::collections::BTreeMap;

use anyhow::Result;

use super::models::Neurona;

/// Read-only access to parsed Neuronas.
///
/// Implementations must return a consistent snapshot for the duration of a
/// single query.
pub trait NoteStore {
    /// Enumerate every Neurona in the cortex.
    fn all(&self) -> Result<Vec<Neurona>>;

    /// Fetch a single Neurona by id.
    fn get(&self, id: &str) -> Result<Option<Neurona>>;

    /// Fetch the raw content of a Neurona. Called only for results that
    /// survive truncation.
    fn content(&self, id: &str) -> Result<Option<String>> {
        Ok(self.get(id)?.map(|n| n.content))
    }
}

/// Shortens hydrated content after ranking. Has no influence on scores.
pub trait ContentSummarizer {
    fn summarize(&self, content: &str, strategy: &str, token_budget: usize) -> Result<String>;
}

/// In-memory note store backed by an id-ordered map.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteStore {
    neuronas: BTreeMap<String, Neurona>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_neuronas(neuronas: impl IntoIterator<Item = Neurona>) -> Self {
        let mut store = Self::new();
        for n in neuronas {
            store.insert(n);
        }
        store
    }

    /// Insert or replace a Neurona.
    pub fn insert(&mut self, neurona: Neurona) {
        self.neuronas.insert(neurona.id.clone(), neurona);
    }

    pub fn remove(&mut self, id: &str) -> Option<Neurona> {
        self.neuronas.remove(id)
    }

    pub fn len(&self) -> usize {
        self.neuronas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neuronas.is_empty()
    }
}

impl NoteStore for MemoryNoteStore {
    fn all(&self) -> Result<Vec<Neurona>> {
        Ok(self.neuronas.values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<Neurona>> {
        Ok(self.neuronas.get(id).cloned())
    }
}
