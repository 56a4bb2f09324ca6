//! Vector index bound to its file and a persistence strategy.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngramError, EngramResult};
use crate::neurona::hash_content;

use super::index::VectorIndex;

/// When computed document vectors reach disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStrategy {
    /// Compute on demand, keep in memory only.
    #[default]
    Lazy,
    /// Persist after every computation.
    Eager,
    /// Persist only when the content hash changed.
    OnSave,
}

impl fmt::Display for PersistenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lazy => write!(f, "lazy"),
            Self::Eager => write!(f, "eager"),
            Self::OnSave => write!(f, "on_save"),
        }
    }
}

impl FromStr for PersistenceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lazy" => Ok(Self::Lazy),
            "eager" => Ok(Self::Eager),
            "on_save" | "onsave" | "on-save" => Ok(Self::OnSave),
            _ => Err(format!("Unknown persistence strategy: {}", s)),
        }
    }
}

/// Outcome of [`VectorStore::ensure_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Stored vector is current; nothing computed.
    Unchanged,
    /// Vector computed and kept in memory.
    Cached,
    /// Vector computed and written to disk.
    Persisted,
    /// No content token is in the vocabulary.
    Unresolvable,
}

/// A [`VectorIndex`] plus the file it persists to.
#[derive(Debug)]
pub struct VectorStore {
    index: VectorIndex,
    path: PathBuf,
    strategy: PersistenceStrategy,
}

impl VectorStore {
    pub fn new(index: VectorIndex, path: impl Into<PathBuf>, strategy: PersistenceStrategy) -> Self {
        Self {
            index,
            path: path.into(),
            strategy,
        }
    }

    /// Load the index at `path`.
    pub fn open(path: impl Into<PathBuf>, strategy: PersistenceStrategy) -> EngramResult<Self> {
        let path = path.into();
        let index = VectorIndex::load(&path)?;
        Ok(Self::new(index, path, strategy))
    }

    /// Load the index at `path`, starting empty when the file does not exist.
    pub fn open_or_empty(
        path: impl Into<PathBuf>,
        strategy: PersistenceStrategy,
    ) -> EngramResult<Self> {
        let path = path.into();
        match VectorIndex::load(&path) {
            Ok(index) => Ok(Self::new(index, path, strategy)),
            Err(EngramError::MissingIndex { .. }) => {
                warn!(path = %path.display(), "No vector index on disk, starting empty");
                Ok(Self::new(VectorIndex::new(), path, strategy))
            }
            Err(e) => Err(e),
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut VectorIndex {
        &mut self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn strategy(&self) -> PersistenceStrategy {
        self.strategy
    }

    /// Make sure a document vector for `id` reflects `content`.
    pub fn ensure_document(&mut self, id: &str, content: &str) -> EngramResult<EnsureOutcome> {
        let hash = hash_content(content);

        let current = self
            .index
            .document(id)
            .is_some_and(|doc| doc.content_hash.as_deref() == Some(hash.as_str()));
        if current {
            debug!(id = %id, strategy = %self.strategy, "Document vector up to date");
            return Ok(EnsureOutcome::Unchanged);
        }

        let Some(vector) = self.index.document_vector(content) else {
            let dropped = self.remove_document(id)?;
            debug!(id = %id, dropped, "No resolvable tokens for document vector");
            return Ok(EnsureOutcome::Unresolvable);
        };

        match self.strategy {
            PersistenceStrategy::Lazy => {
                self.index.insert_document(id, vector, Some(hash))?;
                Ok(EnsureOutcome::Cached)
            }
            PersistenceStrategy::Eager | PersistenceStrategy::OnSave => {
                self.upsert_document_vector(id, vector, Some(hash))?;
                Ok(EnsureOutcome::Persisted)
            }
        }
    }

    /// Store `vector` for `id` and rewrite the document section on disk.
    pub fn upsert_document_vector(
        &mut self,
        id: &str,
        vector: Vec<f32>,
        content_hash: Option<String>,
    ) -> EngramResult<()> {
        self.index.insert_document(id, vector, content_hash)?;
        self.index.save_documents(&self.path)
    }

    /// Drop the vector for `id`. Persisted unless the strategy is `lazy`.
    pub fn remove_document(&mut self, id: &str) -> EngramResult<bool> {
        if self.index.remove_document(id).is_none() {
            return Ok(false);
        }
        if self.strategy != PersistenceStrategy::Lazy {
            self.index.save_documents(&self.path)?;
        }
        Ok(true)
    }

    /// Write the full index, word section included.
    pub fn save(&mut self) -> EngramResult<()> {
        self.index.save(&self.path)
    }
}
