//! Query orchestration.
//!
//! parse → evaluate sub-index(es) → optional activation pass → truncate.
//! Hydration is a separate step so content is only fetched for the
//! results the caller keeps.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::activation::ActivationEngine;
use crate::config::EngramConfig;
use crate::eql;
use crate::error::{EngramError, EngramResult};
use crate::graph::{GraphIndex, TraceStep};
use crate::neurona::{ContentSummarizer, NoteStore};
use crate::text::TextIndex;
use crate::vectors::{EnsureOutcome, VectorStore};

use super::filter;
use super::merge::{merge_hybrid, normalize, sort_ranked};
use super::models::{HydratedResult, MatchReason, QueryMode, QueryResult};

const VECTOR_HINT: &str = "import word embeddings to build the vector index";

/// Counts reported by [`QueryEngine::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub neuronas: usize,
    pub edges: usize,
    pub text_documents: usize,
}

/// Summarizer settings for [`QueryEngine::hydrate`].
pub struct Summarize<'a> {
    pub summarizer: &'a dyn ContentSummarizer,
    pub strategy: &'a str,
    pub token_budget: usize,
}

/// Retrieval entry point over one cortex.
pub struct QueryEngine {
    store: Arc<dyn NoteStore>,
    graph: GraphIndex,
    text: TextIndex,
    vectors: Option<VectorStore>,
    graph_path: Option<PathBuf>,
    vectors_path: PathBuf,
    activation: ActivationEngine,
    config: EngramConfig,
}

impl QueryEngine {
    /// Engine with empty indices. Call [`sync`](Self::sync) or attach
    /// indices before querying.
    pub fn new(store: Arc<dyn NoteStore>, config: EngramConfig) -> Self {
        Self {
            store,
            graph: GraphIndex::new(),
            text: TextIndex::new(),
            vectors: None,
            graph_path: None,
            vectors_path: config.vectors.path.clone(),
            activation: ActivationEngine::new(config.activation.clone()),
            config,
        }
    }

    /// Open the indices of the cortex at `root`.
    ///
    /// The text index is built from the store. A missing graph index is
    /// rebuilt in memory; a missing vector index leaves vector search
    /// unavailable. Corrupt or mismatched files are errors.
    pub fn open(root: &Path, store: Arc<dyn NoteStore>, config: EngramConfig) -> EngramResult<Self> {
        let graph_path = config.graph_path(root);
        let vectors_path = config.vectors_path(root);
        let mut engine = Self::new(store, config);
        engine.vectors_path = vectors_path.clone();

        let snapshot = engine.store.all()?;
        engine.text = TextIndex::build(&snapshot);

        engine.graph = match GraphIndex::load(&graph_path) {
            Ok(graph) => graph,
            Err(EngramError::MissingIndex { .. }) => {
                warn!(path = %graph_path.display(), "Graph index missing, rebuilding in memory");
                GraphIndex::from_neuronas(&snapshot)
            }
            Err(e) => return Err(e),
        };
        engine.graph_path = Some(graph_path);

        match VectorStore::open(&vectors_path, engine.config.vectors.strategy) {
            Ok(store) => {
                if let (Some(expected), Some(found)) =
                    (engine.config.vectors.dimension_hint, store.index().dimension())
                {
                    if expected != found {
                        return Err(EngramError::DimensionMismatch { expected, found });
                    }
                }
                engine.vectors = Some(store);
            }
            Err(EngramError::MissingIndex { .. }) => {
                debug!(path = %vectors_path.display(), "No vector index");
            }
            Err(e) => return Err(e),
        }

        info!(
            root = %root.display(),
            nodes = engine.graph.node_count(),
            documents = engine.text.len(),
            vectors = engine.vectors.is_some(),
            "Opened cortex"
        );
        Ok(engine)
    }

    pub fn with_graph(mut self, graph: GraphIndex) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_text(mut self, text: TextIndex) -> Self {
        self.text = text;
        self
    }

    pub fn with_vectors(mut self, vectors: VectorStore) -> Self {
        self.vectors_path = vectors.path().to_path_buf();
        self.vectors = Some(vectors);
        self
    }

    /// Persist the graph to `path` on every [`sync`](Self::sync).
    pub fn with_graph_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.graph_path = Some(path.into());
        self
    }

    pub fn graph(&self) -> &GraphIndex {
        &self.graph
    }

    pub fn text(&self) -> &TextIndex {
        &self.text
    }

    pub fn vectors(&self) -> Option<&VectorStore> {
        self.vectors.as_ref()
    }

    pub fn config(&self) -> &EngramConfig {
        &self.config
    }

    /// Rebuild graph and text indices from a fresh note enumeration and
    /// persist the graph when a path is set.
    pub fn sync(&mut self) -> EngramResult<SyncStats> {
        let snapshot = self.store.all()?;
        self.graph = GraphIndex::from_neuronas(&snapshot);
        self.text = TextIndex::build(&snapshot);

        if let Some(path) = &self.graph_path {
            self.graph.save(path)?;
        }

        if let Some(vectors) = self.vectors.as_mut() {
            let live: HashSet<&str> = snapshot.iter().map(|n| n.id.as_str()).collect();
            let stale: Vec<String> = vectors
                .index()
                .document_ids()
                .filter(|id| !live.contains(id))
                .map(str::to_string)
                .collect();
            for id in stale {
                vectors.remove_document(&id)?;
            }
        }

        let stats = SyncStats {
            neuronas: snapshot.len(),
            edges: self.graph.edge_count(),
            text_documents: self.text.len(),
        };
        info!(
            neuronas = stats.neuronas,
            edges = stats.edges,
            "Synchronized indices"
        );
        Ok(stats)
    }

    /// Mode used when the caller does not pick one.
    pub fn default_mode(query: &str) -> QueryMode {
        if eql::looks_like_eql(query) {
            QueryMode::Filter
        } else {
            QueryMode::Text
        }
    }

    /// Run a query. `limit` defaults to `query.default_limit` and is applied
    /// after full ranking.
    pub fn query(
        &mut self,
        query: &str,
        mode: Option<QueryMode>,
        limit: Option<usize>,
    ) -> EngramResult<Vec<QueryResult>> {
        let mode = mode.unwrap_or_else(|| Self::default_mode(query));
        let limit = limit.unwrap_or(self.config.query.default_limit);
        debug!(query = %query, mode = %mode, limit, "Running query");

        let mut results = match mode {
            QueryMode::Filter => self.filter(query)?,
            QueryMode::Text => ranked(self.text.search(query), MatchReason::Text),
            QueryMode::Vector => {
                let hits = self.vector_hits(query)?.ok_or_else(|| self.missing_vectors())?;
                ranked(hits, MatchReason::Vector)
            }
            QueryMode::Hybrid => self.hybrid(query)?,
            QueryMode::Activation => {
                let seeds = normalize(&self.text.search(query));
                self.activate(&seeds)
            }
        };

        let total = results.len();
        results.truncate(limit);
        debug!(mode = %mode, total, returned = results.len(), "Query finished");
        Ok(results)
    }

    fn filter(&self, query: &str) -> EngramResult<Vec<QueryResult>> {
        let expr = eql::parse(query)?;
        let mut matched: Vec<QueryResult> = self
            .store
            .all()?
            .iter()
            .filter(|n| filter::matches(&expr, n))
            .map(|n| QueryResult::new(n.id.clone(), 1.0, MatchReason::Filter))
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }

    fn missing_vectors(&self) -> EngramError {
        EngramError::MissingIndex {
            path: self.vectors_path.clone(),
            hint: VECTOR_HINT.to_string(),
        }
    }

    /// Vector hits, or `None` when there is no vector index.
    ///
    /// Document vectors missing or stale for the current snapshot are
    /// computed first, persisted according to the strategy.
    fn vector_hits(&mut self, query: &str) -> EngramResult<Option<Vec<(String, f64)>>> {
        let Some(vectors) = self.vectors.as_mut() else {
            return Ok(None);
        };

        let snapshot = self.store.all()?;
        let mut computed = 0usize;
        for n in &snapshot {
            match vectors.ensure_document(&n.id, &n.content)? {
                EnsureOutcome::Cached | EnsureOutcome::Persisted => computed += 1,
                EnsureOutcome::Unchanged | EnsureOutcome::Unresolvable => {}
            }
        }
        if computed > 0 {
            debug!(computed, strategy = %vectors.strategy(), "Refreshed document vectors");
        }

        let live: HashSet<&str> = snapshot.iter().map(|n| n.id.as_str()).collect();
        let hits = vectors
            .index()
            .search_text(query)?
            .into_iter()
            .filter(|(id, _)| live.contains(id.as_str()))
            .collect();
        Ok(Some(hits))
    }

    fn hybrid(&mut self, query: &str) -> EngramResult<Vec<QueryResult>> {
        let text = self.text.search(query);
        let vector = match self.vector_hits(query)? {
            Some(hits) => hits,
            None => {
                warn!(query = %query, "No vector index, hybrid falls back to text scores");
                Vec::new()
            }
        };
        let merged = merge_hybrid(&text, &vector, &self.config.hybrid);

        if self.config.hybrid.activate {
            Ok(self.activate(&normalize(&merged)))
        } else {
            Ok(ranked(merged, MatchReason::Hybrid))
        }
    }

    fn activate(&self, seeds: &[(String, f64)]) -> Vec<QueryResult> {
        self.activation
            .run(&self.graph, seeds)
            .into_iter()
            .map(|a| {
                let reason = MatchReason::from_activation(&a.source);
                QueryResult::new(a.id, a.score, reason)
            })
            .collect()
    }

    /// Dependency trace from `id` over the graph index.
    pub fn trace(&self, id: &str, max_depth: usize) -> Vec<TraceStep> {
        self.graph.trace(id, max_depth)
    }

    /// Load each result's Neurona, optionally summarizing its content.
    ///
    /// Only the given results are fetched; ids no longer in the store are
    /// skipped. Summaries read the body through [`NoteStore::content`].
    pub fn hydrate(
        &self,
        results: &[QueryResult],
        summarize: Option<&Summarize<'_>>,
    ) -> EngramResult<Vec<HydratedResult>> {
        hydrate(results, self.store.as_ref(), summarize)
    }
}

/// Hydrate `results` from `store`. See [`QueryEngine::hydrate`].
pub fn hydrate(
    results: &[QueryResult],
    store: &dyn NoteStore,
    summarize: Option<&Summarize<'_>>,
) -> EngramResult<Vec<HydratedResult>> {
    let mut hydrated = Vec::with_capacity(results.len());
    for r in results {
        let Some(neurona) = store.get(&r.id)? else {
            warn!(id = %r.id, "Result no longer in note store");
            continue;
        };
        let summary = match summarize {
            Some(s) => match store.content(&r.id)? {
                Some(body) => Some(s.summarizer.summarize(&body, s.strategy, s.token_budget)?),
                None => None,
            },
            None => None,
        };
        hydrated.push(HydratedResult {
            id: r.id.clone(),
            score: r.score,
            reason: r.reason,
            neurona,
            summary,
        });
    }
    Ok(hydrated)
}

fn ranked(mut hits: Vec<(String, f64)>, reason: MatchReason) -> Vec<QueryResult> {
    sort_ranked(&mut hits);
    hits.into_iter()
        .map(|(id, score)| QueryResult::new(id, score, reason))
        .collect()
}
