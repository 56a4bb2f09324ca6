//! Query engine tests over a small in-memory cortex.
//!
//! Run with: cargo test --test query_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use engram_cortex::neurona::{ContentSummarizer, MemoryNoteStore};
use engram_cortex::query::Summarize;
use engram_cortex::vectors::{PersistenceStrategy, VectorIndex, VectorStore};
use engram_cortex::{
    Connection, ConnectionType, EngramConfig, EngramError, MatchReason, Neurona, NeuronaType,
    NoteStore, QueryEngine, QueryMode,
};

// ============================================================================
// Fixture
// ============================================================================

fn fixture() -> Vec<Neurona> {
    vec![
        Neurona::new("req.temp", "Temperature sensor range", NeuronaType::Requirement)
            .with_tags(["sensor", "hardware"])
            .with_content("temperature sensor range accuracy"),
        Neurona::new("req.pressure", "Pressure sensor calibration", NeuronaType::Requirement)
            .with_tags(["sensor"])
            .with_connection(Connection::weighted(ConnectionType::Next, "req.display", 60))
            .with_content("pressure sensor calibration"),
        Neurona::new("req.display", "Display refresh rate", NeuronaType::Requirement)
            .with_tags(["ui"])
            .with_content("display refresh"),
        Neurona::new("issue.drift", "Sensor drift under load", NeuronaType::Issue)
            .with_tags(["sensor"])
            .with_connection(Connection::weighted(ConnectionType::Blocks, "req.temp", 100))
            .with_content("sensor drift"),
        Neurona::new("test.temp", "Temperature range test", NeuronaType::TestCase)
            .with_tags(["qa"])
            .with_connection(Connection::new(ConnectionType::Tests, "req.temp"))
            .with_content("temperature range test"),
    ]
}

/// Note store that counts single-note fetches. `get` returns headers only;
/// bodies come from `content`.
struct CountingStore {
    inner: MemoryNoteStore,
    gets: AtomicUsize,
    contents: AtomicUsize,
}

impl NoteStore for CountingStore {
    fn all(&self) -> anyhow::Result<Vec<Neurona>> {
        self.inner.all()
    }

    fn get(&self, id: &str) -> anyhow::Result<Option<Neurona>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.get(id)?.map(|n| n.with_content("")))
    }

    fn content(&self, id: &str) -> anyhow::Result<Option<String>> {
        self.contents.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.get(id)?.map(|n| n.content))
    }
}

fn counting_store() -> Arc<CountingStore> {
    Arc::new(CountingStore {
        inner: MemoryNoteStore::with_neuronas(fixture()),
        gets: AtomicUsize::new(0),
        contents: AtomicUsize::new(0),
    })
}

fn engine() -> QueryEngine {
    let store = Arc::new(MemoryNoteStore::with_neuronas(fixture()));
    let mut engine = QueryEngine::new(store, EngramConfig::default());
    engine.sync().unwrap();
    engine
}

fn word_vectors() -> VectorIndex {
    let mut idx = VectorIndex::new();
    idx.insert_word("temperature", vec![1.0, 0.0, 0.0]).unwrap();
    idx.insert_word("sensor", vec![0.0, 1.0, 0.0]).unwrap();
    idx.insert_word("pressure", vec![0.0, 0.0, 1.0]).unwrap();
    idx.insert_word("display", vec![-1.0, 0.0, 0.0]).unwrap();
    idx
}

fn ids(results: &[engram_cortex::QueryResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

// ============================================================================
// Filter mode
// ============================================================================

#[test]
fn test_filter_and_returns_exact_intersection() {
    let mut engine = engine();
    let results = engine
        .query("type:requirement AND tag:sensor", None, Some(100))
        .unwrap();
    assert_eq!(ids(&results), vec!["req.pressure", "req.temp"]);
    assert!(results
        .iter()
        .all(|r| r.score == 1.0 && r.reason == MatchReason::Filter));
}

#[test]
fn test_filter_or_returns_union() {
    let mut engine = engine();
    let results = engine
        .query("type:requirement OR type:issue", Some(QueryMode::Filter), Some(100))
        .unwrap();
    assert_eq!(
        ids(&results),
        vec!["issue.drift", "req.display", "req.pressure", "req.temp"]
    );
}

#[test]
fn test_filter_link_condition() {
    let mut engine = engine();
    let results = engine
        .query("link(blocks, req.temp) OR link(tests, req.temp)", None, None)
        .unwrap();
    assert_eq!(ids(&results), vec!["issue.drift", "test.temp"]);
}

#[test]
fn test_parse_error_surfaces_in_filter_mode() {
    let mut engine = engine();
    let err = engine
        .query("type:requirement AND", Some(QueryMode::Filter), None)
        .unwrap_err();
    assert!(matches!(err, EngramError::Parse { .. }));
}

// ============================================================================
// Mode selection, text, limit
// ============================================================================

#[test]
fn test_default_mode_selection() {
    assert_eq!(QueryEngine::default_mode("tag:sensor"), QueryMode::Filter);
    assert_eq!(QueryEngine::default_mode("temperature sensor"), QueryMode::Text);

    let mut engine = engine();
    let results = engine.query("temperature", None, None).unwrap();
    assert!(results.iter().all(|r| r.reason == MatchReason::Text));
    assert!(ids(&results).contains(&"req.temp"));
}

#[test]
fn test_limit_applies_after_ranking() {
    let mut engine = engine();
    let all = engine.query("sensor temperature", Some(QueryMode::Text), Some(100)).unwrap();
    let top = engine.query("sensor temperature", Some(QueryMode::Text), Some(2)).unwrap();
    assert!(all.len() > 2);
    assert_eq!(top, all[..2].to_vec());
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
}

// ============================================================================
// Vector and hybrid
// ============================================================================

#[test]
fn test_vector_mode_requires_index() {
    let mut engine = engine();
    let err = engine
        .query("temperature", Some(QueryMode::Vector), None)
        .unwrap_err();
    match err {
        EngramError::MissingIndex { hint, .. } => assert!(hint.contains("embeddings")),
        other => panic!("expected MissingIndex, got {:?}", other),
    }
}

#[test]
fn test_vector_mode_computes_document_vectors_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let vectors = VectorStore::new(
        word_vectors(),
        dir.path().join("vectors.bin"),
        PersistenceStrategy::Lazy,
    );
    let store = Arc::new(MemoryNoteStore::with_neuronas(fixture()));
    let mut engine = QueryEngine::new(store, EngramConfig::default()).with_vectors(vectors);
    engine.sync().unwrap();

    let results = engine
        .query("temperature", Some(QueryMode::Vector), None)
        .unwrap();
    assert_eq!(results[0].id, "test.temp");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[0].reason, MatchReason::Vector);
    assert_eq!(engine.vectors().unwrap().index().document_count(), 5);
    assert!(!dir.path().join("vectors.bin").exists());
}

/// Note store whose notes can be edited between queries.
struct EditableStore(RwLock<MemoryNoteStore>);

impl NoteStore for EditableStore {
    fn all(&self) -> anyhow::Result<Vec<Neurona>> {
        self.0.read().unwrap().all()
    }

    fn get(&self, id: &str) -> anyhow::Result<Option<Neurona>> {
        self.0.read().unwrap().get(id)
    }
}

#[test]
fn test_vector_results_drop_notes_without_known_tokens() {
    let store = Arc::new(EditableStore(RwLock::new(MemoryNoteStore::with_neuronas([
        Neurona::new("n1", "Sensor note", NeuronaType::Concept).with_content("sensor"),
    ]))));
    let dir = tempfile::tempdir().unwrap();
    let vectors = VectorStore::new(
        word_vectors(),
        dir.path().join("vectors.bin"),
        PersistenceStrategy::Lazy,
    );
    let mut engine = QueryEngine::new(store.clone(), EngramConfig::default()).with_vectors(vectors);
    engine.sync().unwrap();

    let before = engine.query("sensor", Some(QueryMode::Vector), None).unwrap();
    assert_eq!(ids(&before), vec!["n1"]);

    store.0.write().unwrap().insert(
        Neurona::new("n1", "Sensor note", NeuronaType::Concept).with_content("nothing known here"),
    );
    let after = engine.query("sensor", Some(QueryMode::Vector), None).unwrap();
    assert!(after.is_empty(), "{:?}", after);
    assert!(engine.vectors().unwrap().index().document("n1").is_none());
}

#[test]
fn test_hybrid_without_vectors_falls_back_to_text() {
    let mut engine = engine();
    let text = engine.query("sensor", Some(QueryMode::Text), Some(100)).unwrap();
    let hybrid = engine.query("sensor", Some(QueryMode::Hybrid), Some(100)).unwrap();
    assert_eq!(ids(&hybrid), ids(&text));
    assert!(hybrid.iter().all(|r| r.reason == MatchReason::Hybrid));
    assert!((hybrid[0].score - 0.6).abs() < 1e-9);
}

#[test]
fn test_hybrid_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let vectors = VectorStore::new(
        word_vectors(),
        dir.path().join("vectors.bin"),
        PersistenceStrategy::Lazy,
    );
    let store = Arc::new(MemoryNoteStore::with_neuronas(fixture()));
    let mut engine = QueryEngine::new(store, EngramConfig::default()).with_vectors(vectors);
    engine.sync().unwrap();

    let first = engine
        .query("temperature sensor", Some(QueryMode::Hybrid), Some(100))
        .unwrap();
    assert!(!first.is_empty());
    for _ in 0..5 {
        let again = engine
            .query("temperature sensor", Some(QueryMode::Hybrid), Some(100))
            .unwrap();
        assert_eq!(again, first);
    }
    for pair in first.windows(2) {
        assert!(
            pair[0].score > pair[1].score
                || (pair[0].score == pair[1].score && pair[0].id < pair[1].id)
        );
    }
}

// ============================================================================
// Activation
// ============================================================================

#[test]
fn test_activation_mode_surfaces_linked_nodes() {
    let mut engine = engine();
    let results = engine
        .query("calibration", Some(QueryMode::Activation), None)
        .unwrap();
    assert_eq!(ids(&results), vec!["req.pressure", "req.display"]);
    assert_eq!(results[0].reason, MatchReason::Activation);
    assert_eq!(results[0].score, 1.0);
    assert_eq!(results[1].reason, MatchReason::Propagated);
    assert!((results[1].score - 0.6).abs() < 1e-9);
}

#[test]
fn test_hybrid_with_activation() {
    let store = Arc::new(MemoryNoteStore::with_neuronas(fixture()));
    let mut config = EngramConfig::default();
    config.hybrid.activate = true;
    let mut engine = QueryEngine::new(store, config);
    engine.sync().unwrap();

    let results = engine
        .query("drift", Some(QueryMode::Hybrid), None)
        .unwrap();
    // issue.drift blocks req.temp at full weight
    assert_eq!(ids(&results), vec!["issue.drift", "req.temp"]);
    assert_eq!(results[1].reason, MatchReason::Propagated);
    assert!(results.iter().all(|r| r.score >= 0.1 && r.score <= 1.0));
}

// ============================================================================
// Hydration and trace
// ============================================================================

struct Truncate;

impl ContentSummarizer for Truncate {
    fn summarize(&self, content: &str, strategy: &str, token_budget: usize) -> anyhow::Result<String> {
        assert_eq!(strategy, "head");
        Ok(content.split_whitespace().take(token_budget).collect::<Vec<_>>().join(" "))
    }
}

#[test]
fn test_hydration_only_fetches_kept_results() {
    let store = counting_store();
    let mut engine = QueryEngine::new(store.clone(), EngramConfig::default());
    engine.sync().unwrap();

    let results = engine.query("tag:sensor", None, Some(2)).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    assert_eq!(store.contents.load(Ordering::SeqCst), 0);

    let plain = engine.hydrate(&results, None).unwrap();
    assert_eq!(plain.len(), 2);
    assert!(plain.iter().all(|h| h.summary.is_none()));
    assert_eq!(store.contents.load(Ordering::SeqCst), 0);
    store.gets.store(0, Ordering::SeqCst);

    let summarize = Summarize {
        summarizer: &Truncate,
        strategy: "head",
        token_budget: 1,
    };
    let hydrated = engine.hydrate(&results, Some(&summarize)).unwrap();
    assert_eq!(store.gets.load(Ordering::SeqCst), 2);
    assert_eq!(store.contents.load(Ordering::SeqCst), 2);
    assert_eq!(hydrated[0].id, "issue.drift");
    assert_eq!(hydrated[0].neurona.title, "Sensor drift under load");
    assert_eq!(hydrated[0].summary.as_deref(), Some("sensor"));
}

#[test]
fn test_trace_follows_outgoing_connections() {
    let engine = engine();
    let steps = engine.trace("test.temp", 3);
    let reached: Vec<(&str, usize)> = steps.iter().map(|s| (s.id.as_str(), s.level)).collect();
    assert_eq!(reached, vec![("req.temp", 1)]);

    let steps = engine.trace("issue.drift", 3);
    assert_eq!(steps[0].connection_type, ConnectionType::Blocks);
}
