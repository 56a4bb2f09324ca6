//! Neurona models
//!
//! A Neurona is a single knowledge node (requirement, issue, test case...)
//! with typed metadata and outgoing weighted connections. The note store
//! owns them; the retrieval core reads snapshots only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::context::{FieldValue, NeuronaContext};

/// Weight used for propagation when a connection carries none (Tier 1/2 link).
pub const DEFAULT_CONNECTION_WEIGHT: u8 = 50;

// ============================================================================
// Core Enums
// ============================================================================

/// Type of a Neurona
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NeuronaType {
    Concept,
    Requirement,
    TestCase,
    Issue,
    Artifact,
    StateMachine,
    Reference,
    Lesson,
    Custom,
    #[default]
    None,
}

impl fmt::Display for NeuronaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concept => write!(f, "concept"),
            Self::Requirement => write!(f, "requirement"),
            Self::TestCase => write!(f, "test_case"),
            Self::Issue => write!(f, "issue"),
            Self::Artifact => write!(f, "artifact"),
            Self::StateMachine => write!(f, "state_machine"),
            Self::Reference => write!(f, "reference"),
            Self::Lesson => write!(f, "lesson"),
            Self::Custom => write!(f, "custom"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for NeuronaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concept" => Ok(Self::Concept),
            "requirement" => Ok(Self::Requirement),
            "test_case" => Ok(Self::TestCase),
            "issue" => Ok(Self::Issue),
            "artifact" => Ok(Self::Artifact),
            "state_machine" => Ok(Self::StateMachine),
            "reference" => Ok(Self::Reference),
            "lesson" => Ok(Self::Lesson),
            "custom" => Ok(Self::Custom),
            "none" => Ok(Self::None),
            _ => Err(format!("Unknown neurona type: {}", s)),
        }
    }
}

/// Type of a directed connection between two Neuronas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Parent,
    Child,
    Validates,
    ValidatedBy,
    Blocks,
    BlockedBy,
    Implements,
    ImplementedBy,
    Tests,
    TestedBy,
    RelatesTo,
    Prerequisite,
    Next,
    Related,
    Opposes,
}

impl ConnectionType {
    /// All connection types, in wire-code order.
    pub const ALL: [ConnectionType; 15] = [
        Self::Parent,
        Self::Child,
        Self::Validates,
        Self::ValidatedBy,
        Self::Blocks,
        Self::BlockedBy,
        Self::Implements,
        Self::ImplementedBy,
        Self::Tests,
        Self::TestedBy,
        Self::RelatesTo,
        Self::Prerequisite,
        Self::Next,
        Self::Related,
        Self::Opposes,
    ];

    /// Stable one-byte code used by the binary graph index.
    pub fn code(&self) -> u8 {
        Self::ALL
            .iter()
            .position(|t| t == self)
            .map(|p| p as u8)
            .unwrap_or(u8::MAX)
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Validates => "validates",
            Self::ValidatedBy => "validated_by",
            Self::Blocks => "blocks",
            Self::BlockedBy => "blocked_by",
            Self::Implements => "implements",
            Self::ImplementedBy => "implemented_by",
            Self::Tests => "tests",
            Self::TestedBy => "tested_by",
            Self::RelatesTo => "relates_to",
            Self::Prerequisite => "prerequisite",
            Self::Next => "next",
            Self::Related => "related",
            Self::Opposes => "opposes",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|t| t.to_string() == wanted)
            .copied()
            .ok_or_else(|| format!("Unknown connection type: {}", s))
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A typed, optionally weighted, directed edge to another Neurona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_type: ConnectionType,
    pub target_id: String,
    /// Weight in [0, 100]. `None` or `Some(0)` is a bare structural link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u8>,
}

impl Connection {
    pub fn new(connection_type: ConnectionType, target_id: impl Into<String>) -> Self {
        Self {
            connection_type,
            target_id: target_id.into(),
            weight: None,
        }
    }

    pub fn weighted(
        connection_type: ConnectionType,
        target_id: impl Into<String>,
        weight: u8,
    ) -> Self {
        Self {
            connection_type,
            target_id: target_id.into(),
            weight: Some(weight.min(100)),
        }
    }

    /// Weight used for propagation: absent or zero falls back to 50.
    pub fn effective_weight(&self) -> u8 {
        effective_weight(self.weight)
    }
}

/// Resolve a raw connection weight to the one used for propagation.
pub fn effective_weight(weight: Option<u8>) -> u8 {
    match weight {
        None | Some(0) => DEFAULT_CONNECTION_WEIGHT,
        Some(w) => w.min(100),
    }
}

// ============================================================================
// Neurona
// ============================================================================

/// A knowledge node as enumerated by the note store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neurona {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub neurona_type: NeuronaType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub context: NeuronaContext,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Raw body text. Used for document vectors and hydration only.
    #[serde(default)]
    pub content: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl Neurona {
    pub fn new(id: impl Into<String>, title: impl Into<String>, neurona_type: NeuronaType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            neurona_type,
            tags: Vec::new(),
            language: default_language(),
            context: NeuronaContext::None,
            connections: Vec::new(),
            content: String::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.add_tag(tag);
        }
        self
    }

    pub fn with_context(mut self, context: NeuronaContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Add a tag, keeping insertion order and ignoring duplicates.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Resolve a filter field to a value.
    ///
    /// Supports direct attributes, `context.<name>` and the `state` /
    /// `priority` shorthands. Returns `None` for unknown fields.
    pub fn field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Text(self.id.clone())),
            "title" => Some(FieldValue::Text(self.title.clone())),
            "type" => Some(FieldValue::Text(self.neurona_type.to_string())),
            "language" => Some(FieldValue::Text(self.language.clone())),
            "tag" | "tags" => Some(FieldValue::List(self.tags.clone())),
            "state" => self.context.field("status"),
            "priority" => self.context.field("priority"),
            other => other
                .strip_prefix("context.")
                .and_then(|name| self.context.field(name)),
        }
    }

    /// True when this Neurona has an outgoing connection of the given type to `target_id`.
    pub fn has_link(&self, connection_type: ConnectionType, target_id: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.connection_type == connection_type && c.target_id == target_id)
    }
}
