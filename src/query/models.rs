//! Query modes and result types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::activation::ActivationSource;
use crate::neurona::Neurona;

/// Retrieval strategy for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Boolean EQL evaluation, unranked.
    Filter,
    /// BM25 over title and tag tokens.
    Text,
    /// Cosine similarity of averaged word vectors.
    Vector,
    /// Weighted merge of text and vector scores.
    Hybrid,
    /// Text matches as seeds, re-ranked by spreading activation.
    Activation,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::Text => write!(f, "text"),
            Self::Vector => write!(f, "vector"),
            Self::Hybrid => write!(f, "hybrid"),
            Self::Activation => write!(f, "activation"),
        }
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "filter" | "eql" => Ok(Self::Filter),
            "text" | "keyword" => Ok(Self::Text),
            "vector" | "semantic" => Ok(Self::Vector),
            "hybrid" => Ok(Self::Hybrid),
            "activation" | "neural" => Ok(Self::Activation),
            _ => Err(format!("Unknown query mode: {}", s)),
        }
    }
}

/// Why a result is in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    Filter,
    Text,
    Vector,
    Hybrid,
    /// Seeded directly into the activation engine.
    Activation,
    /// Reached through graph propagation.
    Propagated,
}

impl MatchReason {
    pub(crate) fn from_activation(source: &ActivationSource) -> Self {
        match source {
            ActivationSource::Direct => Self::Activation,
            ActivationSource::Propagated { .. } => Self::Propagated,
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Filter => "filter",
            Self::Text => "text",
            Self::Vector => "vector",
            Self::Hybrid => "hybrid",
            Self::Activation => "activation",
            Self::Propagated => "propagated",
        };
        write!(f, "{}", s)
    }
}

/// One ranked id. Filter results all score 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub score: f64,
    pub reason: MatchReason,
}

impl QueryResult {
    pub fn new(id: impl Into<String>, score: f64, reason: MatchReason) -> Self {
        Self {
            id: id.into(),
            score,
            reason,
        }
    }
}

/// A result after lazy hydration from the note store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedResult {
    pub id: String,
    pub score: f64,
    pub reason: MatchReason,
    pub neurona: Neurona,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_and_display() {
        for mode in [
            QueryMode::Filter,
            QueryMode::Text,
            QueryMode::Vector,
            QueryMode::Hybrid,
            QueryMode::Activation,
        ] {
            assert_eq!(mode.to_string().parse::<QueryMode>().unwrap(), mode);
        }
        assert_eq!("EQL".parse::<QueryMode>().unwrap(), QueryMode::Filter);
        assert!("fuzzy".parse::<QueryMode>().is_err());
    }

    #[test]
    fn test_result_json_shape() {
        let r = QueryResult::new("req.1", 0.5, MatchReason::Propagated);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["reason"], "propagated");
        assert_eq!(json["id"], "req.1");
    }
}
