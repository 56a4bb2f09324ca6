//! Filter expression tree produced by the EQL parser.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::neurona::ConnectionType;

/// Operator joining the terms of one expression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// Comparison in a `field:op:value` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    #[default]
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    NotContains,
}

impl ComparisonOp {
    /// Whether the operator compares numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Gte | Self::Lte)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ComparisonOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "neq" | "ne" => Ok(Self::Neq),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" | "ge" => Ok(Self::Gte),
            "lte" | "le" => Ok(Self::Lte),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            _ => Err(format!("Unknown comparison operator: {}", s)),
        }
    }
}

/// `field:op:value`. The field is stored resolved (aliases expanded,
/// lowercased).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: ComparisonOp,
    pub value: String,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, op: ComparisonOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// `link(type, target)`: the node has an outgoing edge of this type to target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCondition {
    pub connection_type: ConnectionType,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterTerm {
    Condition(FilterCondition),
    Link(LinkCondition),
    Group(FilterExpression),
}

/// One uniform operator applied to an ordered list of terms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterExpression {
    pub operator: LogicalOp,
    pub terms: Vec<FilterTerm>,
}

impl FilterExpression {
    pub fn new(operator: LogicalOp, terms: Vec<FilterTerm>) -> Self {
        Self { operator, terms }
    }

    /// Number of leaf conditions (condition or link), nested groups included.
    pub fn condition_count(&self) -> usize {
        self.terms
            .iter()
            .map(|t| match t {
                FilterTerm::Group(g) => g.condition_count(),
                _ => 1,
            })
            .sum()
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.operator)?;
            }
            match term {
                FilterTerm::Condition(c) => {
                    write!(f, "{}:{}:{}", c.field, c.op, quote_if_needed(&c.value))?
                }
                FilterTerm::Link(l) => write!(f, "link({}, {})", l.connection_type, l.target_id)?,
                FilterTerm::Group(g) => write!(f, "({})", g)?,
            }
        }
        Ok(())
    }
}

fn quote_if_needed(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | ':' | '"' | '\''));
    if plain {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
