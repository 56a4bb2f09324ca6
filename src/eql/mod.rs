//! EQL, the Engram filter query language.
//!
//! ```text
//! type:requirement AND tag:sensor
//! priority:gte:3 && context.assignee:alice
//! (type:test_case OR type:issue) AND link(validates, req.auth)
//! ```
//!
//! Parsing produces a [`FilterExpression`]; evaluation against Neuronas
//! lives in the query engine.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    ComparisonOp, FilterCondition, FilterExpression, FilterTerm, LinkCondition, LogicalOp,
};
pub use parser::{looks_like_eql, parse, resolve_field};
