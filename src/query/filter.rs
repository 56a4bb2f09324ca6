//! EQL evaluation against Neuronas.
//!
//! Text comparisons are case-insensitive. For list fields (tags), `eq`
//! and `contains` match when any element does; `neq` and `not_contains`
//! are their negations. A numeric operator on a non-numeric value fails
//! that one condition, which then counts as a non-match.

use std::cmp::Ordering;

use tracing::debug;

use crate::eql::{ComparisonOp, FilterCondition, FilterExpression, FilterTerm, LogicalOp};
use crate::error::{EngramError, EngramResult};
use crate::neurona::{FieldValue, Neurona};

/// True when `neurona` satisfies `expr`.
pub fn matches(expr: &FilterExpression, neurona: &Neurona) -> bool {
    let mut results = expr.terms.iter().map(|term| matches_term(term, neurona));
    match expr.operator {
        LogicalOp::And => results.all(|m| m),
        LogicalOp::Or => results.any(|m| m),
    }
}

fn matches_term(term: &FilterTerm, neurona: &Neurona) -> bool {
    match term {
        FilterTerm::Condition(condition) => match evaluate_condition(condition, neurona) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(id = %neurona.id, error = %e, "Condition treated as non-match");
                false
            }
        },
        FilterTerm::Link(link) => neurona.has_link(link.connection_type, &link.target_id),
        FilterTerm::Group(group) => matches(group, neurona),
    }
}

/// Evaluate one condition. Unknown fields are `Ok(false)`; numeric
/// operators on non-numeric operands are `InvalidComparison`.
pub fn evaluate_condition(condition: &FilterCondition, neurona: &Neurona) -> EngramResult<bool> {
    let Some(actual) = neurona.field(&condition.field) else {
        return Ok(false);
    };
    let wanted = condition.value.as_str();

    if condition.op.is_numeric() {
        let invalid = || EngramError::InvalidComparison {
            field: condition.field.clone(),
            operator: condition.op.to_string(),
            value: condition.value.clone(),
        };
        let lhs = actual.as_number().ok_or_else(invalid)?;
        let rhs: f64 = wanted.trim().parse().map_err(|_| invalid())?;
        let ord = lhs.partial_cmp(&rhs).ok_or_else(invalid)?;
        return Ok(match condition.op {
            ComparisonOp::Gt => ord == Ordering::Greater,
            ComparisonOp::Gte => ord != Ordering::Less,
            ComparisonOp::Lt => ord == Ordering::Less,
            ComparisonOp::Lte => ord != Ordering::Greater,
            _ => false,
        });
    }

    let matched = match condition.op {
        ComparisonOp::Eq => equals(&actual, wanted),
        ComparisonOp::Neq => !equals(&actual, wanted),
        ComparisonOp::Contains => contains(&actual, wanted),
        ComparisonOp::NotContains => !contains(&actual, wanted),
        _ => false,
    };
    Ok(matched)
}

fn equals(actual: &FieldValue, wanted: &str) -> bool {
    match actual {
        FieldValue::Text(s) => s.to_lowercase() == wanted.to_lowercase(),
        FieldValue::Number(n) => match wanted.trim().parse::<f64>() {
            Ok(w) => *n == w,
            Err(_) => n.to_string() == wanted,
        },
        FieldValue::List(items) => items.iter().any(|i| i.to_lowercase() == wanted.to_lowercase()),
    }
}

fn contains(actual: &FieldValue, wanted: &str) -> bool {
    let needle = wanted.to_lowercase();
    match actual {
        FieldValue::Text(s) => s.to_lowercase().contains(&needle),
        FieldValue::Number(n) => n.to_string().contains(&needle),
        FieldValue::List(items) => items.iter().any(|i| i.to_lowercase().contains(&needle)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eql::parse;
    use crate::neurona::{Connection, ConnectionType, NeuronaContext, NeuronaType};

    fn requirement() -> Neurona {
        Neurona::new("req.temp", "Temperature Sensor Range", NeuronaType::Requirement)
            .with_tags(["sensor", "hardware"])
            .with_context(NeuronaContext::Requirement {
                status: Some("approved".into()),
                verification_method: None,
                priority: Some(2),
                assignee: Some("alice".into()),
                effort_points: None,
                sprint: None,
            })
            .with_connection(Connection::weighted(ConnectionType::Implements, "feat.io", 80))
    }

    fn eval(query: &str) -> bool {
        matches(&parse(query).unwrap(), &requirement())
    }

    #[test]
    fn test_direct_fields() {
        assert!(eval("type:requirement"));
        assert!(eval("type:Requirement"));
        assert!(!eval("type:issue"));
        assert!(eval("id:req.temp"));
        assert!(eval("language:en"));
        assert!(eval("title:contains:sensor"));
        assert!(eval("title:not_contains:pressure"));
    }

    #[test]
    fn test_tag_list_semantics() {
        assert!(eval("tag:sensor"));
        assert!(eval("tags:HARDWARE"));
        assert!(!eval("tag:sens"));
        assert!(eval("tag:contains:sens"));
        assert!(eval("tag:neq:software"));
        assert!(!eval("tag:neq:sensor"));
    }

    #[test]
    fn test_context_fields_and_aliases() {
        assert!(eval("state:approved"));
        assert!(eval("context.assignee:alice"));
        assert!(eval("priority:2"));
        assert!(eval("priority:lte:2 AND priority:gt:1"));
        assert!(!eval("priority:gt:2"));
    }

    #[test]
    fn test_unknown_field_never_matches() {
        assert!(!eval("context.nonexistent:x"));
        assert!(!eval("color:neq:red"));
        assert!(eval("color:red OR type:requirement"));
    }

    #[test]
    fn test_numeric_operator_on_text_is_invalid_comparison() {
        let expr = parse("title:gt:5").unwrap();
        let FilterTerm::Condition(c) = &expr.terms[0] else {
            panic!("expected condition");
        };
        assert!(matches!(
            evaluate_condition(c, &requirement()),
            Err(EngramError::InvalidComparison { .. })
        ));
        // only that condition fails; the rest of the query still evaluates
        assert!(eval("title:gt:5 OR tag:sensor"));
        assert!(!eval("priority:gt:abc"));
    }

    #[test]
    fn test_links_and_groups() {
        assert!(eval("link(implements, feat.io)"));
        assert!(!eval("link(implements, feat.other)"));
        assert!(eval("(type:issue OR type:requirement) AND link(implements, feat.io)"));
        assert!(!eval("type:requirement AND (tag:ui OR tag:display)"));
    }
}
