//! Recursive-descent EQL parser.
//!
//! ```text
//! query     := expr EOF
//! expr      := term { op term }          one operator per level
//! term      := "(" expr ")" | link | condition
//! link      := "link" "(" word "," word ")"
//! condition := field ":" value | field ":" operator ":" value
//! ```
//!
//! Every pair of terms needs an explicit operator. AND and OR cannot be
//! mixed on one level; parentheses are required to combine them.

use tracing::trace;

use crate::error::{EngramError, EngramResult};
use crate::neurona::ConnectionType;

use super::ast::{
    ComparisonOp, FilterCondition, FilterExpression, FilterTerm, LinkCondition, LogicalOp,
};
use super::lexer::{tokenize, Token, TokenKind};

/// Parse an EQL query into a filter expression.
pub fn parse(input: &str) -> EngramResult<FilterExpression> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };

    if parser.peek().kind == TokenKind::Eof {
        return Err(parser.error_here("empty query"));
    }
    let expr = parser.expression()?;
    let next = parser.peek();
    match next.kind {
        TokenKind::Eof => {}
        TokenKind::RParen => return Err(parser.error_here("unmatched ')'")),
        _ => return Err(parser.error_here(&format!("unexpected {}", next.kind))),
    }
    trace!(query = %input, conditions = expr.condition_count(), "Parsed EQL query");
    Ok(expr)
}

/// True when `input` is a syntactically valid EQL query.
pub fn looks_like_eql(input: &str) -> bool {
    parse(input).is_ok()
}

/// Canonical field name: lowercased, shorthands expanded.
pub fn resolve_field(field: &str) -> String {
    let lower = field.to_lowercase();
    match lower.as_str() {
        "tags" => "tag".to_string(),
        "state" | "status" => "context.status".to_string(),
        "priority" => "context.priority".to_string(),
        _ => lower,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // the token list always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, position: usize, message: &str) -> EngramError {
        EngramError::Parse {
            position,
            message: message.to_string(),
        }
    }

    fn error_here(&self, message: &str) -> EngramError {
        self.error_at(self.peek().position, message)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> EngramResult<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!(
                "expected {} {}, found {}",
                kind,
                context,
                self.peek().kind
            )))
        }
    }

    fn expression(&mut self) -> EngramResult<FilterExpression> {
        let mut terms = vec![self.term()?];
        let mut operator: Option<LogicalOp> = None;

        loop {
            let token = self.peek().clone();
            let op = match token.kind {
                TokenKind::And => {
                    self.advance();
                    LogicalOp::And
                }
                TokenKind::Or => {
                    self.advance();
                    LogicalOp::Or
                }
                TokenKind::Word(_) | TokenKind::Quoted(_) | TokenKind::LParen => {
                    return Err(
                        self.error_at(token.position, "missing AND/OR between conditions")
                    );
                }
                TokenKind::Eof | TokenKind::RParen => break,
                _ => return Err(self.error_here(&format!("unexpected {}", token.kind))),
            };

            match operator {
                Some(existing) if existing != op => {
                    return Err(self.error_at(
                        token.position,
                        &format!(
                            "cannot mix {} and {} without parentheses",
                            existing, op
                        ),
                    ));
                }
                _ => operator = Some(op),
            }

            if matches!(self.peek().kind, TokenKind::Eof | TokenKind::RParen) {
                return Err(self.error_here(&format!("missing condition after {}", op)));
            }
            terms.push(self.term()?);
        }

        Ok(FilterExpression::new(operator.unwrap_or_default(), terms))
    }

    fn term(&mut self) -> EngramResult<FilterTerm> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::LParen => {
                self.advance();
                if self.peek().kind == TokenKind::RParen {
                    return Err(self.error_here("empty parentheses"));
                }
                let inner = self.expression()?;
                if self.peek().kind != TokenKind::RParen {
                    return Err(self.error_at(token.position, "unclosed '('"));
                }
                self.advance();
                Ok(FilterTerm::Group(inner))
            }
            TokenKind::Word(word)
                if word.eq_ignore_ascii_case("link") && *self.peek_kind_at(1) == TokenKind::LParen =>
            {
                self.advance();
                self.link()
            }
            TokenKind::Word(_) => self.condition(),
            TokenKind::Eof => Err(self.error_here("missing condition")),
            other => Err(self.error_here(&format!("expected condition, found {}", other))),
        }
    }

    fn link(&mut self) -> EngramResult<FilterTerm> {
        let open = self.expect(TokenKind::LParen, "after link")?;
        let type_token = self.advance();
        let connection_type = match &type_token.kind {
            TokenKind::Word(w) => w.parse::<ConnectionType>().map_err(|e| {
                self.error_at(type_token.position, &e)
            })?,
            other => {
                return Err(self.error_at(
                    type_token.position,
                    &format!("expected connection type, found {}", other),
                ))
            }
        };
        self.expect(TokenKind::Comma, "between link type and target")?;
        let target_token = self.advance();
        let target_id = match target_token.kind {
            TokenKind::Word(w) | TokenKind::Quoted(w) => w,
            other => {
                return Err(self.error_at(
                    target_token.position,
                    &format!("expected link target, found {}", other),
                ))
            }
        };
        if self.peek().kind != TokenKind::RParen {
            return Err(self.error_at(open.position, "unclosed link("));
        }
        self.advance();
        Ok(FilterTerm::Link(LinkCondition {
            connection_type,
            target_id,
        }))
    }

    fn condition(&mut self) -> EngramResult<FilterTerm> {
        let field_token = self.advance();
        let TokenKind::Word(raw_field) = &field_token.kind else {
            return Err(self.error_at(field_token.position, "expected field name"));
        };
        if raw_field.to_lowercase() == "context." {
            return Err(self.error_at(field_token.position, "empty context field name"));
        }
        self.expect(
            TokenKind::Colon,
            &format!("after field '{}'", raw_field),
        )?;

        let first = self.value("condition value")?;
        let (op, value) = if self.peek().kind == TokenKind::Colon {
            let op = first
                .1
                .parse::<ComparisonOp>()
                .map_err(|e| self.error_at(first.0, &e))?;
            self.advance();
            let value = self.value("comparison value")?;
            (op, value.1)
        } else {
            (ComparisonOp::Eq, first.1)
        };

        if self.peek().kind == TokenKind::Colon {
            return Err(self.error_here("unexpected ':' after value (quote values containing ':')"));
        }

        Ok(FilterTerm::Condition(FilterCondition::new(
            resolve_field(raw_field),
            op,
            value,
        )))
    }

    /// A value: word, quoted string, or a bare AND/OR used literally.
    fn value(&mut self, what: &str) -> EngramResult<(usize, String)> {
        let token = self.peek().clone();
        let value = match token.kind {
            TokenKind::Word(w) | TokenKind::Quoted(w) => w,
            TokenKind::And | TokenKind::Or if token.text.chars().all(char::is_alphabetic) => {
                token.text.clone()
            }
            _ => return Err(self.error_here(&format!("missing {}", what))),
        };
        self.advance();
        Ok((token.position, value))
    }
}
