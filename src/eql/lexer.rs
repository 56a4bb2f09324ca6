//! EQL tokenizer.
//!
//! Every token records the byte offset where it starts so parse errors can
//! point at the offending input.

use std::fmt;

use crate::error::{EngramError, EngramResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    Comma,
    Colon,
    /// `AND` (any case) or `&&`.
    And,
    /// `OR` (any case) or `||`.
    Or,
    Word(String),
    Quoted(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Comma => write!(f, "','"),
            Self::Colon => write!(f, "':'"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Word(w) => write!(f, "'{}'", w),
            Self::Quoted(q) => write!(f, "\"{}\"", q),
            Self::Eof => write!(f, "end of query"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
    /// Source text of the token, quotes included.
    pub text: String,
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | ':' | '"' | '\'')
}

/// Split `input` into tokens, ending with a single `Eof`.
pub fn tokenize(input: &str) -> EngramResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let single = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            _ => None,
        };
        if let Some(kind) = single {
            chars.next();
            tokens.push(Token {
                kind,
                position: pos,
                text: c.to_string(),
            });
            continue;
        }

        let rest = &input[pos..];
        if rest.starts_with("&&") || rest.starts_with("||") {
            chars.next();
            chars.next();
            tokens.push(Token {
                kind: if c == '&' { TokenKind::And } else { TokenKind::Or },
                position: pos,
                text: rest[..2].to_string(),
            });
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let mut value = String::new();
            let mut end = None;
            while let Some((i, ch)) = chars.next() {
                match ch {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    _ if ch == c => {
                        end = Some(i + ch.len_utf8());
                        break;
                    }
                    _ => value.push(ch),
                }
            }
            let Some(end) = end else {
                return Err(EngramError::Parse {
                    position: pos,
                    message: "unterminated quoted string".to_string(),
                });
            };
            tokens.push(Token {
                kind: TokenKind::Quoted(value),
                position: pos,
                text: input[pos..end].to_string(),
            });
            continue;
        }

        let mut end = pos;
        while let Some(&(i, ch)) = chars.peek() {
            let at = &input[i..];
            if !is_word_char(ch) || at.starts_with("&&") || at.starts_with("||") {
                break;
            }
            end = i + ch.len_utf8();
            chars.next();
        }
        let word = &input[pos..end];
        let kind = if word.eq_ignore_ascii_case("and") {
            TokenKind::And
        } else if word.eq_ignore_ascii_case("or") {
            TokenKind::Or
        } else {
            TokenKind::Word(word.to_string())
        };
        tokens.push(Token {
            kind,
            position: pos,
            text: word.to_string(),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: input.len(),
        text: String::new(),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_basic_tokens_and_positions() {
        let tokens = tokenize("type:requirement AND (tag:x)").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 4, 5, 17, 21, 22, 25, 26, 27, 28]);
        assert_eq!(tokens[2].kind, TokenKind::Word("requirement".into()));
        assert_eq!(tokens[3].kind, TokenKind::And);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_symbolic_operators() {
        assert_eq!(
            kinds("a:1&&b:2 || c:3"),
            vec![
                TokenKind::Word("a".into()),
                TokenKind::Colon,
                TokenKind::Word("1".into()),
                TokenKind::And,
                TokenKind::Word("b".into()),
                TokenKind::Colon,
                TokenKind::Word("2".into()),
                TokenKind::Or,
                TokenKind::Word("c".into()),
                TokenKind::Colon,
                TokenKind::Word("3".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_values_with_escapes() {
        let tokens = tokenize(r#"title:"say \"hi\", ok""#).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Quoted("say \"hi\", ok".into()));
        assert_eq!(tokens[2].text, r#""say \"hi\", ok""#);
        assert_eq!(kinds("'or'")[0], TokenKind::Quoted("or".into()));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize("title:\"open").unwrap_err();
        assert!(matches!(err, EngramError::Parse { position: 6, .. }));
    }

    #[test]
    fn test_keywords_are_case_insensitive_whole_words() {
        assert_eq!(kinds("or")[0], TokenKind::Or);
        assert_eq!(kinds("And")[0], TokenKind::And);
        assert_eq!(kinds("order")[0], TokenKind::Word("order".into()));
        assert_eq!(kinds("a&b")[0], TokenKind::Word("a&b".into()));
    }
}
