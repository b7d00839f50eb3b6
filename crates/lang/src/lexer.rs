use std::fmt;

use serde::Serialize;

use crate::escape::{is_escapable, ESCAPE_CHAR};

/// Token types produced by the filter lexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Token {
    /// An operator token such as `$eq:`, resolved by the parser.
    Operator(String),
    /// The `$having:` keyword.
    Having,
    /// A literal run of text, still holding its escape sequences.
    Text { raw: String, quoted: bool },

    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,

    /// The end of the input.
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operator(op) => write!(f, "{op}"),
            Token::Having => write!(f, "$having:"),
            Token::Text { raw, quoted: true } => write!(f, "\"{raw}\""),
            Token::Text { raw, quoted: false } => write!(f, "{raw}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Byte range of a token in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer error. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' in line {line} at position {column}")]
    UnexpectedChar { ch: char, line: usize, column: usize },
    #[error("unterminated string starting in line {line} at position {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("invalid escape sequence in line {line} at position {column}")]
    InvalidEscape { line: usize, column: usize },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedChar { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::InvalidEscape { line, column } => (*line, *column),
        }
    }
}

/// Line (1-based) and column (0-based, in characters) of a byte offset.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count())
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ',' | '"')
}

/// Tokenize a filter string.
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let offset_at = |i: usize| chars.get(i).map_or(input.len(), |(o, _)| *o);
    let position = |i: usize| line_column(input, offset_at(i));

    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let (start, ch) = chars[pos];

        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            pos += 1;
            tokens.push(SpannedToken {
                token,
                span: Span { start, end: offset_at(pos) },
            });
            continue;
        }

        // Quoted literal
        if ch == '"' {
            let open = pos;
            pos += 1;
            let mut raw = String::new();
            loop {
                match chars.get(pos) {
                    Some((_, '"')) => break,
                    Some((_, c)) => {
                        raw.push(*c);
                        pos += 1;
                    }
                    None => {
                        let (line, column) = position(open);
                        return Err(LexError::UnterminatedString { line, column });
                    }
                }
            }
            pos += 1;
            tokens.push(SpannedToken {
                token: Token::Text { raw, quoted: true },
                span: Span { start, end: offset_at(pos) },
            });
            continue;
        }

        // Operator: `$` letters `:`
        if ch == ESCAPE_CHAR && chars.get(pos + 1).is_some_and(|(_, c)| c.is_ascii_alphabetic()) {
            let mut end = pos + 1;
            while chars.get(end).is_some_and(|(_, c)| c.is_ascii_alphabetic()) {
                end += 1;
            }
            if !matches!(chars.get(end), Some((_, ':'))) {
                let (line, column) = position(pos);
                return Err(LexError::InvalidEscape { line, column });
            }
            let text: String = chars[pos..=end].iter().map(|(_, c)| c).collect();
            pos = end + 1;
            let token = if text == "$having:" {
                Token::Having
            } else {
                Token::Operator(text)
            };
            tokens.push(SpannedToken {
                token,
                span: Span { start, end: offset_at(pos) },
            });
            continue;
        }

        // Bare literal run
        let mut raw = String::new();
        while let Some(&(_, c)) = chars.get(pos) {
            if c == ESCAPE_CHAR {
                match chars.get(pos + 1) {
                    Some((_, next)) if next.is_ascii_alphabetic() => break,
                    Some((_, next)) if is_escapable(*next) => {
                        raw.push(c);
                        raw.push(*next);
                        pos += 2;
                        continue;
                    }
                    _ => {
                        let (line, column) = position(pos);
                        return Err(LexError::InvalidEscape { line, column });
                    }
                }
            }
            if c == '[' && looks_like_datetime(&raw) {
                if let Some(close) = chars[pos..].iter().position(|(_, c)| *c == ']') {
                    raw.extend(chars[pos..=pos + close].iter().map(|(_, c)| c));
                    pos += close + 1;
                    continue;
                }
            }
            if is_delimiter(c) {
                break;
            }
            raw.push(c);
            pos += 1;
        }

        if raw.is_empty() {
            let (line, column) = position(pos);
            return Err(LexError::UnexpectedChar { ch, line, column });
        }
        tokens.push(SpannedToken {
            token: Token::Text { raw, quoted: false },
            span: Span { start, end: offset_at(pos) },
        });
    }

    tokens.push(SpannedToken {
        token: Token::Eof,
        span: Span {
            start: input.len(),
            end: input.len(),
        },
    });

    tracing::trace!(count = tokens.len(), "tokenized filter");
    Ok(tokens)
}

// A bracket directly after `yyyy-MM-ddTHH:mm` opens a region zone id.
fn looks_like_datetime(raw: &str) -> bool {
    raw.len() >= 16
        && raw.as_bytes()[..4].iter().all(u8::is_ascii_digit)
        && raw.as_bytes()[10] == b'T'
        && raw.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    fn text(raw: &str) -> Token {
        Token::Text {
            raw: raw.to_string(),
            quoted: false,
        }
    }

    #[test]
    fn tokenize_simple_filter() {
        assert_eq!(
            tok("field1$eq:value1"),
            vec![
                text("field1"),
                Token::Operator("$eq:".into()),
                text("value1"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn whitespace_is_skipped() {
        assert_eq!(tok("field1 $eq: value1"), tok("field1$eq:value1"));
    }

    #[test]
    fn escapes_stay_in_the_run() {
        assert_eq!(
            tok("name$eq:K$*so$ L$(x$)"),
            vec![
                text("name"),
                Token::Operator("$eq:".into()),
                text("K$*so$ L$(x$)"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn lists_and_groups() {
        assert_eq!(
            tok("(a$in:[1,2])"),
            vec![
                Token::LParen,
                text("a"),
                Token::Operator("$in:".into()),
                Token::LBracket,
                text("1"),
                Token::Comma,
                text("2"),
                Token::RBracket,
                Token::RParen,
                Token::Eof
            ]
        );
    }

    #[test]
    fn having_keyword() {
        assert_eq!(
            tok("$having:COUNT(employees)$gt:10"),
            vec![
                Token::Having,
                text("COUNT"),
                Token::LParen,
                text("employees"),
                Token::RParen,
                Token::Operator("$gt:".into()),
                text("10"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn quoted_literal() {
        assert_eq!(
            tok("name$eq:\"John Smith\""),
            vec![
                text("name"),
                Token::Operator("$eq:".into()),
                Token::Text {
                    raw: "John Smith".into(),
                    quoted: true
                },
                Token::Eof
            ]
        );
    }

    #[test]
    fn zoned_datetime_keeps_bracket() {
        assert_eq!(
            tok("at$gt:2023-11-02T15:22[America/New_York]")[2],
            text("2023-11-02T15:22[America/New_York]")
        );
    }

    #[test]
    fn errors_carry_position() {
        assert_eq!(
            tokenize("a$eq:b$").unwrap_err(),
            LexError::InvalidEscape { line: 1, column: 6 }
        );
        assert_eq!(
            tokenize("a$eq:\"open").unwrap_err(),
            LexError::UnterminatedString { line: 1, column: 5 }
        );
        assert_eq!(
            tokenize("a\n$eq$x").unwrap_err(),
            LexError::InvalidEscape { line: 2, column: 0 }
        );
    }

    #[test]
    fn line_column_counts_chars() {
        assert_eq!(line_column("abc", 2), (1, 2));
        assert_eq!(line_column("a\nbc", 3), (2, 1));
        assert_eq!(line_column("æø", 2), (1, 1));
    }
}
