use crate::ast::{
    AggregateFunction, Condition, ConditionGroup, Filter, HavingCondition,
    HavingFunctionCondition, LogicalOperator, Operator, Value,
};
use crate::instant::DateTimeError;
use crate::lexer::{line_column, tokenize, LexError, Span, SpannedToken, Token};
use crate::literal::{self, LiteralError};

/// Parser error types. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("unexpected token '{found}' in line {line} at position {column}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        line: usize,
        column: usize,
    },
    #[error("unexpected end of input in line {line} at position {column}, expected {expected}")]
    UnexpectedEof {
        expected: String,
        line: usize,
        column: usize,
    },
    #[error("unknown operator {operator} in line {line} at position {column}")]
    UnknownOperator {
        operator: String,
        line: usize,
        column: usize,
    },
    #[error("unknown value type for '{literal}' in line {line} at position {column}")]
    UnknownValueType {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("failed to parse date/time value '{literal}' in line {line} at position {column}: {source}")]
    DateTime {
        literal: String,
        line: usize,
        column: usize,
        #[source]
        source: DateTimeError,
    },
    #[error("filter is {length} bytes long, the limit is {max}")]
    TooLong { length: usize, max: usize },
    #[error("filter nesting exceeds {max} levels in line {line} at position {column}")]
    TooDeep {
        max: usize,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Line and column of the offending input, when known.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::Lex(e) => Some(e.position()),
            ParseError::UnexpectedToken { line, column, .. }
            | ParseError::UnexpectedEof { line, column, .. }
            | ParseError::UnknownOperator { line, column, .. }
            | ParseError::UnknownValueType { line, column, .. }
            | ParseError::DateTime { line, column, .. }
            | ParseError::TooDeep { line, column, .. } => Some((*line, *column)),
            ParseError::TooLong { .. } => None,
        }
    }
}

/// Bounds applied to untrusted filter text before and during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum input length in bytes.
    pub max_length: usize,
    /// Maximum nesting of groups, negations and having sub-filters.
    pub max_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_length: 4096,
            max_depth: 64,
        }
    }
}

/// Parse a filter string with the default limits.
pub fn parse(input: &str) -> Result<Filter, ParseError> {
    parse_with_limits(input, ParseLimits::default())
}

/// Parse a filter string.
pub fn parse_with_limits(input: &str, limits: ParseLimits) -> Result<Filter, ParseError> {
    tracing::trace!(input, "parsing filter");
    if input.len() > limits.max_length {
        return Err(ParseError::TooLong {
            length: input.len(),
            max: limits.max_length,
        });
    }
    let tokens = tokenize(input)?;
    let filter = Parser::new(input, tokens, limits, 0).parse_filter()?;
    tracing::debug!(filter = %filter.compact_print(), "parsed filter");
    Ok(filter)
}

impl Filter {
    /// Parse a filter string with the default limits.
    pub fn parse(input: &str) -> Result<Filter, ParseError> {
        parse(input)
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
    limits: ParseLimits,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<SpannedToken>, limits: ParseLimits, depth: usize) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            limits,
            depth,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(Span {
                start: self.source.len(),
                end: self.source.len(),
            })
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn position(&self, span: Span) -> (usize, usize) {
        line_column(self.source, span.start)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let (line, column) = self.position(self.span());
        match self.peek() {
            Token::Eof => ParseError::UnexpectedEof {
                expected: expected.to_string(),
                line,
                column,
            },
            found => ParseError::UnexpectedToken {
                found: found.to_string(),
                expected: expected.to_string(),
                line,
                column,
            },
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{expected}'")))
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            let (line, column) = self.position(self.span());
            return Err(ParseError::TooDeep {
                max: self.limits.max_depth,
                line,
                column,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_filter(&mut self) -> Result<Filter, ParseError> {
        let root = self.parse_expression()?;
        if self.peek() != &Token::Eof {
            return Err(self.unexpected("'$and:', '$or:' or end of input"));
        }
        Ok(Filter::new(root))
    }

    /// `term (($and: | $or:) term)*`, associating left to right.
    fn parse_expression(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let operator = match self.peek() {
                Token::Operator(op) if op == Operator::And.token() => LogicalOperator::And,
                Token::Operator(op) if op == Operator::Or.token() => LogicalOperator::Or,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            tracing::trace!(?operator, "creating condition group");
            left = Condition::Group(ConditionGroup::new(operator, left, right));
        }
    }

    fn parse_term(&mut self) -> Result<Condition, ParseError> {
        match self.peek().clone() {
            Token::Operator(op) if op == Operator::Not.token() => {
                self.advance();
                self.enter()?;
                let inner = self.parse_term()?;
                self.leave();
                Ok(Condition::negate(inner))
            }
            Token::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                self.leave();
                Ok(inner)
            }
            Token::Having => {
                self.advance();
                self.enter()?;
                let condition = self.parse_having()?;
                self.leave();
                Ok(condition)
            }
            Token::Text { raw, .. } => {
                self.advance();
                self.parse_predicate(raw.trim().to_string())
            }
            _ => Err(self.unexpected("a field, '(', '$not:' or '$having:'")),
        }
    }

    fn parse_operator(&mut self) -> Result<Operator, ParseError> {
        let span = self.span();
        match self.peek().clone() {
            Token::Operator(text) => {
                let operator = Operator::from_token(&text).ok_or_else(|| {
                    let (line, column) = self.position(span);
                    ParseError::UnknownOperator {
                        operator: text.clone(),
                        line,
                        column,
                    }
                })?;
                self.advance();
                Ok(operator)
            }
            _ => Err(self.unexpected("an operator")),
        }
    }

    fn parse_predicate(&mut self, field: String) -> Result<Condition, ParseError> {
        let span = self.span();
        let operator = self.parse_operator()?;
        let condition = match operator {
            Operator::Null | Operator::NNull => Condition::simple(field, operator, None),
            Operator::In => Condition::in_list(field, self.parse_value_list(operator)?),
            Operator::Nin => Condition::not_in_list(field, self.parse_value_list(operator)?),
            Operator::And | Operator::Or | Operator::Not => {
                let (line, column) = self.position(span);
                return Err(ParseError::UnexpectedToken {
                    found: operator.token().to_string(),
                    expected: "a comparison operator".to_string(),
                    line,
                    column,
                });
            }
            _ => {
                let value = self.parse_value(operator)?;
                Condition::simple(field, operator, Some(value))
            }
        };
        tracing::trace!(?condition, "created condition");
        Ok(condition)
    }

    fn parse_value(&mut self, operator: Operator) -> Result<Value, ParseError> {
        let span = self.span();
        let Token::Text { raw, quoted } = self.peek().clone() else {
            return Err(self.unexpected("a value"));
        };
        self.advance();
        let literal = raw.trim();
        literal::coerce(literal, quoted, operator).map_err(|e| self.literal_error(e, literal, span))
    }

    fn literal_error(&self, error: LiteralError, literal: &str, span: Span) -> ParseError {
        let (line, column) = self.position(span);
        match error {
            LiteralError::UnknownValueType => ParseError::UnknownValueType {
                literal: literal.to_string(),
                line,
                column,
            },
            LiteralError::DateTime(source) => ParseError::DateTime {
                literal: literal.to_string(),
                line,
                column,
                source,
            },
        }
    }

    /// `[ value (, value)* ]`
    fn parse_value_list(&mut self, operator: Operator) -> Result<Vec<Value>, ParseError> {
        self.expect(&Token::LBracket)?;
        let mut values = vec![self.parse_value(operator)?];
        while self.peek() == &Token::Comma {
            self.advance();
            values.push(self.parse_value(operator)?);
        }
        self.expect(&Token::RBracket)?;
        Ok(values)
    }

    fn parse_having(&mut self) -> Result<Condition, ParseError> {
        let Token::Text { raw: name, .. } = self.peek().clone() else {
            return Err(self.unexpected("a field or aggregate function"));
        };
        self.advance();
        let name = name.trim().to_string();

        // `FUNCTION(field)` is told apart from `field(sub-filter)` by its shape.
        let function = AggregateFunction::from_name(&name).filter(|_| {
            self.peek() == &Token::LParen
                && matches!(self.peek_at(1), Token::Text { .. })
                && self.peek_at(2) == &Token::RParen
                && matches!(self.peek_at(3), Token::Operator(_))
        });

        match function {
            Some(function) => self.parse_having_function(function),
            None => self.parse_having_filter(name),
        }
    }

    fn parse_having_function(&mut self, function: AggregateFunction) -> Result<Condition, ParseError> {
        self.expect(&Token::LParen)?;
        let Token::Text { raw: field, .. } = self.peek().clone() else {
            return Err(self.unexpected("a field"));
        };
        self.advance();
        self.expect(&Token::RParen)?;

        let span = self.span();
        let operator = self.parse_operator()?;
        if !operator.is_comparison() {
            let (line, column) = self.position(span);
            return Err(ParseError::UnexpectedToken {
                found: operator.token().to_string(),
                expected: "a comparison operator".to_string(),
                line,
                column,
            });
        }

        let span = self.span();
        let number = match self.peek().clone() {
            Token::Text { raw, quoted: false } if literal::is_number(raw.trim()) => raw,
            _ => return Err(self.unexpected("a number")),
        };
        self.advance();
        let value = literal::number(number.trim())
            .map_err(|e| self.literal_error(e, number.trim(), span))?;

        let condition = Condition::HavingFunction(HavingFunctionCondition {
            field: field.trim().to_string(),
            function,
            operator,
            value,
        });
        tracing::trace!(?condition, "created having function condition");
        Ok(condition)
    }

    fn parse_having_filter(&mut self, field: String) -> Result<Condition, ParseError> {
        self.expect(&Token::LParen)?;
        let open = self.pos;

        let mut depth = 0usize;
        let close = loop {
            match self.peek() {
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => break self.pos,
                Token::RParen => depth -= 1,
                Token::Eof => return Err(self.unexpected("')'")),
                _ => {}
            }
            self.pos += 1;
        };

        // The sub-filter is parsed on its own, over exactly the tokens of its text.
        let end = self.tokens[close].span.start;
        let mut sub_tokens = self.tokens[open..close].to_vec();
        sub_tokens.push(SpannedToken {
            token: Token::Eof,
            span: Span { start: end, end },
        });
        let sub_filter = Parser::new(self.source, sub_tokens, self.limits, self.depth).parse_filter()?;
        self.pos = close + 1;

        let start = self.tokens[open].span.start;
        tracing::trace!(field = %field, sub_filter = self.source[start..end].trim(), "created having condition");
        Ok(Condition::Having(HavingCondition {
            field,
            sub_filter: Box::new(sub_filter),
        }))
    }
}
