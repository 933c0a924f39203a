use super::lexer::{Span, Spanned};
use super::parser_error::ParserError;
use super::token::Token;
use crate::lang::{Instr, Program, Value};

/// Recursive-descent parser for ash program text.
///
/// The parser consumes a stream of lexed `Spanned` tokens and produces a
/// [`Program`]. Every top-level form becomes one instruction:
/// - literals and bare symbols become `Instr::Literal`
/// - `@name` becomes `Instr::Command`
/// - `[ ... ]` becomes `Instr::SubProgram`, `'[ ... ]` a quoted program literal
/// - `{ ... }` becomes a list literal (literals only)
/// - `_` becomes `Instr::Empty`
///
/// Comments and newlines are filtered out in `Parser::new`.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token.
    ///
    /// Used to provide stable source locations for errors that occur after
    /// advancing past the last token or at end-of-file.
    last_span: Option<Span>,
}

impl Parser {
    /// Creates a new parser from lexer output, dropping comments and newlines.
    pub fn new(tokens: Vec<Spanned>) -> Self {
        let tokens: Vec<Spanned> = tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_) | Token::Newline))
            .collect();
        Parser {
            tokens,
            pos: 0,
            last_span: None,
        }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    /// Advances the token stream by one and returns the consumed token.
    ///
    /// This also updates `last_span` so that EOF-related errors can still
    /// report a useful location.
    fn advance(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        if let Some(s) = token {
            self.last_span = Some(s.span.clone());
        }
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    /// Constructs a `ParserError` at the most relevant location.
    ///
    /// Priority:
    /// 1. If `current()` exists, use its span.
    /// 2. Else, use `last_span`.
    /// 3. Else, default to (1,1) for truly empty input.
    fn error(&self, message: &str) -> ParserError {
        let (line, col) = match (self.current(), &self.last_span) {
            (Some(spanned), _) => (spanned.span.line, spanned.span.col),
            (None, Some(span)) => (span.line, span.col),
            (None, None) => (1, 1),
        };
        ParserError {
            message: message.to_string(),
            line,
            col,
        }
    }

    /// Parses a complete program, stopping at `Token::Eof`.
    pub fn parse(&mut self) -> Result<Program, ParserError> {
        let mut items = Vec::new();

        while let Some(token) = self.peek() {
            match token {
                Token::Eof => break,
                Token::RBracket => return Err(self.error("unexpected ']' without matching '['")),
                Token::RBrace => return Err(self.error("unexpected '}' without matching '{'")),
                _ => items.push(self.parse_instr()?),
            }
        }

        Ok(items.into())
    }

    /// Parses a single instruction.
    fn parse_instr(&mut self) -> Result<Instr, ParserError> {
        let spanned = self.current().ok_or_else(|| self.error("unexpected EOF"))?;

        let instr = match &spanned.token {
            Token::Command(name) => {
                let name = name.clone();
                self.advance();
                Instr::Command(name)
            }
            Token::Empty => {
                self.advance();
                Instr::Empty
            }
            Token::LBracket => Instr::SubProgram(self.parse_block()?),
            Token::Quote => {
                self.advance(); // consume '\''
                if !matches!(self.peek(), Some(Token::LBracket)) {
                    return Err(self.error("expected '[' after quote"));
                }
                Instr::Literal(Value::Program(self.parse_block()?))
            }
            Token::LBrace => Instr::Literal(self.parse_list()?),
            token if token.is_literal() => Instr::Literal(self.parse_literal()?),
            Token::Eof => return Err(self.error("unexpected EOF")),
            other => {
                let message = format!("unexpected token '{}'", other);
                return Err(self.error(&message));
            }
        };

        Ok(instr)
    }

    /// Parses a sub-program:
    ///
    /// ```text
    /// [ <instr...> ]
    /// ```
    ///
    /// # Errors
    /// - If EOF is reached before the closing `]`.
    fn parse_block(&mut self) -> Result<Program, ParserError> {
        self.advance(); // consume '['

        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBracket) => {
                    self.advance();
                    break;
                }
                Some(Token::Eof) | None => {
                    return Err(self.error("unexpected EOF, expected ']'"));
                }
                _ => items.push(self.parse_instr()?),
            }
        }

        Ok(items.into())
    }

    /// Parses a list literal. Only literal values and nested lists are allowed:
    ///
    /// ```text
    /// { 1 2.5 "a" { b c } }
    /// ```
    fn parse_list(&mut self) -> Result<Value, ParserError> {
        self.advance(); // consume '{'

        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    break;
                }
                Some(Token::LBrace) => items.push(self.parse_list()?),
                Some(token) if token.is_literal() => items.push(self.parse_literal()?),
                Some(Token::Eof) | None => {
                    return Err(self.error("unexpected EOF, expected '}'"));
                }
                Some(_) => {
                    return Err(self.error("only literal values may appear in a list"));
                }
            }
        }

        Ok(Value::List(items))
    }

    fn parse_literal(&mut self) -> Result<Value, ParserError> {
        let value = match self.peek() {
            Some(Token::Integer(n)) => Value::Integer(*n),
            Some(Token::Float(n)) => Value::Float(*n),
            Some(Token::String(s)) | Some(Token::Symbol(s)) => Value::String(s.clone()),
            Some(Token::Bool(b)) => Value::Bool(*b),
            _ => return Err(self.error("expected a literal value")),
        };
        self.advance();
        Ok(value)
    }
}
