//! Program text → [`Program`].

pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token;
pub mod token_dumper;

use crate::lang::Program;
use lexer::{Lexer, LexerError};
use parser::Parser;
use parser_error::ParserError;

/// Either stage of turning source text into a program can fail.
#[derive(Debug)]
pub enum SourceError {
    Lex(LexerError),
    Parse(ParserError),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Lex(e) => write!(f, "lexer error: {}", e),
            SourceError::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<LexerError> for SourceError {
    fn from(e: LexerError) -> Self {
        SourceError::Lex(e)
    }
}

impl From<ParserError> for SourceError {
    fn from(e: ParserError) -> Self {
        SourceError::Parse(e)
    }
}

/// Lex and parse `source` into a program.
pub fn parse_source(source: &str) -> Result<Program, SourceError> {
    let tokens = Lexer::new(source).tokenize()?;
    let program = Parser::new(tokens).parse()?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        let program = parse_source("60 @mtof").unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_errors_are_tagged_by_stage() {
        assert!(matches!(parse_source("\"open"), Err(SourceError::Lex(_))));
        assert!(matches!(parse_source("[ 1"), Err(SourceError::Parse(_))));
        let message = parse_source("[ 1").unwrap_err().to_string();
        assert!(message.starts_with("parse error: 1:"));
    }
}
