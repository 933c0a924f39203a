use super::token::Token;

#[derive(Debug, Clone)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexerError {}

/// Characters that may continue a word (symbol or command name).
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || "_-+*/%<>=!?.:#".contains(ch)
}

/// Characters that may start a bare symbol besides letters.
fn is_operator_char(ch: char) -> bool {
    "+-*/%<>=!?".contains(ch)
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>, line: usize, col: usize) -> LexerError {
        LexerError {
            message: message.into(),
            line,
            col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == ',' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_comment(&mut self) -> Token {
        self.advance();
        let mut comment = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            comment.push(ch);
            self.advance();
        }
        Token::Comment(comment.trim().to_string())
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('r') => string.push('\r'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some('0') => string.push('\0'),
                        Some(ch) => {
                            return Err(self.error(
                                format!("unknown escape sequence: \\{}", ch),
                                self.line,
                                self.col,
                            ));
                        }
                        None => {
                            return Err(self.error(
                                "unexpected EOF in escape sequence",
                                self.line,
                                self.col,
                            ));
                        }
                    }
                    self.advance();
                }
                Some('\n') => {
                    return Err(self.error(
                        "unterminated string (newline before closing quote)",
                        start_line,
                        start_col,
                    ));
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => {
                    return Err(self.error("unterminated string literal", start_line, start_col));
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start_line = self.line;
        let start_col = self.col;

        let is_negative = self.current() == Some('-');
        if is_negative {
            self.advance();
        }

        // Hex: 0x... or 0X...
        if self.current() == Some('0') && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            self.advance();

            let mut hex = String::new();
            while let Some(ch) = self.current() {
                if ch.is_ascii_hexdigit() {
                    hex.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }

            if hex.is_empty() {
                return Err(self.error("expected hex digits after 0x", start_line, start_col));
            }

            let mut value = i64::from_str_radix(&hex, 16).map_err(|_| {
                self.error(format!("invalid hex number: 0x{}", hex), start_line, start_col)
            })?;

            if is_negative {
                value = -value;
            }

            return Ok(Token::Integer(value));
        }

        let mut digits = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                // Only a decimal point if a digit follows
                if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    has_dot = true;
                    digits.push('.');
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(self.error("expected digits", start_line, start_col));
        }

        if has_dot {
            let mut value: f64 = digits.parse().map_err(|_| {
                self.error(format!("invalid float: {}", digits), start_line, start_col)
            })?;
            if is_negative {
                value = -value;
            }
            Ok(Token::Float(value))
        } else {
            let mut value: i64 = digits.parse().map_err(|_| {
                self.error(format!("invalid integer: {}", digits), start_line, start_col)
            })?;
            if is_negative {
                value = -value;
            }
            Ok(Token::Integer(value))
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if is_word_char(ch) {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn read_symbol(&mut self) -> Token {
        let word = self.read_word();
        match word.as_str() {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            "_" => Token::Empty,
            _ => Token::Symbol(word),
        }
    }

    fn read_command(&mut self) -> Result<Token, LexerError> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // '@'

        let name = self.read_word();
        if name.is_empty() {
            return Err(self.error("expected command name after '@'", start_line, start_col));
        }
        Ok(Token::Command(name))
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let span = self.span();

            let token = match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        span,
                    });
                    break;
                }
                Some('\n') => {
                    self.advance();
                    Token::Newline
                }
                Some(';') => self.read_comment(),
                Some('"') => self.read_string()?,
                Some('@') => self.read_command()?,
                Some('[') => {
                    self.advance();
                    Token::LBracket
                }
                Some(']') => {
                    self.advance();
                    Token::RBracket
                }
                Some('{') => {
                    self.advance();
                    Token::LBrace
                }
                Some('}') => {
                    self.advance();
                    Token::RBrace
                }
                Some('\'') => {
                    self.advance();
                    Token::Quote
                }
                Some('-') if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                    self.read_number()?
                }
                Some(ch) if ch.is_ascii_digit() => self.read_number()?,
                Some(ch) if ch.is_alphabetic() || ch == '_' || is_operator_char(ch) => {
                    self.read_symbol()
                }
                Some(ch) => {
                    return Err(self.error(
                        format!("unexpected character: '{}'", ch),
                        self.line,
                        self.col,
                    ));
                }
            };
            tokens.push(Spanned { token, span });
        }

        Ok(tokens)
    }

    pub fn tokenize_clean(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let tokens = self.tokenize()?;
        Ok(tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_) | Token::Newline))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize_clean()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .filter(|t| !matches!(t, Token::Eof))
            .collect()
    }

    #[test]
    fn test_add_program() {
        let t = tokens("1 2 @add");
        assert_eq!(
            t,
            vec![
                Token::Integer(1),
                Token::Integer(2),
                Token::Command("add".to_string())
            ]
        );
    }

    #[test]
    fn test_nested_program() {
        let t = tokens("[ kick @play [ 1 @wait ] ]");
        assert_eq!(
            t,
            vec![
                Token::LBracket,
                Token::Symbol("kick".to_string()),
                Token::Command("play".to_string()),
                Token::LBracket,
                Token::Integer(1),
                Token::Command("wait".to_string()),
                Token::RBracket,
                Token::RBracket
            ]
        );
    }

    #[test]
    fn test_quote_and_empty() {
        let t = tokens("'[ _ ] _");
        assert_eq!(
            t,
            vec![
                Token::Quote,
                Token::LBracket,
                Token::Empty,
                Token::RBracket,
                Token::Empty
            ]
        );
    }

    #[test]
    fn test_list() {
        let t = tokens("{ 1 2.5 \"a\" }");
        assert_eq!(
            t,
            vec![
                Token::LBrace,
                Token::Integer(1),
                Token::Float(2.5),
                Token::String("a".to_string()),
                Token::RBrace
            ]
        );
    }

    #[test]
    fn test_operator_commands_and_symbols() {
        let t = tokens("@+ @<= + note-on");
        assert_eq!(
            t,
            vec![
                Token::Command("+".to_string()),
                Token::Command("<=".to_string()),
                Token::Symbol("+".to_string()),
                Token::Symbol("note-on".to_string())
            ]
        );
    }

    #[test]
    fn test_booleans() {
        assert_eq!(tokens("true false"), vec![Token::Bool(true), Token::Bool(false)]);
    }

    #[test]
    fn test_hex_and_negative_numbers() {
        assert_eq!(
            tokens("0x90 -3 -0.5 -x"),
            vec![
                Token::Integer(0x90),
                Token::Integer(-3),
                Token::Float(-0.5),
                Token::Symbol("-x".to_string())
            ]
        );
    }

    #[test]
    fn test_commas_are_whitespace() {
        assert_eq!(tokens("1, 2"), vec![Token::Integer(1), Token::Integer(2)]);
    }

    #[test]
    fn test_string_escapes() {
        let t = tokens(r#""a\n\"b\"""#);
        assert_eq!(t, vec![Token::String("a\n\"b\"".to_string())]);
    }

    #[test]
    fn test_unterminated_string_newline_error() {
        let mut lexer = Lexer::new("\"abc\n\"");
        let err = lexer.tokenize().unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn test_bare_sigil_error() {
        let mut lexer = Lexer::new("1 @ 2");
        let err = lexer.tokenize().unwrap_err();
        assert!(err.message.contains("expected command name"));
        assert_eq!((err.line, err.col), (1, 3));
    }

    #[test]
    fn test_unexpected_character_error() {
        let mut lexer = Lexer::new("1 $");
        let err = lexer.tokenize().unwrap_err();
        assert!(err.message.contains("unexpected character"));
    }

    #[test]
    fn test_tokens_and_spans_raw() {
        let src = ";hi\n1 @wait\n";

        let mut lexer = Lexer::new(src);
        let sp = lexer.tokenize().unwrap();

        macro_rules! at {
            ($i:expr, $tok:expr, $line:expr, $col:expr) => {{
                assert_eq!(sp[$i].token, $tok, "token mismatch at index {}", $i);
                assert_eq!(sp[$i].span.line, $line, "line mismatch at index {}", $i);
                assert_eq!(sp[$i].span.col, $col, "col mismatch at index {}", $i);
            }};
        }

        assert_eq!(sp.len(), 6, "unexpected token count: {:?}", sp);

        at!(0, Token::Comment("hi".to_string()), 1, 1);
        at!(1, Token::Newline, 1, 4);
        at!(2, Token::Integer(1), 2, 1);
        at!(3, Token::Command("wait".to_string()), 2, 3);
        at!(4, Token::Newline, 2, 8);
        at!(5, Token::Eof, 3, 1);
    }
}
