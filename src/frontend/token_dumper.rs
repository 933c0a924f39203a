use super::lexer::Spanned;
use super::token::Token;

/// Prints lexed tokens one per line with their source position.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints surface syntax instead of Debug
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        for s in tokens {
            println!("{}", self.line(s));
        }
    }

    /// Render one token as `[line:col] KIND repr`.
    pub fn line(&self, s: &Spanned) -> String {
        let kind = Self::kind(&s.token);
        let colr = if self.color { Self::color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let repr = if self.show_debug_repr {
            format!("{:?}", s.token)
        } else {
            s.token.to_string()
        };

        format!(
            "[{:02}:{:02}] {}{:<8} {}{}",
            s.span.line, s.span.col, colr, kind, repr, reset
        )
    }

    fn kind(t: &Token) -> &'static str {
        use Token::*;
        match t {
            Newline => "NEWLINE",
            Comment(_) => "COMMENT",
            Eof => "EOF",

            Integer(_) => "INT",
            Float(_) => "FLOAT",
            String(_) => "STRING",
            Bool(_) => "BOOL",
            Symbol(_) => "SYMBOL",
            Command(_) => "COMMAND",
            Empty => "EMPTY",

            LBracket | RBracket => "BRACKET",
            LBrace | RBrace => "BRACE",
            Quote => "QUOTE",
        }
    }

    fn color(t: &Token) -> &'static str {
        use Token::*;
        match t {
            Newline | Comment(_) | Eof | Empty => Self::DIM,
            String(_) | Symbol(_) => Self::GRN,
            Integer(_) | Float(_) | Bool(_) => Self::CYN,
            Command(_) => Self::YEL,
            Quote => Self::MAG,
            _ => Self::RESET,
        }
    }
}
