use std::fmt::{Display, Formatter};

/// Kinds of tokens produced by the [`crate::re::lexer::Lexer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// A literal character, escaped or not.
    Char(char),
    /// `.`
    Dot,
    /// `|`
    Pipe,
    /// `?`
    Opt,
    /// `+`
    Plus,
    /// `*`
    Star,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `^` right after the `[` that opens a character set.
    Caret,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `-` inside a character set.
    Dash,
    /// `,` inside a repetition count.
    Comma,
    /// Sequence of digits inside a repetition count.
    Int(u32),
    /// Identifier inside `\p{...}`.
    Name(String),
    /// `\d`
    DigitClass,
    /// `\w`
    WordClass,
    /// `\s`
    SpaceClass,
    /// `\b`
    WordBoundary,
    /// `\p`
    NamedClass,
    /// End of the pattern.
    Eoi,
}

/// A token and the offset in the pattern where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Char(c) => write!(f, "{}", c),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Opt => write!(f, "?"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Dash => write!(f, "-"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Name(name) => write!(f, "{}", name),
            TokenKind::DigitClass => write!(f, "\\d"),
            TokenKind::WordClass => write!(f, "\\w"),
            TokenKind::SpaceClass => write!(f, "\\s"),
            TokenKind::WordBoundary => write!(f, "\\b"),
            TokenKind::NamedClass => write!(f, "\\p"),
            TokenKind::Eoi => write!(f, "end of pattern"),
        }
    }
}
