/*! Splits patterns into tokens.

The lexer works in one of four modes, and the same character can produce
different tokens depending on the mode:

- Normal mode, for the pattern text outside any construct. `.`, `|`, `?`,
  `+`, `*`, `(`, `)`, `[`, `{` and `}` are operators, everything else is a
  literal.
- Character set mode, entered with `[` and left with `]`. Only `-`, `]`
  and a leading `^` are special.
- Repetition mode, entered with `{` and left with `}`. Only digits and `,`
  are accepted.
- Class name mode, entered with the `{` that follows `\p` and left with `}`.
  Accepts names and the parenthesis in `WordList(Name)`.

The lexer doesn't look ahead. Each call to [`Lexer::next_token`] consumes
exactly the characters of the returned token.
 */

use std::mem;

use crate::re::LexError;

mod tokens;

pub(crate) use tokens::{Token, TokenKind};


/// Characters that can be escaped with a backslash in normal mode.
const NORMAL_ESCAPABLE: &str = "|.()[]\\?*+{}^$";

/// Characters that can be escaped with a backslash inside a character set.
const CHARSET_ESCAPABLE: &str = "-]\\^[";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    CharSet,
    Rep,
    ClassName,
}

/// Produces the tokens in a pattern.
pub(crate) struct Lexer<'a> {
    pattern: &'a str,
    pos: usize,
    mode: Mode,
    /// The previous token was `\p`.
    after_named_class: bool,
    /// The previous token was the `[` opening a character set.
    at_charset_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            pos: 0,
            mode: Mode::Normal,
            after_named_class: false,
            at_charset_start: false,
        }
    }

    /// Returns the next token in the pattern. When the pattern is exhausted
    /// returns [`TokenKind::Eoi`], and keeps returning it in subsequent
    /// calls.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let (offset, c) = match self.bump() {
            Some(next) => next,
            None => return Ok(Token::new(TokenKind::Eoi, self.pattern.len())),
        };

        let kind = match self.mode {
            Mode::Normal => self.lex_normal(offset, c)?,
            Mode::CharSet => self.lex_charset(offset, c)?,
            Mode::Rep => self.lex_rep(offset, c)?,
            Mode::ClassName => self.lex_class_name(offset, c)?,
        };

        Ok(Token::new(kind, offset))
    }

    fn lex_normal(&mut self, offset: usize, c: char) -> Result<TokenKind, LexError> {
        let after_named_class = mem::take(&mut self.after_named_class);

        let kind = match c {
            '.' => TokenKind::Dot,
            '|' => TokenKind::Pipe,
            '?' => TokenKind::Opt,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '}' => TokenKind::RBrace,
            '[' => {
                self.mode = Mode::CharSet;
                self.at_charset_start = true;
                TokenKind::LBracket
            }
            '{' => {
                self.mode =
                    if after_named_class { Mode::ClassName } else { Mode::Rep };
                TokenKind::LBrace
            }
            '\\' => self.lex_escape(offset)?,
            c => TokenKind::Char(c),
        };

        Ok(kind)
    }

    fn lex_charset(&mut self, offset: usize, c: char) -> Result<TokenKind, LexError> {
        let at_start = mem::take(&mut self.at_charset_start);

        let kind = match c {
            ']' => {
                self.mode = Mode::Normal;
                TokenKind::RBracket
            }
            '-' => TokenKind::Dash,
            '^' if at_start => TokenKind::Caret,
            '\\' => self.lex_escape(offset)?,
            c => TokenKind::Char(c),
        };

        Ok(kind)
    }

    fn lex_rep(&mut self, offset: usize, c: char) -> Result<TokenKind, LexError> {
        let kind = match c {
            ',' => TokenKind::Comma,
            '}' => {
                self.mode = Mode::Normal;
                TokenKind::RBrace
            }
            '0'..='9' => {
                let mut n = c as u32 - '0' as u32;
                while let Some(digit) = self.peek().and_then(|c| c.to_digit(10))
                {
                    self.bump();
                    n = n
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                        .ok_or(LexError::CountOverflow { offset })?;
                }
                TokenKind::Int(n)
            }
            found => return Err(LexError::UnexpectedChar { found, offset }),
        };

        Ok(kind)
    }

    fn lex_class_name(
        &mut self,
        offset: usize,
        c: char,
    ) -> Result<TokenKind, LexError> {
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '}' => {
                self.mode = Mode::Normal;
                TokenKind::RBrace
            }
            c if is_name_char(c) => {
                while self.peek().is_some_and(is_name_char) {
                    self.bump();
                }
                TokenKind::Name(self.pattern[offset..self.pos].to_string())
            }
            found => return Err(LexError::UnexpectedChar { found, offset }),
        };

        Ok(kind)
    }

    /// Handles the character after a backslash. `offset` is the offset of
    /// the backslash.
    fn lex_escape(&mut self, offset: usize) -> Result<TokenKind, LexError> {
        let (_, escaped) =
            self.bump().ok_or(LexError::DanglingEscape { offset })?;

        let kind = match (self.mode, escaped) {
            (_, 'd') => TokenKind::DigitClass,
            (_, 'w') => TokenKind::WordClass,
            (_, 's') => TokenKind::SpaceClass,
            (Mode::Normal, 'b') => TokenKind::WordBoundary,
            (Mode::Normal, 'p') => {
                self.after_named_class = true;
                TokenKind::NamedClass
            }
            (Mode::Normal, c) if NORMAL_ESCAPABLE.contains(c) => {
                TokenKind::Char(c)
            }
            (Mode::CharSet, c) if CHARSET_ESCAPABLE.contains(c) => {
                TokenKind::Char(c)
            }
            (_, escaped) => {
                return Err(LexError::InvalidEscape { escaped, offset })
            }
        };

        Ok(kind)
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    #[inline]
    fn bump(&mut self) -> Option<(usize, char)> {
        let c = self.peek()?;
        let offset = self.pos;
        self.pos += c.len_utf8();
        Some((offset, c))
    }
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}
