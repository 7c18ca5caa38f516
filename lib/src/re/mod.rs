/*! A regular expression engine built around Pike's VM.

Patterns go through three stages:

1. [`lexer`] splits the pattern into tokens. The lexer is stateful, the
   meaning of a character depends on whether it appears in normal text,
   inside a character set, inside a repetition count or inside the name of
   a named class.
2. [`thompson::compiler`] consumes the tokens and emits VM code directly,
   without building an intermediate syntax tree. Engine [`Flags`] are
   applied at this stage.
3. [`thompson::pikevm`] executes the code against an input string, running
   all the alternatives in lock-step. Memory usage is bounded by the size of
   the program, not by the size of the input.

The result of compiling a pattern is a [`CompiledRegex`], which can be
shared among many [`Matcher`]s.
 */

use bitmask::bitmask;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod classes;
pub(crate) mod lexer;
pub mod matcher;
pub mod program;
pub(crate) mod thompson;
pub(crate) mod threads;

pub use classes::{NamedClass, WordLists};
pub use matcher::{Match, Matcher};
pub use program::{CompiledRegex, SerializationError};

/// Maximum number of instructions in a compiled program.
pub const MAX_PROGRAM_LEN: usize = 1 << 20;

/// Maximum nesting level for groups in a pattern. Groups are parsed
/// recursively, this limit keeps the parser within a 2 MiB stack even in
/// debug builds.
pub const MAX_NESTING: usize = 64;

bitmask! {
    /// Set of [`Flag`]s that control how a pattern is compiled.
    ///
    /// Flags are combined with the `|` operator, and they only affect
    /// compilation. Once a pattern is compiled, the program doesn't know
    /// which flags produced it.
    #[derive(Debug, Hash, Serialize, Deserialize)]
    pub mask Flags: u8 where
    /// Individual compilation flags.
    #[derive(Debug)]
    flags Flag {
        /// Literals and character sets also match their upper-case and
        /// lower-case counterparts.
        CaseInsensitive       = 0x01,
        /// Literals and character sets also match the same letters with
        /// or without diacritics (`e`, `é`, `è`, ...).
        DiacriticsInsensitive = 0x02,
        /// The pattern can only match at word boundaries.
        AutoWordBoundaries    = 0x04,
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::none()
    }
}

/// Error produced while splitting a pattern into tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A backslash is followed by a character that can't be escaped in
    /// the current context.
    #[error("invalid escape sequence `\\{escaped}` at offset {offset}")]
    InvalidEscape {
        /// The character after the backslash.
        escaped: char,
        /// Offset of the backslash.
        offset: usize,
    },

    /// The pattern ends with a backslash.
    #[error("pattern ends with an incomplete escape sequence at offset {offset}")]
    DanglingEscape {
        /// Offset of the backslash.
        offset: usize,
    },

    /// A character that is not allowed in the current context, like a
    /// letter inside a repetition count.
    #[error("unexpected character `{found}` at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// Offset of the character.
        offset: usize,
    },

    /// A repetition count doesn't fit in 32 bits.
    #[error("repetition count too large at offset {offset}")]
    CountOverflow {
        /// Offset where the number starts.
        offset: usize,
    },
}

impl LexError {
    /// Offset within the pattern where the error was found.
    pub fn offset(&self) -> usize {
        match self {
            LexError::InvalidEscape { offset, .. }
            | LexError::DanglingEscape { offset }
            | LexError::UnexpectedChar { offset, .. }
            | LexError::CountOverflow { offset } => *offset,
        }
    }
}

/// Error returned when a pattern can't be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The pattern could not be split into tokens.
    #[error(transparent)]
    Lex(#[from] LexError),

    /// An opening parenthesis without its closing counterpart, or the
    /// other way around.
    #[error("unbalanced parenthesis at offset {offset}")]
    UnbalancedParenthesis {
        /// Offset of the unmatched parenthesis.
        offset: usize,
    },

    /// A character set that is never closed with `]`.
    #[error("unclosed character set at offset {offset}")]
    UnclosedCharSet {
        /// Offset of the opening `[`.
        offset: usize,
    },

    /// `\p{Name}` where `Name` is not a known class.
    #[error("unknown class `{name}` at offset {offset}")]
    UnknownClass {
        /// Name of the class.
        name: String,
        /// Offset of the name.
        offset: usize,
    },

    /// `\p{WordList(Name)}` where `Name` is not provided by the
    /// [`ClassProvider`].
    #[error("unknown word list `{name}` at offset {offset}")]
    UnknownWordList {
        /// Name of the word list.
        name: String,
        /// Offset of the name.
        offset: usize,
    },

    /// A repetition like `{2,1}`, `{}` or `{,}`.
    #[error("malformed repetition at offset {offset}")]
    MalformedRepetition {
        /// Offset of the opening `{`.
        offset: usize,
    },

    /// A quantifier that doesn't follow anything, like in `*a` or `(|+)`.
    #[error("nothing to repeat at offset {offset}")]
    NothingToRepeat {
        /// Offset of the quantifier.
        offset: usize,
    },

    /// A token that is valid for the lexer but not in its current position.
    #[error("unexpected `{token}` at offset {offset}")]
    UnexpectedToken {
        /// Textual description of the token.
        token: String,
        /// Offset of the token.
        offset: usize,
    },

    /// A range in a character set where the start is greater than the end,
    /// like `[z-a]`, or where one of the ends is a class, like `[a-\d]`.
    #[error("invalid range in character set at offset {offset}")]
    InvalidRange {
        /// Offset of the range start.
        offset: usize,
    },

    /// Groups are nested deeper than [`MAX_NESTING`].
    #[error("groups nested too deeply at offset {offset}")]
    NestingTooDeep {
        /// Offset of the group that exceeded the limit.
        offset: usize,
    },

    /// The program is longer than [`MAX_PROGRAM_LEN`] instructions, or has
    /// at least as many groups.
    #[error("regexp too large")]
    TooLarge,
}

impl CompileError {
    /// Offset within the pattern where the error was found. Returns `None`
    /// for errors that are not tied to a specific position.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CompileError::Lex(err) => Some(err.offset()),
            CompileError::UnbalancedParenthesis { offset }
            | CompileError::UnclosedCharSet { offset }
            | CompileError::UnknownClass { offset, .. }
            | CompileError::UnknownWordList { offset, .. }
            | CompileError::MalformedRepetition { offset }
            | CompileError::NothingToRepeat { offset }
            | CompileError::UnexpectedToken { offset, .. }
            | CompileError::InvalidRange { offset }
            | CompileError::NestingTooDeep { offset } => Some(*offset),
            CompileError::TooLarge => None,
        }
    }
}

/// Lookups the compiler delegates to the caller.
///
/// Word lists and diacritic variants belong to the lexicon of the
/// surrounding pipeline. The compiler asks for them while translating
/// `\p{WordList(Name)}` and while applying
/// [`Flag::DiacriticsInsensitive`], and knows nothing else about where
/// they come from.
pub trait ClassProvider {
    /// Returns the words in the list called `name`, or `None` if no such
    /// list exists.
    fn word_list(&self, name: &str) -> Option<&[String]>;

    /// Returns the characters that differ from `c` only in diacritics.
    /// The result doesn't need to include `c` itself.
    ///
    /// The default implementation uses a built-in table that covers the
    /// Latin letters.
    fn diacritic_variants(&self, c: char) -> Vec<char> {
        classes::latin_variants(c)
    }
}

/// Compiles `pattern` with the given flags.
///
/// This is a shortcut for building a [`thompson::compiler::Compiler`].
pub fn compile(
    pattern: &str,
    flags: Flags,
    provider: Option<&dyn ClassProvider>,
) -> Result<CompiledRegex, CompileError> {
    let mut compiler = thompson::compiler::Compiler::new().flags(flags);
    if let Some(provider) = provider {
        compiler = compiler.class_provider(provider);
    }
    compiler.compile(pattern)
}
