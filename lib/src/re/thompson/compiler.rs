/*! Compiles patterns into code for Pike's VM.

The compiler is a recursive descent parser that emits code as it goes,
there's no syntax tree in between. Each construct in the pattern produces a
fragment of code ([`InstrSeq`]), and fragments are combined into larger
fragments until the whole pattern is compiled. As jumps and splits use
offsets relative to their own address, fragments can be concatenated and
copied without patching the code inside them.

The grammar is:

```text
alternation := concat ( '|' concat )*
concat      := repeat*
repeat      := atom ( '?' | '*' | '+' | '{' count '}' )*
atom        := char | '.' | '\d' | '\w' | '\s' | '\b'
             | '(' alternation ')'
             | '[' '^'? set_item* ']'
             | '\p' '{' name '}'
             | '\p' '{' 'WordList' '(' name ')' '}'
```
 */

use std::fmt::{Display, Formatter};
use std::mem;

use itertools::Itertools;
#[cfg(feature = "logging")]
use log::*;

use crate::re::classes::{
    case_variants, latin_variants, NamedClass, DIGIT_RANGES, SPACE_RANGES,
    WORD_RANGES,
};
use crate::re::lexer::{Lexer, Token, TokenKind};
use crate::re::program::CompiledRegex;
use crate::re::thompson::instr::{
    disassemble, CharClass, Instr, Offset, Predicate,
};
use crate::re::{
    ClassProvider, CompileError, Flag, Flags, MAX_NESTING, MAX_PROGRAM_LEN,
};

/// Compiles patterns into [`CompiledRegex`].
///
/// ```
/// # use ling_regex::{Compiler, Flag};
/// let regex = Compiler::new()
///     .flags(Flag::CaseInsensitive | Flag::AutoWordBoundaries)
///     .compile("abc")
///     .unwrap();
///
/// assert!(regex.match_at("ABC", 0).is_some());
/// assert!(regex.match_at("ABCD", 0).is_none());
/// ```
#[derive(Default)]
pub struct Compiler<'p> {
    flags: Flags,
    provider: Option<&'p dyn ClassProvider>,
}

impl<'p> Compiler<'p> {
    /// Creates a compiler with no flags and no class provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flags used by the compiler.
    pub fn flags<F: Into<Flags>>(mut self, flags: F) -> Self {
        self.flags = flags.into();
        self
    }

    /// Sets the provider for word lists and diacritic variants. Without
    /// a provider `\p{WordList(...)}` is an error, and diacritic variants
    /// come from a built-in table.
    pub fn class_provider(mut self, provider: &'p dyn ClassProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Compiles a pattern.
    pub fn compile(&self, pattern: &str) -> Result<CompiledRegex, CompileError> {
        self.compile_internal(pattern, None)
    }

    /// Compiles a pattern whose matches are tagged with `id`. This is
    /// useful for combining many programs with [`CompiledRegex::or`] and
    /// telling which of them matched with [`crate::Match::id`].
    pub fn compile_with_id(
        &self,
        pattern: &str,
        id: u32,
    ) -> Result<CompiledRegex, CompileError> {
        self.compile_internal(pattern, Some(id))
    }

    fn compile_internal(
        &self,
        pattern: &str,
        id: Option<u32>,
    ) -> Result<CompiledRegex, CompileError> {
        let mut parser = Parser::new(pattern, self.flags, self.provider)?;
        let body = parser.parse_alternation()?;

        match parser.token.kind {
            TokenKind::Eoi => {}
            TokenKind::RParen => {
                return Err(CompileError::UnbalancedParenthesis {
                    offset: parser.token.offset,
                })
            }
            _ => return Err(parser.unexpected()),
        }

        let auto_boundaries =
            self.flags.contains(Flag::AutoWordBoundaries);

        let mut code = InstrSeq::new();

        if auto_boundaries {
            code.emit_instr(Instr::Predicate(Predicate::NotWithinWord))?;
        }

        code.append(body)?;

        if auto_boundaries {
            code.emit_instr(Instr::Predicate(Predicate::NotWithinWord))?;
        }

        code.emit_instr(Instr::Match(id))?;

        #[cfg(feature = "logging")]
        debug!(
            "compiled pattern {:?}: {} instructions, {} groups",
            pattern,
            code.location(),
            parser.groups
        );

        Ok(CompiledRegex::new(code.into_inner(), parser.groups + 1))
    }
}

/// Sequence of instructions for the VM.
#[derive(Debug, Default, Clone)]
pub(crate) struct InstrSeq {
    seq: Vec<Instr>,
}

impl InstrSeq {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the address where the next instruction will be emitted.
    #[inline]
    pub fn location(&self) -> usize {
        self.seq.len()
    }

    /// Adds an instruction at the end of the sequence and returns its
    /// address.
    pub fn emit_instr(&mut self, instr: Instr) -> Result<usize, CompileError> {
        let location = self.location();
        if location >= MAX_PROGRAM_LEN {
            return Err(CompileError::TooLarge);
        }
        self.seq.push(instr);
        Ok(location)
    }

    /// Adds a copy of `other` at the end of the sequence and returns the
    /// address where the copy starts.
    pub fn emit_seq(&mut self, other: &InstrSeq) -> Result<usize, CompileError> {
        let location = self.location();
        if location + other.location() > MAX_PROGRAM_LEN {
            return Err(CompileError::TooLarge);
        }
        self.seq.extend_from_slice(other.seq.as_slice());
        Ok(location)
    }

    /// Moves `other` to the end of the sequence and returns the address
    /// where it starts.
    pub fn append(&mut self, mut other: InstrSeq) -> Result<usize, CompileError> {
        let location = self.location();
        if location + other.location() > MAX_PROGRAM_LEN {
            return Err(CompileError::TooLarge);
        }
        self.seq.append(&mut other.seq);
        Ok(location)
    }

    /// Changes the target of the jump at `location`, or the second target
    /// of the split at `location`.
    ///
    /// # Panics
    ///
    /// If the instruction at `location` is not a jump or a split.
    pub fn patch_instr(&mut self, location: usize, target: usize) {
        let offset = (target as isize - location as isize) as Offset;
        match &mut self.seq[location] {
            Instr::Jump(o) | Instr::Split(_, o) => *o = offset,
            _ => unreachable!(),
        }
    }

    /// Consumes the sequence and returns the instructions.
    pub fn into_inner(self) -> Vec<Instr> {
        self.seq
    }
}

impl Display for InstrSeq {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        disassemble(self.seq.as_slice(), f)
    }
}

/// Parser state during the compilation of a single pattern.
struct Parser<'a, 'p> {
    lexer: Lexer<'a>,
    /// The token being examined. The next one hasn't been read from the
    /// lexer yet.
    token: Token,
    flags: Flags,
    provider: Option<&'p dyn ClassProvider>,
    /// Number of groups found so far.
    groups: usize,
    /// Current nesting level of groups.
    depth: usize,
}

impl<'a, 'p> Parser<'a, 'p> {
    fn new(
        pattern: &'a str,
        flags: Flags,
        provider: Option<&'p dyn ClassProvider>,
    ) -> Result<Self, CompileError> {
        let mut lexer = Lexer::new(pattern);
        let token = lexer.next_token()?;
        Ok(Self { lexer, token, flags, provider, groups: 0, depth: 0 })
    }

    /// Moves to the next token and returns the one that was being examined.
    fn advance(&mut self) -> Result<Token, CompileError> {
        let next = self.lexer.next_token()?;
        Ok(mem::replace(&mut self.token, next))
    }

    /// Same as [`Parser::advance`], but fails if the current token is not
    /// of the given kind.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.token.kind != kind {
            return Err(self.unexpected());
        }
        self.advance()
    }

    /// Returns an error for the current token.
    fn unexpected(&self) -> CompileError {
        CompileError::UnexpectedToken {
            token: self.token.kind.to_string(),
            offset: self.token.offset,
        }
    }

    fn parse_alternation(&mut self) -> Result<InstrSeq, CompileError> {
        let mut alternatives = vec![self.parse_concat()?];
        while self.token.kind == TokenKind::Pipe {
            self.advance()?;
            alternatives.push(self.parse_concat()?);
        }
        emit_alternation(alternatives)
    }

    fn parse_concat(&mut self) -> Result<InstrSeq, CompileError> {
        let mut code = InstrSeq::new();
        loop {
            match self.token.kind {
                TokenKind::Pipe | TokenKind::RParen | TokenKind::Eoi => {
                    return Ok(code)
                }
                _ => {
                    let fragment = self.parse_repeat()?;
                    code.append(fragment)?;
                }
            }
        }
    }

    fn parse_repeat(&mut self) -> Result<InstrSeq, CompileError> {
        let mut code = self.parse_atom()?;
        loop {
            code = match self.token.kind {
                TokenKind::Opt => {
                    self.advance()?;
                    emit_repetition(code, 0, Some(1))?
                }
                TokenKind::Star => {
                    self.advance()?;
                    emit_repetition(code, 0, None)?
                }
                TokenKind::Plus => {
                    self.advance()?;
                    emit_repetition(code, 1, None)?
                }
                TokenKind::LBrace => {
                    let (min, max) = self.parse_count()?;
                    emit_repetition(code, min, max)?
                }
                _ => return Ok(code),
            }
        }
    }

    /// Parses `{n}`, `{n,}`, `{,m}` and `{n,m}`, returning the minimum
    /// and maximum number of repetitions.
    fn parse_count(&mut self) -> Result<(u32, Option<u32>), CompileError> {
        let open = self.advance()?;
        let malformed = CompileError::MalformedRepetition { offset: open.offset };

        let min = match self.token.kind {
            TokenKind::Int(n) => {
                self.advance()?;
                Some(n)
            }
            _ => None,
        };

        let (min, max) = if self.token.kind == TokenKind::Comma {
            self.advance()?;
            let max = match self.token.kind {
                TokenKind::Int(n) => {
                    self.advance()?;
                    Some(n)
                }
                _ => None,
            };
            match (min, max) {
                (None, None) => return Err(malformed),
                (min, max) => (min.unwrap_or(0), max),
            }
        } else {
            match min {
                Some(n) => (n, Some(n)),
                None => return Err(malformed),
            }
        };

        if self.token.kind != TokenKind::RBrace {
            return Err(malformed);
        }

        self.advance()?;

        if max.is_some_and(|max| max < min) {
            return Err(malformed);
        }

        Ok((min, max))
    }

    fn parse_atom(&mut self) -> Result<InstrSeq, CompileError> {
        let token = self.advance()?;
        let mut code = InstrSeq::new();

        match token.kind {
            TokenKind::Char(c) => {
                self.emit_literal(&mut code, c)?;
            }
            TokenKind::Dot => {
                code.emit_instr(Instr::AnyChar)?;
            }
            TokenKind::DigitClass => {
                code.emit_instr(class_instr(DIGIT_RANGES))?;
            }
            TokenKind::WordClass => {
                code.emit_instr(class_instr(WORD_RANGES))?;
            }
            TokenKind::SpaceClass => {
                code.emit_instr(class_instr(SPACE_RANGES))?;
            }
            TokenKind::WordBoundary => {
                code.emit_instr(Instr::Predicate(Predicate::WordBoundary))?;
            }
            TokenKind::LParen => return self.parse_group(token.offset),
            TokenKind::LBracket => return self.parse_charset(token.offset),
            TokenKind::NamedClass => return self.parse_named_class(),
            TokenKind::Opt
            | TokenKind::Star
            | TokenKind::Plus
            | TokenKind::LBrace => {
                return Err(CompileError::NothingToRepeat {
                    offset: token.offset,
                })
            }
            kind => {
                return Err(CompileError::UnexpectedToken {
                    token: kind.to_string(),
                    offset: token.offset,
                })
            }
        }

        Ok(code)
    }

    /// Parses a group after its opening parenthesis, which is at `offset`.
    fn parse_group(&mut self, offset: usize) -> Result<InstrSeq, CompileError> {
        self.depth += 1;

        if self.depth > MAX_NESTING {
            return Err(CompileError::NestingTooDeep { offset });
        }

        // Groups are numbered by the position of their opening parenthesis.
        // Slots 0 and 1 belong to the whole match.
        self.groups += 1;

        if self.groups >= MAX_PROGRAM_LEN {
            return Err(CompileError::TooLarge);
        }

        let slot = self.groups * 2;

        // save slot
        // ... body ...
        // save slot + 1
        let mut code = InstrSeq::new();
        code.emit_instr(Instr::Save(slot))?;
        code.append(self.parse_alternation()?)?;

        if self.token.kind != TokenKind::RParen {
            return Err(CompileError::UnbalancedParenthesis { offset });
        }

        self.advance()?;
        code.emit_instr(Instr::Save(slot + 1))?;

        self.depth -= 1;

        Ok(code)
    }

    /// Parses a character set after its opening bracket, which is at
    /// `offset`.
    fn parse_charset(&mut self, offset: usize) -> Result<InstrSeq, CompileError> {
        let negated = if self.token.kind == TokenKind::Caret {
            self.advance()?;
            true
        } else {
            false
        };

        let mut ranges = Vec::new();

        loop {
            let token = self.advance()?;
            match token.kind {
                TokenKind::RBracket => break,
                TokenKind::Eoi => {
                    return Err(CompileError::UnclosedCharSet { offset })
                }
                TokenKind::DigitClass => ranges.extend_from_slice(DIGIT_RANGES),
                TokenKind::WordClass => ranges.extend_from_slice(WORD_RANGES),
                TokenKind::SpaceClass => ranges.extend_from_slice(SPACE_RANGES),
                // A dash that is not between two characters is a literal.
                TokenKind::Dash => ranges.push(('-', '-')),
                TokenKind::Char(start) => {
                    if self.token.kind != TokenKind::Dash {
                        ranges.push((start, start));
                        continue;
                    }
                    self.advance()?;
                    match self.token.kind {
                        TokenKind::RBracket => {
                            ranges.push((start, start));
                            ranges.push(('-', '-'));
                        }
                        TokenKind::Char(end) if end >= start => {
                            self.advance()?;
                            ranges.push((start, end));
                        }
                        TokenKind::Eoi => {
                            return Err(CompileError::UnclosedCharSet { offset })
                        }
                        _ => {
                            return Err(CompileError::InvalidRange {
                                offset: token.offset,
                            })
                        }
                    }
                }
                kind => {
                    return Err(CompileError::UnexpectedToken {
                        token: kind.to_string(),
                        offset: token.offset,
                    })
                }
            }
        }

        let mut code = InstrSeq::new();
        code.emit_instr(Instr::CharSet(self.fold_ranges(ranges, negated)))?;
        Ok(code)
    }

    /// Parses `{Name}` or `{WordList(Name)}` after a `\p`.
    fn parse_named_class(&mut self) -> Result<InstrSeq, CompileError> {
        self.expect(TokenKind::LBrace)?;

        let (name, name_offset) = self.expect_name()?;

        let code = if name == "WordList" {
            self.expect(TokenKind::LParen)?;
            let (list, list_offset) = self.expect_name()?;
            self.expect(TokenKind::RParen)?;
            self.emit_word_list(&list, list_offset)?
        } else {
            let class = NamedClass::from_name(&name).ok_or_else(|| {
                CompileError::UnknownClass {
                    name: name.clone(),
                    offset: name_offset,
                }
            })?;
            let mut code = InstrSeq::new();
            code.emit_instr(Instr::NamedClass(class))?;
            code
        };

        self.expect(TokenKind::RBrace)?;

        Ok(code)
    }

    fn expect_name(&mut self) -> Result<(String, usize), CompileError> {
        if !matches!(self.token.kind, TokenKind::Name(_)) {
            return Err(self.unexpected());
        }
        match self.advance()? {
            Token { kind: TokenKind::Name(name), offset } => Ok((name, offset)),
            _ => unreachable!(),
        }
    }

    /// Emits an alternation with all the words in a list.
    fn emit_word_list(
        &self,
        name: &str,
        offset: usize,
    ) -> Result<InstrSeq, CompileError> {
        let words = self
            .provider
            .and_then(|provider| provider.word_list(name))
            .ok_or_else(|| CompileError::UnknownWordList {
                name: name.to_string(),
                offset,
            })?;

        let alternatives = words
            .iter()
            .map(|word| {
                let mut code = InstrSeq::new();
                for c in word.chars() {
                    self.emit_literal(&mut code, c)?;
                }
                Ok(code)
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        emit_alternation(alternatives)
    }

    /// Emits the instruction that matches the literal `c`, taking the
    /// case and diacritics flags into account.
    fn emit_literal(
        &self,
        code: &mut InstrSeq,
        c: char,
    ) -> Result<usize, CompileError> {
        let variants = self.char_variants(c);
        if variants.len() == 1 {
            code.emit_instr(Instr::Char(c))
        } else {
            code.emit_instr(Instr::CharSet(CharClass::new(
                variants.into_iter().map(|v| (v, v)),
                false,
            )))
        }
    }

    /// Returns `c` and all the characters that must be matched as if they
    /// were `c`, according to the flags.
    fn char_variants(&self, c: char) -> Vec<char> {
        let case_insensitive = self.flags.contains(Flag::CaseInsensitive);
        let mut variants = vec![c];

        if case_insensitive {
            variants.extend(case_variants(c));
        }

        if self.flags.contains(Flag::DiacriticsInsensitive) {
            for v in variants.clone() {
                variants.extend(self.diacritic_variants(v));
            }
            if case_insensitive {
                for v in variants.clone() {
                    variants.extend(case_variants(v));
                }
            }
        }

        variants.into_iter().sorted_unstable().dedup().collect()
    }

    fn diacritic_variants(&self, c: char) -> Vec<char> {
        match self.provider {
            Some(provider) => provider.diacritic_variants(c),
            None => latin_variants(c),
        }
    }

    /// Builds the class for a character set. With case or diacritics
    /// insensitivity every member is expanded before the set is negated,
    /// so `[^a]` doesn't match `A` when case insensitive.
    fn fold_ranges(&self, ranges: Vec<(char, char)>, negated: bool) -> CharClass {
        if !self.flags.intersects(
            Flag::CaseInsensitive | Flag::DiacriticsInsensitive,
        ) {
            return CharClass::new(ranges, negated);
        }

        let mut folded = ranges.clone();

        for (start, end) in ranges {
            // Only letters have case or diacritic variants.
            for c in (start..=end).filter(|c| c.is_alphabetic()) {
                folded.extend(
                    self.char_variants(c)
                        .into_iter()
                        .filter(|v| *v != c)
                        .map(|v| (v, v)),
                );
            }
        }

        CharClass::new(folded, negated)
    }
}

fn class_instr(ranges: &[(char, char)]) -> Instr {
    Instr::CharSet(CharClass::new(ranges.iter().copied(), false))
}

/// Emits the code for an alternation. Alternatives that appear first have
/// higher priority.
///
/// ```text
/// l0: split l1, l2
/// l1: ... alternative 1 ...
///     jump lN
/// l2: split l3, l4
/// l3: ... alternative 2 ...
///     jump lN
/// l4: ... alternative 3 ...
/// lN:
/// ```
///
/// An empty list of alternatives produces code that never matches.
fn emit_alternation(
    alternatives: Vec<InstrSeq>,
) -> Result<InstrSeq, CompileError> {
    let mut code = InstrSeq::new();

    if alternatives.is_empty() {
        code.emit_instr(Instr::CharSet(CharClass::new([], false)))?;
        return Ok(code);
    }

    let last = alternatives.len() - 1;
    let mut jumps = Vec::with_capacity(last);

    for (i, alternative) in alternatives.into_iter().enumerate() {
        if i == last {
            code.append(alternative)?;
            break;
        }
        let split = code.emit_instr(Instr::Split(1, 0))?;
        code.append(alternative)?;
        jumps.push(code.emit_instr(Instr::Jump(0))?);
        code.patch_instr(split, code.location());
    }

    let end = code.location();

    for jump in jumps {
        code.patch_instr(jump, end);
    }

    Ok(code)
}

/// Emits the code that repeats `body` between `min` and `max` times. When
/// `max` is `None` there's no upper limit. All repetitions are greedy.
///
/// The body is copied `min` times, followed by the code for the optional
/// part. With an upper limit each optional copy is preceded by a split
/// that jumps to the end of the whole repetition.
///
/// ```text
/// a{2,4}                    a{2,}               a*
///
/// l0: ... a ...             l0: ... a ...       l0: split l1, l3
///     ... a ...                 ... a ...       l1: ... a ...
///     split l1, lN          l1: split l0, l2    l2: jump l0
/// l1: ... a ...             l2:                 l3:
///     split l2, lN
/// l2: ... a ...
/// lN:
/// ```
fn emit_repetition(
    body: InstrSeq,
    min: u32,
    max: Option<u32>,
) -> Result<InstrSeq, CompileError> {
    let len = body.location();
    let copies = max.unwrap_or(min).max(min) as usize + 1;

    if copies.saturating_mul(len + 1) > MAX_PROGRAM_LEN {
        return Err(CompileError::TooLarge);
    }

    let mut code = InstrSeq::new();

    match max {
        None if min == 0 => {
            let split = code.emit_instr(Instr::Split(1, 0))?;
            code.append(body)?;
            let jump = code.emit_instr(Instr::Jump(0))?;
            code.patch_instr(jump, split);
            code.patch_instr(split, code.location());
        }
        None => {
            for _ in 0..min {
                code.emit_seq(&body)?;
            }
            code.emit_instr(Instr::Split(-(len as Offset), 1))?;
        }
        Some(max) => {
            for _ in 0..min {
                code.emit_seq(&body)?;
            }
            let optional = (max - min) as usize;
            for i in 0..optional {
                let skip = (optional - i) * (len + 1);
                code.emit_instr(Instr::Split(1, skip as Offset))?;
                code.emit_seq(&body)?;
            }
        }
    }

    Ok(code)
}
