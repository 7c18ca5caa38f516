/*! Matches and match iterators. */

use std::borrow::Cow;
use std::iter::FusedIterator;
use std::ops::Range;

use crate::re::program::CompiledRegex;
use crate::re::thompson::pikevm::PikeVM;
use crate::re::{compile, ClassProvider, CompileError, Flags};

/// A match found in some input.
///
/// Group 0 is the whole match, and always exists. Other groups exist only
/// if they participated in the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'h> {
    input: &'h str,
    /// Two slots per group, with the start and end of the group.
    saved: Vec<Option<usize>>,
    id: Option<u32>,
}

impl<'h> Match<'h> {
    pub(crate) fn new(
        input: &'h str,
        saved: Vec<Option<usize>>,
        id: Option<u32>,
    ) -> Self {
        debug_assert!(saved.len() >= 2 && saved[0].is_some() && saved[1].is_some());
        Self { input, saved, id }
    }

    /// Start offset of the match.
    #[inline]
    pub fn start(&self) -> usize {
        self.saved[0].unwrap_or_default()
    }

    /// End offset of the match. This is the offset of the first character
    /// that is not part of the match.
    #[inline]
    pub fn end(&self) -> usize {
        self.saved[1].unwrap_or_default()
    }

    /// Byte range of the match within the input.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Matching text.
    #[inline]
    pub fn as_str(&self) -> &'h str {
        &self.input[self.range()]
    }

    /// Returns true if the match is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start() == self.end()
    }

    /// The input where the match was found.
    #[inline]
    pub fn input(&self) -> &'h str {
        self.input
    }

    /// Identifier of the alternative that matched. This is the value
    /// passed to [`crate::Compiler::compile_with_id`], if any.
    #[inline]
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Number of groups in the program that produced the match, including
    /// group 0.
    #[inline]
    pub fn group_len(&self) -> usize {
        self.saved.len() / 2
    }

    /// Byte range of group `n`. Returns `None` if the group didn't
    /// participate in the match, or doesn't exist.
    pub fn group_range(&self, n: usize) -> Option<Range<usize>> {
        let start = (*self.saved.get(2 * n)?)?;
        let end = (*self.saved.get(2 * n + 1)?)?;
        Some(start..end)
    }

    /// Start offset of group `n`.
    pub fn group_start(&self, n: usize) -> Option<usize> {
        self.group_range(n).map(|range| range.start)
    }

    /// End offset of group `n`.
    pub fn group_end(&self, n: usize) -> Option<usize> {
        self.group_range(n).map(|range| range.end)
    }

    /// Text matched by group `n`.
    pub fn group(&self, n: usize) -> Option<&'h str> {
        self.group_range(n).map(|range| &self.input[range])
    }
}

/// Iterator over all the matches of a [`CompiledRegex`] in some input.
///
/// A match is attempted at every character boundary of the input, from
/// left to right, including the end of the input. Each offset is tried
/// exactly once, regardless of whether the previous attempt produced a
/// match or not. This means that matches can overlap:
///
/// ```
/// # use ling_regex::{compile, Flags, Matcher};
/// let regex = compile("a+", Flags::none(), None).unwrap();
/// let matches: Vec<_> =
///     Matcher::new(&regex, "aaa").map(|m| m.as_str()).collect();
///
/// assert_eq!(matches, vec!["aaa", "aa", "a"]);
/// ```
pub struct Matcher<'r, 'h> {
    regex: Cow<'r, CompiledRegex>,
    input: &'h str,
    /// Offset of the next match attempt. Goes past the end of the input
    /// once the iterator is exhausted.
    cursor: usize,
    vm: PikeVM,
}

impl<'r, 'h> Matcher<'r, 'h> {
    /// Creates a matcher for a compiled program.
    pub fn new(regex: &'r CompiledRegex, input: &'h str) -> Self {
        Self::with_regex(Cow::Borrowed(regex), input)
    }

    /// Compiles `pattern` and creates a matcher for it.
    pub fn from_pattern(
        pattern: &str,
        flags: Flags,
        provider: Option<&dyn ClassProvider>,
        input: &'h str,
    ) -> Result<Matcher<'static, 'h>, CompileError> {
        let regex = compile(pattern, flags, provider)?;
        Ok(Matcher::with_regex(Cow::Owned(regex), input))
    }

    fn with_regex(regex: Cow<'r, CompiledRegex>, input: &'h str) -> Self {
        Self { regex, input, cursor: 0, vm: PikeVM::new() }
    }

    /// The program used by this matcher.
    pub fn regex(&self) -> &CompiledRegex {
        self.regex.as_ref()
    }
}

impl<'h> Iterator for Matcher<'_, 'h> {
    type Item = Match<'h>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor <= self.input.len() {
            let start = self.cursor;

            self.cursor += self.input[start..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);

            let m = self.vm.try_match(
                self.regex.code(),
                self.regex.nb_saved(),
                self.input,
                start,
            );

            if m.is_some() {
                return m;
            }
        }
        None
    }
}

impl FusedIterator for Matcher<'_, '_> {}

#[cfg(test)]
impl Matcher<'_, '_> {
    pub(crate) fn vm(&self) -> &PikeVM {
        &self.vm
    }
}
