/*!
This module defines the instructions executed by Pike's VM.

Programs are plain vectors of [`Instr`]. Jumps and splits don't contain
absolute addresses, they contain offsets relative to the address of the
instruction itself. This allows copying a fragment of code to a different
position without patching it, which is how repetitions like `a{3,5}` are
compiled.

Instructions fall in two groups:

* Consuming instructions, which test the character at the current position
  and either let the thread advance to the next character or kill it:
  [`Instr::Char`], [`Instr::AnyChar`], [`Instr::CharSet`] and
  [`Instr::NamedClass`]. [`Instr::Match`] is grouped with them because it
  also needs the thread to reach the main loop of the VM.
* Non-consuming instructions, which are resolved while computing epsilon
  closures and never reach the main loop of the VM: [`Instr::Split`],
  [`Instr::Jump`], [`Instr::Save`] and [`Instr::Predicate`].
 */

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::re::classes::{is_word_char, NamedClass};

/// Offset for jump and split instructions. The offset is always relative to
/// the address of the instruction.
pub type Offset = i32;

/// Instructions supported by the Pike VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instr {
    /// Match for the regexp has been found. Contains the identifier of the
    /// alternative that matched, if any.
    Match(Option<u32>),

    /// Matches any character.
    AnyChar,

    /// Matches a specific character.
    Char(char),

    /// Matches any character in a set.
    CharSet(CharClass),

    /// Matches any character in a named class.
    NamedClass(NamedClass),

    /// Creates a new thread that starts at the second offset. The current
    /// thread continues at the first offset, and has higher priority.
    Split(Offset, Offset),

    /// Continues executing the code at the given offset.
    Jump(Offset),

    /// Stores the current position in the given capture slot.
    Save(usize),

    /// Zero-width assertion. The thread continues only if the assertion
    /// holds at the current position.
    Predicate(Predicate),
}

impl Instr {
    /// Returns true for instructions that consume a character from the
    /// input.
    pub fn is_consuming(&self) -> bool {
        matches!(
            self,
            Instr::AnyChar
                | Instr::Char(_)
                | Instr::CharSet(_)
                | Instr::NamedClass(_)
        )
    }
}

/// Zero-width assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// One of the characters around the current position is a word
    /// character and the other one is not (`\b`).
    WordBoundary,
    /// The current position is not between two word characters. Used for
    /// automatic word boundaries.
    NotWithinWord,
}

impl Predicate {
    /// Returns true if the predicate holds at a position that sits between
    /// `prev` and `next`. Any of them can be `None` at the start or the end
    /// of the input.
    #[inline]
    pub fn holds(&self, prev: Option<char>, next: Option<char>) -> bool {
        let prev_is_word = prev.is_some_and(is_word_char);
        let next_is_word = next.is_some_and(is_word_char);
        match self {
            Predicate::WordBoundary => prev_is_word != next_is_word,
            Predicate::NotWithinWord => !(prev_is_word && next_is_word),
        }
    }
}

/// A set of characters represented as a list of ranges.
///
/// Ranges are sorted, and there are no overlapping or adjacent ranges in
/// the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharClass {
    ranges: Vec<(char, char)>,
    negated: bool,
}

impl CharClass {
    /// Creates a class from a list of inclusive ranges, in any order. If
    /// `negated` is true the class contains every character that is not in
    /// the ranges.
    pub fn new<I>(ranges: I, negated: bool) -> Self
    where
        I: IntoIterator<Item = (char, char)>,
    {
        let mut sorted: Vec<(char, char)> = ranges
            .into_iter()
            .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
            .collect();

        sorted.sort_unstable();

        let mut merged: Vec<(char, char)> = Vec::with_capacity(sorted.len());

        for (start, end) in sorted {
            match merged.last_mut() {
                Some(last) if start as u32 <= last.1 as u32 + 1 => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }

        Self { ranges: merged, negated }
    }

    /// Ranges in the class.
    pub fn ranges(&self) -> &[(char, char)] {
        self.ranges.as_slice()
    }

    /// True if the class contains the characters that are *not* in the
    /// ranges.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns true if `c` belongs to the class.
    #[inline]
    pub fn contains(&self, c: char) -> bool {
        let in_ranges = self
            .ranges
            .binary_search_by(|(start, end)| {
                if *end < c {
                    std::cmp::Ordering::Less
                } else if *start > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();

        in_ranges != self.negated
    }
}

impl Display for CharClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        if self.negated {
            write!(f, "^")?;
        }
        for (start, end) in &self.ranges {
            if start == end {
                write!(f, "{}", start.escape_debug())?;
            } else {
                write!(f, "{}-{}", start.escape_debug(), end.escape_debug())?;
            }
        }
        write!(f, "]")
    }
}

/// Applies a relative offset to an address.
#[inline]
pub(crate) fn apply_offset(addr: usize, offset: Offset) -> usize {
    (addr as isize + offset as isize) as usize
}

/// Writes a listing of the program, one instruction per line. Jump and
/// split targets are shown as absolute addresses.
pub(crate) fn disassemble(
    code: &[Instr],
    f: &mut Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f)?;

    for (addr, instr) in code.iter().enumerate() {
        match instr {
            Instr::Match(None) => {
                writeln!(f, "{:05x}: MATCH", addr)?;
            }
            Instr::Match(Some(id)) => {
                writeln!(f, "{:05x}: MATCH {}", addr, id)?;
            }
            Instr::AnyChar => {
                writeln!(f, "{:05x}: ANY_CHAR", addr)?;
            }
            Instr::Char(c) => {
                writeln!(f, "{:05x}: CHAR {:?}", addr, c)?;
            }
            Instr::CharSet(class) => {
                writeln!(f, "{:05x}: CHAR_SET {}", addr, class)?;
            }
            Instr::NamedClass(class) => {
                writeln!(f, "{:05x}: NAMED_CLASS {}", addr, class)?;
            }
            Instr::Split(a, b) => {
                writeln!(
                    f,
                    "{:05x}: SPLIT {:05x} {:05x}",
                    addr,
                    apply_offset(addr, *a),
                    apply_offset(addr, *b),
                )?;
            }
            Instr::Jump(offset) => {
                writeln!(
                    f,
                    "{:05x}: JUMP {:05x}",
                    addr,
                    apply_offset(addr, *offset),
                )?;
            }
            Instr::Save(slot) => {
                writeln!(f, "{:05x}: SAVE {}", addr, slot)?;
            }
            Instr::Predicate(Predicate::WordBoundary) => {
                writeln!(f, "{:05x}: WORD_BOUNDARY", addr)?;
            }
            Instr::Predicate(Predicate::NotWithinWord) => {
                writeln!(f, "{:05x}: NOT_WITHIN_WORD", addr)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{CharClass, Predicate};

    #[test]
    fn char_class() {
        let class =
            CharClass::new([('x', 'z'), ('a', 'c'), ('d', 'f'), ('b', 'b')], false);

        assert_eq!(class.ranges(), &[('a', 'f'), ('x', 'z')]);
        assert!(class.contains('a'));
        assert!(class.contains('e'));
        assert!(class.contains('z'));
        assert!(!class.contains('g'));
        assert_eq!(class.to_string(), "[a-fx-z]");

        let class = CharClass::new([('0', '9'), ('_', '_')], true);
        assert!(!class.contains('5'));
        assert!(!class.contains('_'));
        assert!(class.contains('a'));
        assert_eq!(class.to_string(), "[^0-9_]");

        let empty = CharClass::new([], false);
        assert!(!empty.contains('a'));
    }

    #[test]
    fn predicates() {
        let wb = Predicate::WordBoundary;
        assert!(wb.holds(None, Some('a')));
        assert!(wb.holds(Some('a'), None));
        assert!(wb.holds(Some('a'), Some(' ')));
        assert!(!wb.holds(Some('a'), Some('é')));
        assert!(!wb.holds(Some(','), Some(' ')));
        assert!(!wb.holds(None, None));

        let nww = Predicate::NotWithinWord;
        assert!(nww.holds(None, Some('a')));
        assert!(nww.holds(Some(','), Some(' ')));
        assert!(nww.holds(None, None));
        assert!(!nww.holds(Some('a'), Some('b')));
    }
}
