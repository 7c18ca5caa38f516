/*! Character classes known to the engine.

This module contains the table of named classes accepted in `\p{Name}`,
the predefined sets for `\d`, `\w` and `\s`, the built-in table used for
diacritic-insensitive matching, and [`WordLists`], a simple
[`ClassProvider`] backed by hash maps.
 */

use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::re::ClassProvider;

/// Character classes that can be used in patterns with the `\p{Name}`
/// syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedClass {
    /// Lower-case letters.
    Lower,
    /// Upper-case letters.
    Upper,
    /// Characters in the ASCII range.
    Ascii,
    /// Alphabetic characters.
    Alpha,
    /// Numeric characters.
    Digit,
    /// Alphabetic or numeric characters.
    Alnum,
    /// ASCII punctuation characters.
    Punct,
}

/// Names accepted in `\p{...}`.
const NAMED_CLASSES: &[(&str, NamedClass)] = &[
    ("Lower", NamedClass::Lower),
    ("Upper", NamedClass::Upper),
    ("ASCII", NamedClass::Ascii),
    ("Alpha", NamedClass::Alpha),
    ("Digit", NamedClass::Digit),
    ("Alnum", NamedClass::Alnum),
    ("Punct", NamedClass::Punct),
];

impl NamedClass {
    /// Returns the class with the given name, as written in `\p{Name}`.
    pub fn from_name(name: &str) -> Option<Self> {
        NAMED_CLASSES
            .iter()
            .find(|(class_name, _)| *class_name == name)
            .map(|(_, class)| *class)
    }

    /// Returns the name of the class, as written in `\p{Name}`.
    pub fn name(&self) -> &'static str {
        NAMED_CLASSES
            .iter()
            .find(|(_, class)| class == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }

    /// Returns true if `c` belongs to this class.
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        match self {
            NamedClass::Lower => c.is_lowercase(),
            NamedClass::Upper => c.is_uppercase(),
            NamedClass::Ascii => c.is_ascii(),
            NamedClass::Alpha => c.is_alphabetic(),
            NamedClass::Digit => c.is_numeric(),
            NamedClass::Alnum => c.is_alphanumeric(),
            NamedClass::Punct => c.is_ascii_punctuation(),
        }
    }
}

impl Display for NamedClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ranges matched by `\d`.
pub(crate) const DIGIT_RANGES: &[(char, char)] = &[('0', '9')];

/// Ranges matched by `\w`.
pub(crate) const WORD_RANGES: &[(char, char)] =
    &[('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')];

/// Ranges matched by `\s`.
pub(crate) const SPACE_RANGES: &[(char, char)] =
    &[('\t', '\r'), (' ', ' ')];

/// Returns true if `c` is a word character for the purpose of word
/// boundaries.
#[inline]
pub(crate) fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Lower-case Latin letters followed by the same letter with diacritics.
const LATIN_DIACRITICS: &[(char, &str)] = &[
    ('a', "àáâãäåāăą"),
    ('c', "çćĉċč"),
    ('d', "ďđ"),
    ('e', "èéêëēĕėęě"),
    ('g', "ĝğġģ"),
    ('h', "ĥħ"),
    ('i', "ìíîïĩīĭį"),
    ('j', "ĵ"),
    ('k', "ķ"),
    ('l', "ĺļľŀł"),
    ('n', "ñńņň"),
    ('o', "òóôõöøōŏő"),
    ('r', "ŕŗř"),
    ('s', "śŝşšș"),
    ('t', "ţťŧț"),
    ('u', "ùúûüũūŭůűų"),
    ('w', "ŵ"),
    ('y', "ýÿŷ"),
    ('z', "źżž"),
];

/// Converts `c` to lower case, as long as the result is a single char.
fn single_lowercase(c: char) -> Option<char> {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => Some(l),
        _ => None,
    }
}

/// Converts `c` to upper case, as long as the result is a single char.
fn single_uppercase(c: char) -> Option<char> {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => Some(u),
        _ => None,
    }
}

/// Returns the case variants of `c`, `c` excluded.
pub(crate) fn case_variants(c: char) -> impl Iterator<Item = char> {
    [single_lowercase(c), single_uppercase(c)]
        .into_iter()
        .flatten()
        .filter(move |v| *v != c)
}

/// Returns the letters that differ from `c` only in diacritics, according
/// to the built-in table of Latin letters. The case of `c` is preserved,
/// and `c` itself is not included in the result.
///
/// ```
/// # use ling_regex::latin_variants;
/// assert!(latin_variants('e').contains(&'é'));
/// assert!(latin_variants('É').contains(&'E'));
/// ```
pub fn latin_variants(c: char) -> Vec<char> {
    let lower = match single_lowercase(c) {
        Some(lower) => lower,
        None => return Vec::new(),
    };

    let row = LATIN_DIACRITICS
        .iter()
        .find(|(base, marked)| *base == lower || marked.contains(lower));

    let (base, marked) = match row {
        Some(row) => row,
        None => return Vec::new(),
    };

    let is_upper = c != lower;

    std::iter::once(*base)
        .chain(marked.chars())
        .filter_map(|v| if is_upper { single_uppercase(v) } else { Some(v) })
        .filter(|v| *v != c)
        .collect()
}

/// A [`ClassProvider`] that keeps word lists and diacritic variants in
/// memory.
///
/// Characters without explicit variants fall back to the built-in Latin
/// table.
#[derive(Debug, Default, Clone)]
pub struct WordLists {
    lists: FxHashMap<String, Vec<String>>,
    variants: FxHashMap<char, Vec<char>>,
}

impl WordLists {
    /// Creates an empty [`WordLists`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a word list that can be used in patterns as
    /// `\p{WordList(name)}`. If a list with the same name already exists,
    /// it is replaced.
    pub fn add_list<N, I, W>(&mut self, name: N, words: I) -> &mut Self
    where
        N: Into<String>,
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        self.lists
            .insert(name.into(), words.into_iter().map(Into::into).collect());
        self
    }

    /// Declares that all the characters in `chars` are the same letter
    /// with different diacritics. Each of them becomes a variant of all
    /// the others.
    pub fn add_variants(&mut self, chars: &[char]) -> &mut Self {
        for c in chars {
            let entry = self.variants.entry(*c).or_default();
            for v in chars.iter().filter(|v| *v != c) {
                if !entry.contains(v) {
                    entry.push(*v);
                }
            }
        }
        self
    }
}

impl ClassProvider for WordLists {
    fn word_list(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    fn diacritic_variants(&self, c: char) -> Vec<char> {
        match self.variants.get(&c) {
            Some(variants) => variants.clone(),
            None => latin_variants(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{latin_variants, NamedClass, WordLists};
    use crate::re::ClassProvider;

    #[test]
    fn named_classes() {
        assert_eq!(NamedClass::from_name("Punct"), Some(NamedClass::Punct));
        assert_eq!(NamedClass::from_name("ASCII"), Some(NamedClass::Ascii));
        assert_eq!(NamedClass::from_name("Bogus"), None);
        assert_eq!(NamedClass::Alnum.name(), "Alnum");

        assert!(NamedClass::Punct.matches(','));
        assert!(!NamedClass::Punct.matches('a'));
        assert!(NamedClass::Upper.matches('É'));
        assert!(NamedClass::Lower.matches('é'));
        assert!(!NamedClass::Ascii.matches('é'));
        assert!(NamedClass::Digit.matches('7'));
    }

    #[test]
    fn latin() {
        let variants = latin_variants('é');
        assert!(variants.contains(&'e'));
        assert!(variants.contains(&'è'));
        assert!(!variants.contains(&'é'));

        let variants = latin_variants('E');
        assert!(variants.contains(&'É'));
        assert!(!variants.contains(&'é'));

        assert_eq!(latin_variants('x'), Vec::<char>::new());
        assert_eq!(latin_variants('8'), Vec::<char>::new());
    }

    #[test]
    fn word_lists() {
        let mut lists = WordLists::new();
        lists.add_list("TestList", ["abc", "def"]).add_variants(&['ß', 's']);

        assert_eq!(
            lists.word_list("TestList"),
            Some(["abc".to_string(), "def".to_string()].as_slice())
        );
        assert_eq!(lists.word_list("Other"), None);
        assert_eq!(lists.diacritic_variants('ß'), vec!['s']);
        assert_eq!(lists.diacritic_variants('s'), vec!['ß']);
        assert!(lists.diacritic_variants('a').contains(&'à'));
    }
}
