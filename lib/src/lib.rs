/*! A regular expression engine for linguistic pipelines.

Patterns are compiled into a small instruction set and executed by a Pike
VM, which runs every alternative of the pattern in lock-step instead of
backtracking. Memory usage is bounded by the size of the program, no matter
how long the input is.

Besides the usual constructs (alternation, groups, quantifiers, character
sets) patterns can use named classes like `\p{Punct}` and word lists like
`\p{WordList(Name)}`, where the words come from a [`ClassProvider`].
Compilation can be made insensitive to case and to diacritics, and can
restrict matches to word boundaries.

Alternatives follow leftmost-first semantics: when two alternatives match
at the same position the one written first wins, even if the other one is
longer.

# Example

```rust
use ling_regex::{compile, Flag, Matcher};

let regex = compile(r"(\d+)\s*(km|m)", Flag::CaseInsensitive.into(), None)
    .unwrap();

let m = regex.find_first_in("about 12 KM away").unwrap();

assert_eq!(m.as_str(), "12 KM");
assert_eq!(m.group(1), Some("12"));
assert_eq!(m.group(2), Some("KM"));

// Every offset in the input is tried in turn.
let starts: Vec<usize> = Matcher::new(&regex, "3m 45m")
    .map(|m| m.start())
    .collect();

assert_eq!(starts, vec![0, 3, 4]);
```
*/

#![deny(missing_docs)]

pub use config::load_config_from_file;
pub use config::Config;
pub use config::RegexConfig;

pub use re::classes::latin_variants;
pub use re::compile;
pub use re::thompson::instr::CharClass;
pub use re::thompson::instr::Instr;
pub use re::thompson::instr::Offset;
pub use re::thompson::instr::Predicate;
pub use re::thompson::Compiler;
pub use re::ClassProvider;
pub use re::CompileError;
pub use re::CompiledRegex;
pub use re::Flag;
pub use re::Flags;
pub use re::LexError;
pub use re::Match;
pub use re::Matcher;
pub use re::NamedClass;
pub use re::SerializationError;
pub use re::WordLists;
pub use re::MAX_NESTING;
pub use re::MAX_PROGRAM_LEN;

mod config;
mod re;

#[cfg(test)]
mod tests;
