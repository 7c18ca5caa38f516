/*! A regexp compiler based on the [Thompson's construction][1] algorithm that
produces code for the Pike VM described in Russ Cox's article
[Regular Expression Matching: the Virtual Machine Approach][2].

Repetitions are expressed by copying the repeated code, as in the original
algorithm. A pattern like `a{2,4}` produces the same code as `aa(a(a)?)?`,
except for the groups. The size of the code is thus proportional to the
repetition counts written in the pattern.

The VM tracks capture groups, which are recorded by `SAVE` instructions,
and follows leftmost-first semantics: when two alternatives match at the
same position, the one that appears first in the pattern wins, even if
the other one produces a longer match.

[1]: https://en.wikipedia.org/wiki/Thompson%27s_construction
[2]: https://swtch.com/~rsc/regexp/regexp2.html
*/

pub use compiler::Compiler;

pub(crate) mod compiler;
pub(crate) mod instr;
pub(crate) mod pikevm;
