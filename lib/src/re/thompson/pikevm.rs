use std::mem;
use std::rc::Rc;

#[cfg(feature = "logging")]
use log::*;

use super::instr::{apply_offset, Instr};
use crate::re::matcher::Match;
use crate::re::threads::{ThreadId, ThreadPool, ThreadQueue};

/// Represents a [Pike's VM](https://swtch.com/~rsc/regexp/regexp2.html) that
/// executes VM code produced by the
/// [compiler][`crate::re::thompson::compiler::Compiler`].
///
/// The VM keeps no reference to the code it executes, only the buffers
/// needed during execution. The same VM can run many match attempts,
/// reusing its buffers, which is what [`crate::Matcher`] does.
pub(crate) struct PikeVM {
    /// Arena where all the threads are allocated.
    pool: ThreadPool,
    /// Threads that will test the character at the current position.
    /// There's at most one thread per VM instruction.
    threads: ThreadQueue,
    /// Threads that will test the character at the next position.
    next_threads: ThreadQueue,
    /// Stack used by [`epsilon_closure`].
    stack: Vec<ThreadId>,
}

impl PikeVM {
    /// Creates a new [`PikeVM`].
    pub fn new() -> Self {
        Self {
            pool: ThreadPool::new(),
            threads: ThreadQueue::new(),
            next_threads: ThreadQueue::new(),
            stack: Vec::new(),
        }
    }

    /// Executes `code` against `input`, with the match anchored at offset
    /// `start`. `nb_saved` is the number of groups in the program, the
    /// whole match included.
    ///
    /// All the threads advance in lock-step, one character at a time.
    /// Threads are kept in priority order, when a thread reaches a match
    /// all the threads with lower priority are discarded, while threads
    /// with higher priority keep running and may produce a new match that
    /// replaces the previous one. The result is the match found by the
    /// thread with the highest priority.
    ///
    /// Returns `None` if there's no match, or if `start` is not at a char
    /// boundary within `input`.
    pub fn try_match<'h>(
        &mut self,
        code: &[Instr],
        nb_saved: usize,
        input: &'h str,
        start: usize,
    ) -> Option<Match<'h>> {
        if start > input.len() || !input.is_char_boundary(start) {
            return None;
        }

        // Make sure that the queues are empty when this function is
        // called.
        debug_assert!(self.threads.is_empty());
        debug_assert!(self.next_threads.is_empty());

        self.threads.reserve(code.len());
        self.next_threads.reserve(code.len());

        let mut fwd_input = input[start..].chars();
        let prev_char = input[..start].chars().next_back();
        let mut curr_char = fwd_input.next();
        let mut pos = start;
        let mut result = None;

        let initial =
            self.pool.allocate(0, Rc::new(vec![None; nb_saved * 2]));

        epsilon_closure(
            code,
            initial,
            pos,
            prev_char,
            curr_char,
            &mut self.pool,
            &mut self.stack,
            &mut self.threads,
        );

        while !self.threads.is_empty() {
            let next_char = fwd_input.next();
            let next_pos = pos + curr_char.map_or(0, char::len_utf8);

            let threads = self.threads.threads();

            for (i, id) in threads.iter().copied().enumerate() {
                let pc = self.pool.get(id).pc;

                let is_match = match &code[pc] {
                    Instr::Char(c) => curr_char == Some(*c),
                    Instr::AnyChar => curr_char.is_some(),
                    Instr::CharSet(class) => {
                        matches!(curr_char, Some(c) if class.contains(c))
                    }
                    Instr::NamedClass(class) => {
                        matches!(curr_char, Some(c) if class.matches(c))
                    }
                    Instr::Match(match_id) => {
                        let mut saved = self.pool.get(id).saved.to_vec();
                        saved[0] = Some(start);
                        saved[1] = Some(pos);

                        #[cfg(feature = "logging")]
                        trace!("match at {}..{} (id: {:?})", start, pos, match_id);

                        result = Some(Match::new(input, saved, *match_id));

                        // This thread and the ones with lower priority
                        // are done.
                        for lower in &threads[i..] {
                            self.pool.free(*lower);
                        }

                        break;
                    }
                    _ => unreachable!(
                        "non-consuming instruction at {} in runnable thread",
                        pc
                    ),
                };

                if is_match {
                    self.pool.get_mut(id).pc = pc + 1;
                    epsilon_closure(
                        code,
                        id,
                        next_pos,
                        curr_char,
                        next_char,
                        &mut self.pool,
                        &mut self.stack,
                        &mut self.next_threads,
                    );
                } else {
                    self.pool.free(id);
                }
            }

            curr_char = next_char;
            pos = next_pos;

            mem::swap(&mut self.threads, &mut self.next_threads);
            self.next_threads.clear();
        }

        self.threads.clear();

        debug_assert_eq!(self.pool.live(), 0);

        result
    }

    /// Maximum number of runnable threads at a single position, across all
    /// the match attempts executed by this VM.
    #[cfg(test)]
    pub fn peak_threads(&self) -> usize {
        self.threads.peak().max(self.next_threads.peak())
    }

    /// Maximum number of threads that were alive at the same time, runnable
    /// or not, across all the match attempts executed by this VM.
    #[cfg(test)]
    pub fn peak_live_threads(&self) -> usize {
        self.pool.capacity()
    }
}

/// Computes the epsilon closure of a thread.
///
/// In a NFA, the epsilon closure of some state `S`, is the set containing
/// all the states that can be reached from `S` by following epsilon
/// transitions (i.e: transitions that don't consume any input symbol). In
/// the VM code those transitions are the non-consuming instructions:
/// jumps, splits, saves and predicates.
///
/// This function follows the non-consuming instructions starting at the
/// current position of thread `id`, forking the thread at each split,
/// until every resulting thread sits at a consuming instruction or a
/// match. Those threads are appended to `closure` in priority order.
/// Threads that reach an instruction already visited in `closure`, or
/// that fail a predicate, are returned to the pool.
///
/// `pos` is the input offset the threads are at, and `prev_char` and
/// `curr_char` are the characters before and after that offset, used for
/// evaluating predicates.
///
/// Threads waiting to be processed are kept in `stack` instead of using
/// recursion. Splits push the second branch before the first one, so the
/// first one and all its descendants are processed before the second.
/// `stack` is empty when the function returns, and should be reused
/// across calls in order to prevent unnecessary allocations.
#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn epsilon_closure(
    code: &[Instr],
    id: ThreadId,
    pos: usize,
    prev_char: Option<char>,
    curr_char: Option<char>,
    pool: &mut ThreadPool,
    stack: &mut Vec<ThreadId>,
    closure: &mut ThreadQueue,
) {
    stack.push(id);

    while let Some(id) = stack.pop() {
        let pc = pool.get(id).pc;

        if !closure.visit(pc) {
            pool.free(id);
            continue;
        }

        match &code[pc] {
            Instr::Jump(offset) => {
                pool.get_mut(id).pc = apply_offset(pc, *offset);
                stack.push(id);
            }
            Instr::Split(a, b) => {
                let forked = pool.fork(id, apply_offset(pc, *b));
                pool.get_mut(id).pc = apply_offset(pc, *a);
                stack.push(forked);
                stack.push(id);
            }
            Instr::Save(slot) => {
                let thread = pool.get_mut(id);
                Rc::make_mut(&mut thread.saved)[*slot] = Some(pos);
                thread.pc += 1;
                stack.push(id);
            }
            Instr::Predicate(predicate) => {
                if predicate.holds(prev_char, curr_char) {
                    pool.get_mut(id).pc += 1;
                    stack.push(id);
                } else {
                    pool.free(id);
                }
            }
            _ => closure.push(id),
        }
    }
}
