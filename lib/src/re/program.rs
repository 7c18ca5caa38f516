/*! Compiled programs. */

use std::fmt::{Display, Formatter};
use std::io;
use std::io::{BufWriter, Read, Write};
#[cfg(feature = "logging")]
use std::time::Instant;

use bincode::Options;
#[cfg(feature = "logging")]
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::re::matcher::{Match, Matcher};
use crate::re::thompson::instr::{disassemble, Instr, Offset};
use crate::re::thompson::pikevm::PikeVM;
use crate::re::{CompileError, MAX_PROGRAM_LEN};

/// Header at the start of every serialized program.
const MAGIC: &[u8] = b"LING-RE";

/// Errors returned by [`CompiledRegex::serialize`] and
/// [`CompiledRegex::deserialize`].
#[derive(Error, Debug)]
pub enum SerializationError {
    /// The data being deserialized doesn't contain a valid program.
    #[error("not a valid compiled regexp")]
    InvalidFormat,

    /// Error occurred while encoding or decoding the program.
    #[error("invalid encoding")]
    InvalidEncoding(#[from] bincode::Error),

    /// I/O error while trying to read or write a program.
    #[error(transparent)]
    IoError(#[from] io::Error),
}

/// A pattern compiled into code for Pike's VM.
///
/// Programs are immutable, and can be shared by any number of
/// [`Matcher`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRegex {
    code: Vec<Instr>,
    /// Number of groups in the pattern, plus one for the whole match.
    nb_saved: usize,
}

impl CompiledRegex {
    pub(crate) fn new(code: Vec<Instr>, nb_saved: usize) -> Self {
        Self { code, nb_saved }
    }

    /// Instructions in the program.
    pub fn code(&self) -> &[Instr] {
        self.code.as_slice()
    }

    /// Number of groups in the program, including group 0. Each group uses
    /// two capture slots.
    pub fn nb_saved(&self) -> usize {
        self.nb_saved
    }

    /// Number of groups in the pattern, not counting group 0.
    pub fn group_count(&self) -> usize {
        self.nb_saved - 1
    }

    /// Tries to match the program starting exactly at `start`, which is a
    /// byte offset within `input`.
    ///
    /// Returns `None` if there's no match starting at `start`, or if
    /// `start` is beyond the end of the input or not at a char boundary.
    pub fn match_at<'h>(&self, input: &'h str, start: usize) -> Option<Match<'h>> {
        PikeVM::new().try_match(&self.code, self.nb_saved, input, start)
    }

    /// Returns an iterator over the matches in `input`.
    pub fn matcher<'h>(&self, input: &'h str) -> Matcher<'_, 'h> {
        Matcher::new(self, input)
    }

    /// Returns the leftmost match in `input`.
    pub fn find_first_in<'h>(&self, input: &'h str) -> Option<Match<'h>> {
        self.matcher(input).next()
    }

    /// Combines two programs into one that matches whatever any of them
    /// matches. When both programs match at the same offset, the match
    /// produced by `self` wins.
    ///
    /// Groups from `other` are renumbered so that they come after the
    /// groups in `self`. If `self` has `n` groups, group 1 in `other`
    /// becomes group `n + 1`. Group 0 is still the whole match. Use
    /// [`crate::Compiler::compile_with_id`] for telling which program
    /// produced a match.
    ///
    /// Returns [`CompileError::TooLarge`] if the combined program would
    /// exceed [`MAX_PROGRAM_LEN`] instructions or groups.
    ///
    /// ```text
    /// l0: split l1, l2
    /// l1: ... self ...
    ///     match
    /// l2: ... other ...
    ///     match
    /// ```
    pub fn or(
        mut self,
        other: CompiledRegex,
    ) -> Result<CompiledRegex, CompileError> {
        let len = 1 + self.code.len() + other.code.len();
        let nb_saved = self.nb_saved + other.nb_saved - 1;

        if len > MAX_PROGRAM_LEN || nb_saved > MAX_PROGRAM_LEN {
            return Err(CompileError::TooLarge);
        }

        let shift = 2 * self.group_count();
        let skip = Offset::try_from(self.code.len() + 1)
            .map_err(|_| CompileError::TooLarge)?;

        let mut code = Vec::with_capacity(len);
        code.push(Instr::Split(1, skip));
        code.append(&mut self.code);
        code.extend(other.code.into_iter().map(|instr| match instr {
            Instr::Save(slot) if slot >= 2 => Instr::Save(slot + shift),
            instr => instr,
        }));

        Ok(CompiledRegex::new(code, nb_saved))
    }

    /// Serializes the program into a sequence of bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializationError> {
        let mut bytes = Vec::new();
        self.serialize_into(&mut bytes)?;
        Ok(bytes)
    }

    /// Serializes the program into a `writer`.
    pub fn serialize_into<W>(&self, writer: W) -> Result<(), SerializationError>
    where
        W: Write,
    {
        let mut writer = BufWriter::new(writer);

        // Write file header.
        writer.write_all(MAGIC)?;

        // Serialize program.
        bincode::DefaultOptions::new()
            .with_varint_encoding()
            .serialize_into(&mut writer, self)?;

        writer.flush()?;

        Ok(())
    }

    /// Deserializes a program from a sequence of bytes produced by
    /// [`CompiledRegex::serialize`].
    pub fn deserialize<B>(bytes: B) -> Result<Self, SerializationError>
    where
        B: AsRef<[u8]>,
    {
        let bytes = bytes.as_ref();

        if bytes.len() < MAGIC.len() || &bytes[0..MAGIC.len()] != MAGIC {
            return Err(SerializationError::InvalidFormat);
        }

        #[cfg(feature = "logging")]
        let start = Instant::now();

        // Skip the magic and deserialize the remaining data.
        let regex = bincode::DefaultOptions::new()
            .with_varint_encoding()
            .deserialize::<Self>(&bytes[MAGIC.len()..])?;

        #[cfg(feature = "logging")]
        info!("Deserialization time: {:?}", Instant::elapsed(&start));

        if !regex.is_valid() {
            return Err(SerializationError::InvalidFormat);
        }

        Ok(regex)
    }

    /// Deserializes a program from a `reader`.
    pub fn deserialize_from<R>(mut reader: R) -> Result<Self, SerializationError>
    where
        R: Read,
    {
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes)?;
        Self::deserialize(bytes)
    }

    /// Checks that the program can be executed safely: every jump and split
    /// lands inside the program, saves use existing slots, and the last
    /// instruction doesn't fall through the end.
    fn is_valid(&self) -> bool {
        let len = self.code.len() as isize;
        let slots = self.nb_saved.saturating_mul(2);
        let in_bounds = |addr: usize, offset: Offset| {
            let target = addr as isize + offset as isize;
            (0..len).contains(&target)
        };

        if self.code.len() > MAX_PROGRAM_LEN
            || !(1..=MAX_PROGRAM_LEN).contains(&self.nb_saved)
        {
            return false;
        }

        let falls_through = match self.code.last() {
            Some(Instr::Match(_) | Instr::Jump(_) | Instr::Split(_, _)) => false,
            Some(_) | None => true,
        };

        if falls_through {
            return false;
        }

        self.code.iter().enumerate().all(|(addr, instr)| match instr {
            Instr::Jump(offset) => in_bounds(addr, *offset),
            Instr::Split(a, b) => in_bounds(addr, *a) && in_bounds(addr, *b),
            Instr::Save(slot) => *slot < slots,
            _ => true,
        })
    }
}

impl Display for CompiledRegex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        disassemble(self.code.as_slice(), f)
    }
}
