//! Wire format for persisting and exchanging corpora (`spec.md` §6).
//!
//! `[length: u32 LE][postcard-encoded Program][zero padding to 4-byte
//! alignment]`, repeated per record.

use std::fmt;

use crate::ir::Program;

#[derive(Debug)]
pub enum CodecError {
    /// The byte stream ended mid-record.
    Truncated,
    /// A length prefix or padding byte was inconsistent with the stream.
    Corrupt(String),
    Postcard(postcard::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated record"),
            Self::Corrupt(reason) => write!(f, "corrupt record: {reason}"),
            Self::Postcard(e) => write!(f, "postcard decode error: {e}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Postcard(e) => Some(e),
            _ => None,
        }
    }
}

impl From<postcard::Error> for CodecError {
    fn from(e: postcard::Error) -> Self {
        Self::Postcard(e)
    }
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Appends one record for `program` to `out`.
pub fn encode_one(program: &Program, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let body = postcard::to_allocvec(program)?;
    let len = body.len();
    out.extend_from_slice(&(len as u32).to_le_bytes());
    out.extend_from_slice(&body);
    let pad = padded_len(len) - len;
    out.extend(std::iter::repeat(0u8).take(pad));
    Ok(())
}

/// Encodes a whole corpus as concatenated records.
#[must_use]
pub fn encode_all<'a>(programs: impl IntoIterator<Item = &'a Program>) -> Vec<u8> {
    let mut out = Vec::new();
    for program in programs {
        // A single program is never empty by construction (`Corpus::add`
        // rejects them), so encoding can't fail here.
        encode_one(program, &mut out).expect("program always encodes");
    }
    out
}

/// Decodes every well-formed record in `bytes`, skipping (and reporting) any
/// record that fails to decode rather than aborting the whole import
/// (`spec.md` §7 "codec errors: skip, continue").
pub fn decode_all(bytes: &[u8]) -> (Vec<Program>, Vec<CodecError>) {
    let mut programs = Vec::new();
    let mut errors = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        if offset + 4 > bytes.len() {
            errors.push(CodecError::Truncated);
            break;
        }
        let len = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
        offset += 4;
        let padded = padded_len(len);
        if offset + padded > bytes.len() {
            errors.push(CodecError::Truncated);
            break;
        }
        let body = &bytes[offset..offset + len];
        match postcard::from_bytes::<Program>(body) {
            Ok(program) => programs.push(program),
            Err(e) => errors.push(CodecError::from(e)),
        }
        offset += padded;
    }

    (programs, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Op, Program};
    use smallvec::smallvec;
    use uuid::Uuid;

    fn trivial_program() -> Program {
        let v0 = crate::ir::Variable::new(0);
        let instr = Instruction::new(Op::LoadInt(7), smallvec![v0], 0);
        Program::new(Uuid::new_v4(), vec![instr], None, None)
    }

    #[test]
    fn round_trips_single_program() {
        let program = trivial_program();
        let bytes = encode_all([&program]);
        let (decoded, errors) = decode_all(&bytes);
        assert!(errors.is_empty());
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].code().len(), program.code().len());
    }

    #[test]
    fn truncated_stream_reports_error() {
        let program = trivial_program();
        let mut bytes = encode_all([&program]);
        bytes.truncate(bytes.len() - 1);
        let (decoded, errors) = decode_all(&bytes);
        assert!(decoded.is_empty());
        assert!(!errors.is_empty());
    }

    #[test]
    fn re_encoding_decoded_corpus_is_stable() {
        let programs = vec![trivial_program(), trivial_program()];
        let first = encode_all(&programs);
        let (decoded, errors) = decode_all(&first);
        assert!(errors.is_empty());
        let second = encode_all(&decoded);
        assert_eq!(first.len(), second.len());
    }
}
