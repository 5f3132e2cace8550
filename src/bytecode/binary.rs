/*!
  This module is responsible for the encoding and decoding of binary instructions.

  Every instruction is exactly six bytes:
      ```
      [OpCode:8][B:32 big-endian][Reserved:4][C:4]
      ```
*/
use std::convert::TryFrom;

use super::{Instruction, Operation, REGISTER_INDEX_MASK};
use crate::error::DecodeError;

// If you change this you must also change `encode_instruction` and `decode_instruction`.
pub const INSTRUCTION_SIZE: usize = 6;

pub type EncodedInstruction = [u8; INSTRUCTION_SIZE];

/// The fields of a six byte record before the opcode byte has been looked up. `operand` is the
/// whole sixth byte, so the reserved high nibble is still visible to the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawInstruction {
  pub code    : u8,
  pub b       : u32,
  pub operand : u8
}

impl RawInstruction {
  /// The register index, with the reserved bits masked off.
  pub fn c(&self) -> u8 {
    self.operand & REGISTER_INDEX_MASK
  }

  pub fn has_reserved_bits(&self) -> bool {
    self.operand & !REGISTER_INDEX_MASK != 0
  }
}

/// Encodes the instruction into its six byte wire form. Only the low four bits of `c` are
/// written; the encoder validates `c` before an `Instruction` is ever built.
pub fn encode_instruction(instruction: &Instruction) -> EncodedInstruction {
  let b = instruction.b.to_be_bytes();
  [
    instruction.opcode.code(),
    b[0], b[1], b[2], b[3],
    instruction.c & REGISTER_INDEX_MASK
  ]
}

/// Splits a six byte record into its fields. Never fails: opcode lookup and reserved bit
/// policy are left to the caller.
pub fn decode_instruction(bytes: &EncodedInstruction) -> RawInstruction {
  RawInstruction {
    code    : bytes[0],
    b       : u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
    operand : bytes[5]
  }
}

/**
  Decodes a record all the way to an `Instruction`. When `strict` is set, a nonzero reserved
  nibble is rejected; otherwise it is masked away, which keeps records from encoders that pad
  the operand byte readable.
*/
pub fn try_decode_instruction(bytes: &EncodedInstruction, strict: bool)
  -> Result<Instruction, DecodeError>
{
  let raw = decode_instruction(bytes);
  if strict && raw.has_reserved_bits() {
    return Err(DecodeError::MalformedInstruction{ operand: raw.operand });
  }
  let opcode = Operation::try_from(raw.code)
    .map_err(|_| DecodeError::UnknownOpcode{ code: raw.code })?;

  Ok(Instruction::new(opcode, raw.b, raw.c()))
}

/// Encodes a sequence of instructions, in order, into one flat buffer.
pub fn encode_program<'a, I>(instructions: I) -> Vec<u8>
  where I: IntoIterator<Item = &'a Instruction>
{
  instructions
    .into_iter()
    .flat_map(|instruction| encode_instruction(instruction).to_vec())
    .collect()
}

/**
  Renders a binary back into one assembly line per record, using the permissive decoding
  rules. Unknown opcodes are shown as raw bytes instead of aborting. Trailing bytes that do
  not form a whole record are reported on a final line.
*/
pub fn disassemble(bytes: &[u8]) -> Vec<String> {
  let mut chunks = bytes.chunks_exact(INSTRUCTION_SIZE);
  let mut lines: Vec<String> =
    chunks
      .by_ref()
      .enumerate()
      .map(|(index, chunk)| {
        let mut record = [0u8; INSTRUCTION_SIZE];
        record.copy_from_slice(chunk);
        match try_decode_instruction(&record, false) {
          Ok(instruction) => format!("{:>4}: {}", index, instruction),
          Err(_e)         => format!("{:>4}: .bytes {:02X?}", index, record)
        }
      })
      .collect();

  let remainder = chunks.remainder();
  if !remainder.is_empty() {
    lines.push(format!("      .trailing {:02X?}", remainder));
  }
  lines
}
