//! Error types for every stage of the pipeline, from reading records to running a binary.

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::machine::MachineState;

/// Errors raised while reading the textual record table.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("line {line}: malformed instruction record `{content}`")]
  Syntax { line: usize, content: String },

  #[error("could not read instruction records: {0}")]
  Io(#[from] std::io::Error),
}

/// Names an instruction field in diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Field {
  B,
  C,
}

impl Display for Field {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Field::B => write!(f, "b"),
      Field::C => write!(f, "c"),
    }
  }
}

/// Assembly-time errors. Any one of them rejects the whole batch.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AssemblyError {
  #[error("record {index} (line {line}): unknown opcode `{mnemonic}`")]
  UnknownOpcode { index: usize, line: usize, mnemonic: String },

  #[error("record {index} (line {line}): field {field} = {value} is outside {min}..={max}")]
  FieldOutOfRange { index: usize, line: usize, field: Field, value: i64, min: i64, max: i64 },
}

/// Errors from the file level assembly pipeline.
#[derive(Debug, Error)]
pub enum AssembleFileError {
  #[error(transparent)]
  Source(#[from] SourceError),

  #[error(transparent)]
  Assembly(#[from] AssemblyError),

  #[error("could not write binary: {0}")]
  Write(#[from] std::io::Error),
}

/// Errors from decoding a single six byte record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum DecodeError {
  #[error("unknown opcode {code:#04X}")]
  UnknownOpcode { code: u8 },

  #[error("reserved bits set in operand byte {operand:#04X}")]
  MalformedInstruction { operand: u8 },
}

/// Errors raised while applying a single instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ExecutionError {
  #[error("unknown opcode {code:#04X}")]
  UnknownOpcodeAtRuntime { code: u8 },

  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error("register fault: field {field} names register {index}, machine has {count}")]
  RegisterFault { field: Field, index: usize, count: usize },

  #[error("memory fault: address {address} from field {field} is outside 0..{capacity}")]
  MemoryFault { field: Field, address: i64, capacity: usize },
}

/// Preparing memory before a run with more words than fit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("cannot preload {len} words at address {start}: memory holds {capacity}")]
pub struct PreloadError {
  pub start    : usize,
  pub len      : usize,
  pub capacity : usize,
}

/// A dump range the reporting side refuses to produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum DumpRangeError {
  #[error("empty address range: {lo} > {hi}")]
  Reversed { lo: usize, hi: usize },

  #[error("address range {lo}..={hi} is wider than {max} words")]
  TooWide { lo: usize, hi: usize, max: usize },
}

/// A fatal error during a run, together with the machine as it stood before the failing
/// instruction.
#[derive(Clone, Debug, Error)]
#[error("instruction {index} at byte {offset}: {error}")]
pub struct Fault {
  pub index  : usize,
  pub offset : usize,
  pub error  : ExecutionError,
  pub state  : MachineState,
}

#[derive(Debug, Error)]
pub enum RunError {
  #[error("malformed stream: length {length} is not a multiple of {record_size}")]
  MalformedStream { length: usize, record_size: usize, state: Box<MachineState> },

  #[error(transparent)]
  Faulted(Box<Fault>),
}

impl RunError {
  /// The machine as it stood when the run stopped.
  pub fn state(&self) -> &MachineState {
    match self {
      RunError::MalformedStream{ state, .. } => state,
      RunError::Faulted(fault)               => &fault.state,
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("could not read configuration: {0}")]
  Io(#[from] std::io::Error),

  #[error("could not parse configuration: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid configuration: {reason}")]
  Invalid { reason: String },
}
