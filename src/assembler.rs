/*!
  Turns instruction records into a binary. Encoding is all or nothing: every record is
  validated and encoded into memory first, and only a fully encoded batch is ever handed to a
  writer. The audit log is a side channel; failing to write it never invalidates a binary.
*/

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::bytecode::{
  encode_instruction, normalize_constants, read_records, Instruction, Operation, SourceRecord,
  INSTRUCTION_SIZE, REGISTER_INDEX_MASK
};
use crate::error::{AssembleFileError, AssemblyError, Field};

pub const MAX_B: i64 = u32::MAX as i64;
pub const MAX_C: i64 = REGISTER_INDEX_MASK as i64;

/// An encoded batch. `bytes` holds one six byte record per entry of `instructions`, in order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assembly {
  pub instructions : Vec<Instruction>,
  pub bytes        : Vec<u8>,
}

impl Assembly {
  /// One human readable line per instruction: mnemonic, opcode, `b`, `c`.
  pub fn audit_lines(&self) -> Vec<String> {
    self.instructions
        .iter()
        .map(|instruction| {
          format!(
            "{},{:#04X},{},{}",
            instruction.opcode, instruction.opcode.code(), instruction.b, instruction.c
          )
        })
        .collect()
  }

  pub fn write_audit_log<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "Mnemonic,Opcode,B,C")?;
    for line in self.audit_lines() {
      writeln!(writer, "{}", line)?;
    }
    writer.flush()
  }
}

fn check_range(index: usize, record: &SourceRecord, field: Field, value: i64, max: i64)
  -> Result<(), AssemblyError>
{
  match (0..=max).contains(&value) {
    true  => Ok(()),
    false => Err(AssemblyError::FieldOutOfRange{
      index,
      line: record.line,
      field,
      value,
      min: 0,
      max
    })
  }
}

/// Validates a single record. `index` is its position in the batch.
pub fn encode_record(index: usize, record: &SourceRecord) -> Result<Instruction, AssemblyError> {
  let opcode = Operation::from_str(&record.mnemonic)
    .map_err(|_| AssemblyError::UnknownOpcode{
      index,
      line     : record.line,
      mnemonic : record.mnemonic.clone()
    })?;

  check_range(index, record, Field::B, record.b, MAX_B)?;
  check_range(index, record, Field::C, record.c, MAX_C)?;

  Ok(Instruction::new(opcode, record.b as u32, record.c as u8))
}

/// Encodes a batch of records. The first invalid record rejects the whole batch.
pub fn encode(records: &[SourceRecord]) -> Result<Assembly, AssemblyError> {
  let instructions =
    records
      .iter()
      .enumerate()
      .map(|(index, record)| encode_record(index, record))
      .collect::<Result<Vec<Instruction>, AssemblyError>>()?;

  let mut bytes = Vec::with_capacity(instructions.len() * INSTRUCTION_SIZE);
  for instruction in &instructions {
    debug!(%instruction, "encoded");
    bytes.extend_from_slice(&encode_instruction(instruction));
  }

  Ok(Assembly{ instructions, bytes })
}

/**
  Reads a record table, encodes it, and writes the binary and the audit log. Negative
  `LOAD_CONST` constants are folded into two's complement first when `normalize` is set.
  Nothing is written if any record is invalid.
*/
pub fn assemble_file<P, Q, R>(records_in: P, binary_out: Q, log_out: R, normalize: bool)
  -> Result<Assembly, AssembleFileError>
  where P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>
{
  let mut records = read_records(records_in)?;
  if normalize {
    normalize_constants(&mut records);
  }

  let assembly = encode(&records)?;
  fs::write(binary_out, &assembly.bytes)?;
  info!(instructions = assembly.instructions.len(), bytes = assembly.bytes.len(), "assembled");

  let log_result =
    File::create(log_out.as_ref())
      .and_then(|file| assembly.write_audit_log(BufWriter::new(file)));
  if let Err(error) = log_result {
    warn!(path = %log_out.as_ref().display(), %error, "could not write audit log");
  }

  Ok(assembly)
}
