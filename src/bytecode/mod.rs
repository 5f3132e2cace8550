/*!

  The VM executes a flat stream of fixed width, six byte instructions. There is no header, no
  magic number and no version tag: a binary is simply a concatenation of records, and its
  length is always a multiple of six. The layout of a record is

  ```text
  [OpCode:8][B:32][Reserved:4][C:4]
  ```

  with `B` stored big-endian. `B` is either a 32 bit constant or a register index depending on
  the opcode; `C` is always a register index. The reserved nibble is written as zero.

  Like the rest of the machine, the instruction set is closed. An `Operation` is a single byte
  enum whose discriminants are the wire codes, so the opcode table exists exactly once and both
  the encoder and the decoder derive their lookups from it.

  The textual side lives in `assembly`, which reads instruction records from a delimited table.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{normalize_constants, parse_records, read_records, SourceRecord};
pub use binary::{
  decode_instruction, disassemble, encode_instruction, encode_program, try_decode_instruction,
  EncodedInstruction, RawInstruction, INSTRUCTION_SIZE
};
pub use instruction::{Instruction, Operation, REGISTER_INDEX_MASK};
