use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/// The width of the register index carried in the operand byte.
pub const REGISTER_INDEX_MASK: u8 = 0x0F;

/**
  Opcodes of the virtual machine.

  The discriminant of each variant is its code on the wire, so decoding an opcode byte is a
  `TryFrom<u8>` and encoding is an `Into<u8>`. The canonical mnemonic is the `to_string`
  serialization; the lowercase `serialize` forms are the short names accepted in record
  files for compatibility with older instruction tables.

  The meaning of the `b` field depends on the opcode:
      ```
      LOAD_CONST  registers[c]     = sign_extend(b)
      LOAD_MEM    registers[b & F] = memory[registers[c]]
      STORE_MEM   memory[registers[b & F]] = registers[c]
      UNARY_ABS   registers[b & F] = abs(memory[registers[c]])
      ```
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,     Hash
)]
#[repr(u8)]
pub enum Operation {
  #[strum(to_string = "LOAD_CONST", serialize = "load")]
  LoadConst = 0xC5,  // load_const( constant, register )

  #[strum(to_string = "LOAD_MEM", serialize = "read")]
  LoadMem   = 0xB1,  // load_mem( register, register )

  #[strum(to_string = "STORE_MEM", serialize = "write")]
  StoreMem  = 0x6B,  // store_mem( register, register )

  #[strum(to_string = "UNARY_ABS", serialize = "abs")]
  UnaryAbs  = 0xE4,  // unary_abs( register, register )
}

impl Operation{
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The mnemonic as written in assembly and audit logs.
  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  /// Whether `b` is an immediate constant rather than a register index.
  pub fn has_immediate(&self) -> bool {
    matches!(self, Operation::LoadConst)
  }
}

/// Holds the unencoded components of an instruction. `b` is the raw 32 bit payload; whether it
/// is a constant or a register index is decided by `opcode`. `c` is always a register index.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode : Operation,
  pub b      : u32,
  pub c      : u8
}

impl Instruction {
  pub fn new(opcode: Operation, b: u32, c: u8) -> Instruction {
    Instruction{ opcode, b, c }
  }

  /// The register index named by `b`, for every opcode but `LOAD_CONST`.
  pub fn b_register(&self) -> usize {
    (self.b as u8 & REGISTER_INDEX_MASK) as usize
  }

  /// `b` reinterpreted as a signed 32 bit constant.
  pub fn b_constant(&self) -> i32 {
    self.b as i32
  }

  pub fn c_register(&self) -> usize {
    (self.c & REGISTER_INDEX_MASK) as usize
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.opcode.has_immediate() {

      true  => {
        write!(f, "{}({}, X[{}])", self.opcode, self.b_constant(), self.c)
      }

      false => {
        write!(f, "{}(X[{}], X[{}])", self.opcode, self.b_register(), self.c)
      }

    }
  }
}
