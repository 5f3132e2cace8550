/*!
  An assembler and interpreter for a four instruction virtual machine.

  Instruction records are encoded by `assembler` into a flat stream of six byte records, and
  `interpreter` decodes and runs that stream against a `MachineState` of sixteen registers and
  a fixed number of memory words. The wire format in `bytecode` is the only thing the two
  halves share.
*/

pub mod assembler;
pub mod bytecode;
pub mod commands;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod machine;

pub use assembler::{encode, Assembly};
pub use bytecode::{Instruction, Operation, SourceRecord};
pub use config::{DispatchPolicy, MachineConfig};
pub use error::{AssemblyError, ExecutionError, Fault, RunError};
pub use interpreter::{run, Execution, Interpreter, Warning};
pub use machine::MachineState;
