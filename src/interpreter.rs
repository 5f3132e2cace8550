/*!
  The interpreter runs a binary against a single `MachineState`. Execution is a straight line:

  ```text
  Fetch -> Decode -> Dispatch -> Apply -> Fetch -> ... -> Halted
                         │           │
                         └───────────┴──> Faulted
  ```

  The cursor advances by exactly one record per iteration and there are no jumps, so every run
  terminates after at most `len / INSTRUCTION_SIZE` steps. A run ends `Halted` at the end of
  the stream or `Faulted` on the first fatal error. Every handler performs all of its checks
  before it writes anything, so a faulting instruction leaves no trace in the machine and the
  state carried by the `Fault` is the state from just before it.
*/

use tracing::{debug, info, warn};
#[cfg(feature = "trace_computation")]
use tracing::trace;

use crate::bytecode::{
  decode_instruction, try_decode_instruction, EncodedInstruction, Instruction, Operation,
  INSTRUCTION_SIZE
};
use crate::config::{DispatchPolicy, MachineConfig};
use crate::error::{DecodeError, ExecutionError, Fault, Field, RunError};
use crate::machine::MachineState;

/// A non-fatal event during a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Warning {
  /// A record with an unknown opcode byte was skipped under `DispatchPolicy::Permissive`.
  SkippedUnknownOpcode { index: usize, offset: usize, code: u8 },
}

/// The outcome of a run that reached the end of its binary.
#[derive(Clone, Debug)]
pub struct Execution {
  pub state    : MachineState,
  /// Number of instructions applied. Skipped records are not counted.
  pub executed : usize,
  pub warnings : Vec<Warning>,
}

/// What happened to one record.
enum Step {
  Applied(Instruction),
  Skipped(u8),
}

pub struct Interpreter {
  dispatch        : DispatchPolicy,
  strict_operands : bool,
  state           : MachineState,
}

impl Interpreter {

  /// An interpreter with a fresh, zeroed machine sized by `config`.
  pub fn new(config: &MachineConfig) -> Interpreter {
    Interpreter::with_state(config, MachineState::from_config(config))
  }

  /**
    An interpreter that starts from an already prepared machine. The machine's own capacities
    are used; the capacities in `config` are ignored.
  */
  pub fn with_state(config: &MachineConfig, state: MachineState) -> Interpreter {
    Interpreter {
      dispatch        : config.dispatch,
      strict_operands : config.strict_operands,
      state
    }
  }

  pub fn state(&self) -> &MachineState {
    &self.state
  }

  /// Runs `program` to completion, consuming the interpreter.
  pub fn run(mut self, program: &[u8]) -> Result<Execution, RunError> {
    if program.len() % INSTRUCTION_SIZE != 0 {
      warn!(length = program.len(), "rejecting malformed stream");
      return Err(RunError::MalformedStream{
        length      : program.len(),
        record_size : INSTRUCTION_SIZE,
        state       : Box::new(self.state)
      });
    }

    let mut executed = 0;
    let mut warnings = vec![];

    for (index, chunk) in program.chunks_exact(INSTRUCTION_SIZE).enumerate() {
      let offset = index * INSTRUCTION_SIZE;
      let mut record: EncodedInstruction = [0; INSTRUCTION_SIZE];
      record.copy_from_slice(chunk);

      match self.step(&record) {

        Ok(Step::Applied(instruction)) => {
          executed += 1;
          debug!(index, offset, %instruction, "applied");
          #[cfg(feature = "trace_computation")]
          trace!("\n{}", self.state);
        }

        Ok(Step::Skipped(code)) => {
          warn!(index, offset, code, "skipping unknown opcode");
          warnings.push(Warning::SkippedUnknownOpcode{ index, offset, code });
        }

        Err(error) => {
          warn!(index, offset, %error, "fault");
          return Err(RunError::Faulted(Box::new(Fault{ index, offset, error, state: self.state })));
        }

      }
    }

    info!(executed, skipped = warnings.len(), "halted");
    Ok(Execution{ state: self.state, executed, warnings })
  }

  /// Decode and dispatch one record.
  fn step(&mut self, record: &EncodedInstruction) -> Result<Step, ExecutionError> {
    match try_decode_instruction(record, self.strict_operands) {

      Ok(instruction) => {
        self.apply(&instruction)?;
        Ok(Step::Applied(instruction))
      }

      Err(DecodeError::UnknownOpcode{ code }) => {
        match self.dispatch {
          DispatchPolicy::Permissive => Ok(Step::Skipped(code)),
          DispatchPolicy::Strict     => Err(ExecutionError::UnknownOpcodeAtRuntime{ code }),
        }
      }

      Err(error) => {
        debug!(raw = ?decode_instruction(record), %error, "undecodable record");
        Err(error.into())
      }

    }
  }

  /// Applies the effect of a decoded instruction. Checks first, then writes.
  fn apply(&mut self, instruction: &Instruction) -> Result<(), ExecutionError> {
    let state = &mut self.state;

    match instruction.opcode {

      Operation::LoadConst => {
        state.set_register(instruction.c_register(), instruction.b_constant(), Field::C)
      }

      Operation::LoadMem => {
        let target  = state.check_register(instruction.b_register(), Field::B)?;
        let address = state.address_in(instruction.c_register(), Field::C)?;
        let value   = state.read_memory(address);
        state.set_register(target, value, Field::B)
      }

      Operation::StoreMem => {
        let address = state.address_in(instruction.b_register(), Field::B)?;
        let value   = state.register(instruction.c_register(), Field::C)?;
        state.write_memory(address, value);
        Ok(())
      }

      Operation::UnaryAbs => {
        let target  = state.check_register(instruction.b_register(), Field::B)?;
        let address = state.address_in(instruction.c_register(), Field::C)?;
        // |i32::MIN| does not fit; it wraps to itself.
        let value   = state.read_memory(address).wrapping_abs();
        state.set_register(target, value, Field::B)
      }

    }
  }
}

/// Runs `program` on a fresh machine described by `config`.
pub fn run(program: &[u8], config: &MachineConfig) -> Result<Execution, RunError> {
  Interpreter::new(config).run(program)
}
