/*!
  The two operations behind the `uvm` binary, kept in the library so that their exit behavior
  can be tested without a process boundary. `main` only parses arguments, sets up logging and
  turns an `Err` into exit status 1.
*/

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::assembler::{assemble_file, Assembly};
use crate::bytecode::disassemble;
use crate::config::MachineConfig;
use crate::interpreter::{run, Execution};
use crate::machine::{check_dump_range, MachineState};

/// What `run_command` prints besides the dump.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunOutput {
  pub show_state  : bool,
  pub disassemble : bool,
}

/// `uvm assemble`: records in, binary and audit log out.
pub fn assemble_command(records: &Path, binary: &Path, log: &Path, normalize: bool) -> Result<Assembly> {
  let assembly = assemble_file(records, binary, log, normalize)
    .with_context(|| format!("failed to assemble {}", records.display()))?;
  info!(
    "wrote {} instructions to {}",
    assembly.instructions.len(),
    binary.display()
  );
  Ok(assembly)
}

fn write_dump(state: &MachineState, path: &Path, lo: usize, hi: usize) -> Result<()> {
  let file = File::create(path)
    .with_context(|| format!("could not create dump file {}", path.display()))?;
  state
    .write_dump(BufWriter::new(file), lo, hi)
    .with_context(|| format!("could not write dump to {}", path.display()))
}

/**
  `uvm run`: executes `binary` and writes memory `lo..=hi` to `dump`.

  The range is checked before anything is read. A run that stops on a fault or a malformed
  stream still writes the dump, from the diagnostic state, and then returns the run error.
  Skipped unknown opcodes under permissive dispatch are warnings only.
*/
pub fn run_command(
  binary : &Path,
  dump   : &Path,
  lo     : usize,
  hi     : usize,
  config : &MachineConfig,
  output : RunOutput,
) -> Result<Execution> {
  check_dump_range(lo, hi)?;
  let bytes = fs::read(binary)
    .with_context(|| format!("could not read binary {}", binary.display()))?;

  if output.disassemble {
    for line in disassemble(&bytes) {
      println!("{}", line);
    }
  }

  match run(&bytes, config) {

    Ok(execution) => {
      if output.show_state {
        println!("{}", execution.state);
      }
      write_dump(&execution.state, dump, lo, hi)?;
      if !execution.warnings.is_empty() {
        warn!("{} unknown opcodes were skipped", execution.warnings.len());
      }
      Ok(execution)
    }

    Err(run_error) => {
      eprintln!("{}", run_error.state());
      write_dump(run_error.state(), dump, lo, hi)?;
      Err(run_error).with_context(|| format!("run of {} failed", binary.display()))
    }

  }
}
