//! Command line front end: `uvm assemble` and `uvm run`.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use uvm::commands::{assemble_command, run_command, RunOutput};
use uvm::{DispatchPolicy, MachineConfig};

#[derive(Parser, Debug)]
#[command(
  name = "uvm",
  version,
  about = "Assembler and interpreter for a four instruction virtual machine"
)]
struct Cli {
  /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Encode a table of instruction records into a binary.
  Assemble {
    /// Delimited record table with a header row: `mnemonic,b,c`.
    records: PathBuf,

    /// Where to write the binary.
    binary: PathBuf,

    /// Where to write the audit log.
    log: PathBuf,

    /// Do not fold negative LOAD_CONST constants into two's complement.
    #[arg(long)]
    raw_constants: bool,
  },

  /// Execute a binary and dump a range of memory.
  Run {
    binary: PathBuf,

    /// Where to write the `Address,Value` dump.
    dump: PathBuf,

    /// First address of the dump.
    lo: usize,

    /// Last address of the dump, inclusive.
    hi: usize,

    /// JSON machine configuration. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    memory_capacity: Option<usize>,

    #[arg(long)]
    registers: Option<usize>,

    /// Abort on unknown opcodes instead of skipping them.
    #[arg(long)]
    strict: bool,

    /// Reject records with reserved operand bits set.
    #[arg(long)]
    strict_operands: bool,

    /// Print the final machine state.
    #[arg(long)]
    show_state: bool,

    /// Print the disassembled binary before running it.
    #[arg(long)]
    disassemble: bool,
  },
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => "info",
    1 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  if let Err(e) = dispatch(cli.command) {
    error!("{:#}", e);
    process::exit(1);
  }
}

fn dispatch(command: Commands) -> anyhow::Result<()> {
  match command {
    Commands::Assemble{ records, binary, log, raw_constants } => {
      assemble_command(&records, &binary, &log, !raw_constants)?;
    }

    Commands::Run{
      binary, dump, lo, hi, config, memory_capacity, registers,
      strict, strict_operands, show_state, disassemble
    } => {
      let overrides = ConfigOverrides{ config, memory_capacity, registers, strict, strict_operands };
      let config = overrides.machine_config()?;
      run_command(&binary, &dump, lo, hi, &config, RunOutput{ show_state, disassemble })?;
    }
  }
  Ok(())
}

struct ConfigOverrides {
  config          : Option<PathBuf>,
  memory_capacity : Option<usize>,
  registers       : Option<usize>,
  strict          : bool,
  strict_operands : bool,
}

impl ConfigOverrides {
  fn machine_config(&self) -> anyhow::Result<MachineConfig> {
    let mut config = match &self.config {
      Some(path) => {
        MachineConfig::from_json_file(path)
          .with_context(|| format!("failed to load configuration {}", path.display()))?
      }
      None => MachineConfig::default(),
    };

    if let Some(capacity) = self.memory_capacity {
      config.memory_capacity = capacity;
    }
    if let Some(count) = self.registers {
      config.register_count = count;
    }
    if self.strict {
      config.dispatch = DispatchPolicy::Strict;
    }
    if self.strict_operands {
      config.strict_operands = true;
    }

    config.validate()?;
    Ok(config)
  }
}
