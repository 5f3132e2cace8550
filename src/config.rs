//! Machine configuration. Capacities are fixed when a machine is created; nothing a program
//! does can change them.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_MEMORY_CAPACITY: usize = 1024;
pub const DEFAULT_REGISTER_COUNT: usize = 16;
/// Operand fields carry four bits, so no instruction can name more registers than this.
pub const MAX_REGISTER_COUNT: usize = 16;

/// What the interpreter does with an opcode byte that is not in the instruction set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPolicy {
  /// Log a warning, skip the record and keep going.
  Permissive,
  /// Abort the run with a fault.
  Strict,
}

impl Default for DispatchPolicy {
  fn default() -> Self {
    DispatchPolicy::Permissive
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
  /// Number of memory words.
  pub memory_capacity : usize,
  pub register_count  : usize,
  pub dispatch        : DispatchPolicy,
  /// Reject records whose reserved operand bits are set instead of masking them.
  pub strict_operands : bool,
}

impl Default for MachineConfig {
  fn default() -> Self {
    MachineConfig {
      memory_capacity : DEFAULT_MEMORY_CAPACITY,
      register_count  : DEFAULT_REGISTER_COUNT,
      dispatch        : DispatchPolicy::default(),
      strict_operands : false,
    }
  }
}

impl MachineConfig {
  pub fn from_json_str(text: &str) -> Result<MachineConfig, ConfigError> {
    let config: MachineConfig = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<MachineConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    MachineConfig::from_json_str(&text)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.memory_capacity == 0 {
      return Err(ConfigError::Invalid{ reason: "memory capacity must be at least 1".to_string() });
    }
    if self.register_count == 0 || self.register_count > MAX_REGISTER_COUNT {
      return Err(ConfigError::Invalid{
        reason: format!(
          "register count must be in 1..={}, got {}",
          MAX_REGISTER_COUNT, self.register_count
        )
      });
    }
    Ok(())
  }
}
