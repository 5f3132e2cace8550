//! The register file and memory of the virtual machine.

use std::fmt::{Display, Formatter};
use std::io::Write;

use lazy_static::lazy_static;
use prettytable::{format as TableFormat, row, table, Table};

use crate::config::MachineConfig;
use crate::error::{DumpRangeError, ExecutionError, Field, PreloadError};

pub type Word = i32;

/// The widest range a dump report will produce.
pub const MAX_DUMP_SPAN: usize = 1 << 20;

/// Checks that `[lo, hi]` is a usable report range.
pub fn check_dump_range(lo: usize, hi: usize) -> Result<(), DumpRangeError> {
  if lo > hi {
    return Err(DumpRangeError::Reversed{ lo, hi });
  }
  match hi - lo < MAX_DUMP_SPAN {
    true  => Ok(()),
    false => Err(DumpRangeError::TooWide{ lo, hi, max: MAX_DUMP_SPAN })
  }
}

/**
  Registers and memory words for a single run. Both are zero-initialized and sized once at
  creation. Every access made on behalf of an instruction goes through a checked accessor that
  reports a `RegisterFault` or `MemoryFault` instead of growing or panicking. `dump` is the only
  lenient view, and it is read-only.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineState {
  registers : Box<[Word]>,
  memory    : Box<[Word]>,
}

impl MachineState {

  // region Construction

  pub fn new(memory_capacity: usize, register_count: usize) -> MachineState {
    MachineState {
      registers : vec![0; register_count].into_boxed_slice(),
      memory    : vec![0; memory_capacity].into_boxed_slice(),
    }
  }

  pub fn from_config(config: &MachineConfig) -> MachineState {
    MachineState::new(config.memory_capacity, config.register_count)
  }

  /// Copies `words` into memory starting at `start`, for preparing a machine before a run.
  pub fn with_memory(mut self, start: usize, words: &[Word]) -> Result<MachineState, PreloadError> {
    let capacity = self.memory.len();
    match start.checked_add(words.len()) {

      Some(end) if end <= capacity => {
        self.memory[start..end].copy_from_slice(words);
        Ok(self)
      }

      _ => Err(PreloadError{ start, len: words.len(), capacity })

    }
  }

  // endregion

  // region Accessors

  pub fn registers(&self) -> &[Word] {
    &self.registers
  }

  pub fn memory(&self) -> &[Word] {
    &self.memory
  }

  pub fn register_count(&self) -> usize {
    self.registers.len()
  }

  pub fn memory_capacity(&self) -> usize {
    self.memory.len()
  }

  /// Checks that `index`, taken from `field`, names a register of this machine.
  pub fn check_register(&self, index: usize, field: Field) -> Result<usize, ExecutionError> {
    match index < self.registers.len() {
      true  => Ok(index),
      false => Err(ExecutionError::RegisterFault{ field, index, count: self.registers.len() })
    }
  }

  pub fn register(&self, index: usize, field: Field) -> Result<Word, ExecutionError> {
    let index = self.check_register(index, field)?;
    Ok(self.registers[index])
  }

  pub fn set_register(&mut self, index: usize, value: Word, field: Field) -> Result<(), ExecutionError> {
    let index = self.check_register(index, field)?;
    self.registers[index] = value;
    Ok(())
  }

  /// Interprets the contents of the register named by `field` as a memory address.
  pub fn address_in(&self, register: usize, field: Field) -> Result<usize, ExecutionError> {
    let address = self.register(register, field)?;
    match address >= 0 && (address as usize) < self.memory.len() {
      true  => Ok(address as usize),
      false => Err(ExecutionError::MemoryFault{
        field,
        address  : address as i64,
        capacity : self.memory.len()
      })
    }
  }

  /// Reads a word at an address already checked by `address_in`.
  pub fn read_memory(&self, address: usize) -> Word {
    self.memory[address]
  }

  pub fn write_memory(&mut self, address: usize, value: Word) {
    self.memory[address] = value;
  }

  // endregion

  // region Dump

  /**
    Returns `(address, value)` for every address in the inclusive range `[lo, hi]`. Addresses
    past the end of memory read as zero. This leniency exists for reporting only; instructions
    never see it. The pairs are produced lazily, so any range is safe to ask for; an empty
    iterator results when `lo > hi`.
  */
  pub fn dump(&self, lo: usize, hi: usize) -> impl Iterator<Item = (usize, Word)> + '_ {
    (lo..=hi).map(move |address| (address, self.memory.get(address).copied().unwrap_or(0)))
  }

  /// Writes `dump(lo, hi)` as a two column table with an `Address,Value` header.
  pub fn write_dump<W: Write>(&self, mut writer: W, lo: usize, hi: usize) -> std::io::Result<()> {
    writeln!(writer, "Address,Value")?;
    for (address, value) in self.dump(lo, hi) {
      writeln!(writer, "{},{}", address, value)?;
    }
    writer.flush()
  }

  // endregion

  // region Display methods

  fn make_cell_table<'a, I>(name: char, cells: I) -> Table
    where I: Iterator<Item = (usize, &'a Word)>
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, cell) in cells {
      table.add_row(row![r->format!("{}[{}] =", name, i), format!("{}", cell)]);
    }
    table
  }

  // endregion
}

impl Display for MachineState {
  /// Shows every register and only the nonzero memory words.
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let r_table = MachineState::make_cell_table('R', self.registers.iter().enumerate());
    let m_table = MachineState::make_cell_table(
      'M',
      self.memory.iter().enumerate().filter(|(_, word)| **word != 0)
    );

    let mut combined_table = table!([r_table, m_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(
      f,
      "{} registers, {} memory words\n{}",
      self.registers.len(), self.memory.len(), combined_table
    )
  }
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}


#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn starts_zeroed_with_fixed_capacity() {
    let state = MachineState::new(8, 16);
    assert_eq!(state.registers(), &[0; 16][..]);
    assert_eq!(state.memory(), &[0; 8][..]);
  }

  #[test]
  fn register_access_is_bounds_checked() {
    let mut state = MachineState::new(4, 4);
    state.set_register(3, -9, Field::C).unwrap();
    assert_eq!(state.register(3, Field::C), Ok(-9));
    assert_eq!(
      state.set_register(4, 1, Field::B),
      Err(ExecutionError::RegisterFault{ field: Field::B, index: 4, count: 4 })
    );
  }

  #[test]
  fn addresses_must_fall_inside_memory() {
    let mut state = MachineState::new(4, 16);
    state.set_register(1, 3, Field::C).unwrap();
    state.set_register(2, 4, Field::C).unwrap();
    state.set_register(3, -1, Field::C).unwrap();

    assert_eq!(state.address_in(1, Field::C), Ok(3));
    assert_eq!(
      state.address_in(2, Field::C),
      Err(ExecutionError::MemoryFault{ field: Field::C, address: 4, capacity: 4 })
    );
    assert_eq!(
      state.address_in(3, Field::B),
      Err(ExecutionError::MemoryFault{ field: Field::B, address: -1, capacity: 4 })
    );
  }

  #[test]
  fn dump_reads_zero_past_capacity() {
    let state = MachineState::new(3, 16).with_memory(1, &[5, -6]).unwrap();
    assert_eq!(state.dump(1, 4).collect::<Vec<_>>(), vec![(1, 5), (2, -6), (3, 0), (4, 0)]);
    assert_eq!(state.dump(2, 1).count(), 0);
  }

  #[test]
  fn dump_of_the_whole_address_space_is_lazy() {
    let state = MachineState::new(4, 16).with_memory(3, &[9]).unwrap();
    let mut words = state.dump(0, usize::MAX);
    assert_eq!(words.nth(3), Some((3, 9)));
    assert_eq!(words.next(), Some((4, 0)));

    let tail: Vec<_> = state.dump(usize::MAX - 1, usize::MAX).collect();
    assert_eq!(tail, vec![(usize::MAX - 1, 0), (usize::MAX, 0)]);
  }

  #[test]
  fn report_ranges_are_bounded() {
    assert_eq!(check_dump_range(0, 6), Ok(()));
    assert_eq!(check_dump_range(5, 5), Ok(()));
    assert_eq!(check_dump_range(7, 6), Err(DumpRangeError::Reversed{ lo: 7, hi: 6 }));
    assert_eq!(
      check_dump_range(0, usize::MAX),
      Err(DumpRangeError::TooWide{ lo: 0, hi: usize::MAX, max: MAX_DUMP_SPAN })
    );
  }

  #[test]
  fn preloading_past_capacity_is_rejected() {
    assert_eq!(
      MachineState::new(2, 16).with_memory(1, &[1, 2]),
      Err(PreloadError{ start: 1, len: 2, capacity: 2 })
    );
    assert_eq!(
      MachineState::new(4, 16).with_memory(usize::MAX, &[1]),
      Err(PreloadError{ start: usize::MAX, len: 1, capacity: 4 })
    );
  }

  #[test]
  fn dump_is_written_as_address_value_rows() {
    let state = MachineState::new(2, 16).with_memory(0, &[7, -8]).unwrap();
    let mut out = vec![];
    state.write_dump(&mut out, 0, 2).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Address,Value\n0,7\n1,-8\n2,0\n");
  }

  #[test]
  fn display_lists_only_nonzero_memory() {
    let state = MachineState::new(64, 2).with_memory(10, &[42]).unwrap();
    let text = state.to_string();
    assert!(text.contains("M[10] ="));
    assert!(!text.contains("M[11] ="));
    assert!(text.contains("R[1] ="));
  }
}
