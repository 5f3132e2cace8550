//! End to end: record table -> binary -> run -> dump.

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use uvm::assembler::{assemble_file, encode};
use uvm::bytecode::{parse_records, try_decode_instruction, INSTRUCTION_SIZE};
use uvm::error::{AssembleFileError, AssemblyError, Field};
use uvm::{
  run, ExecutionError, Interpreter, MachineConfig, MachineState, Operation, RunError, SourceRecord
};

const VECTOR: [i32; 7] = [-12, 15, -20, 25, -30, 35, -40];

/// For every address `i`: point R8 at `i`, take `abs` of the word into R9, store it back.
fn vector_abs_records() -> Vec<SourceRecord> {
  (0..VECTOR.len() as i64)
    .flat_map(|address| {
      vec![
        SourceRecord::new("LOAD_CONST", address, 8),
        SourceRecord::new("UNARY_ABS",  9,       8),
        SourceRecord::new("STORE_MEM",  8,       9),
      ]
    })
    .collect()
}

#[test]
fn vector_abs_over_preloaded_memory() {
  let state = MachineState::new(1024, 16).with_memory(0, &VECTOR).unwrap();
  let assembly = encode(&vector_abs_records()).unwrap();

  let execution = Interpreter::with_state(&MachineConfig::default(), state)
    .run(&assembly.bytes)
    .unwrap();

  let dumped: Vec<i32> = execution.state.dump(0, 6).into_iter().map(|(_, value)| value).collect();
  assert_eq!(dumped, vec![12, 15, 20, 25, 30, 35, 40]);
  assert_eq!(execution.executed, 21);
}

#[test]
fn vector_abs_from_a_record_file() {
  let dir = tempdir().unwrap();
  let records_path = dir.path().join("vector_abs.csv");
  let binary_path  = dir.path().join("vector_abs.bin");
  let log_path     = dir.path().join("vector_abs.log.csv");
  let dump_path    = dir.path().join("result.csv");

  // Store the vector with negative constants, then take absolute values in place.
  let mut table = String::from("Operation,B,C\n");
  for (address, value) in VECTOR.iter().enumerate() {
    table.push_str(&format!("LOAD_CONST,{},1\nLOAD_CONST,{},2\nSTORE_MEM,1,2\n", address, value));
  }
  for record in vector_abs_records() {
    table.push_str(&format!("{},{},{}\n", record.mnemonic, record.b, record.c));
  }
  fs::write(&records_path, table).unwrap();

  let assembly = assemble_file(&records_path, &binary_path, &log_path, true).unwrap();
  let bytes = fs::read(&binary_path).unwrap();
  assert_eq!(bytes, assembly.bytes);
  assert_eq!(bytes.len(), (VECTOR.len() * 3 * 2) * INSTRUCTION_SIZE);

  let log = fs::read_to_string(&log_path).unwrap();
  let mut lines = log.lines();
  assert_eq!(lines.next(), Some("Mnemonic,Opcode,B,C"));
  assert_eq!(lines.next(), Some("LOAD_CONST,0xC5,0,1"));
  assert_eq!(lines.next(), Some("LOAD_CONST,0xC5,4294967284,2"));
  assert_eq!(log.lines().count(), 1 + VECTOR.len() * 6);

  let execution = run(&bytes, &MachineConfig::default()).unwrap();
  execution.state.write_dump(fs::File::create(&dump_path).unwrap(), 0, 7).unwrap();
  assert_eq!(
    fs::read_to_string(&dump_path).unwrap(),
    "Address,Value\n0,12\n1,15\n2,20\n3,25\n4,30\n5,35\n6,40\n7,0\n"
  );
}

#[test]
fn negative_constants_are_rejected_without_normalization() {
  let dir = tempdir().unwrap();
  let records_path = dir.path().join("program.csv");
  let binary_path  = dir.path().join("program.bin");
  let log_path     = dir.path().join("program.log.csv");
  fs::write(&records_path, "Operation,B,C\nLOAD_CONST,5,0\nLOAD_CONST,-5,1\n").unwrap();

  match assemble_file(&records_path, &binary_path, &log_path, false) {
    Err(AssembleFileError::Assembly(AssemblyError::FieldOutOfRange{ index, line, field, value, .. })) => {
      assert_eq!((index, line, field, value), (1, 3, Field::B, -5));
    }
    other => panic!("expected an out of range field, got {:?}", other),
  }
  assert!(!binary_path.exists());
  assert!(!log_path.exists());
}

#[test]
fn audit_log_failure_leaves_the_binary_in_place() {
  let dir = tempdir().unwrap();
  let records_path = dir.path().join("program.csv");
  let binary_path  = dir.path().join("program.bin");
  let log_path     = dir.path().join("no").join("such").join("dir").join("program.log.csv");
  fs::write(&records_path, "Operation,B,C\nLOAD_CONST,7,0\nwrite,1,0\n").unwrap();

  let assembly = assemble_file(&records_path, &binary_path, &log_path, true).unwrap();

  assert_eq!(fs::read(&binary_path).unwrap(), assembly.bytes);
  assert_eq!(assembly.bytes, vec![0xC5, 0, 0, 0, 7, 0, 0x6B, 0, 0, 0, 1, 0]);
  assert!(!log_path.exists());
}

#[test]
fn encoder_output_decodes_to_the_source_records() {
  let records = parse_records("op,b,c\nLOAD_CONST,4294967295,0\nread,1,15\nwrite,0,3\nabs,15,15\n")
    .unwrap();
  let assembly = encode(&records).unwrap();

  for (record, chunk) in records.iter().zip(assembly.bytes.chunks_exact(INSTRUCTION_SIZE)) {
    let mut bytes = [0u8; INSTRUCTION_SIZE];
    bytes.copy_from_slice(chunk);
    let instruction = try_decode_instruction(&bytes, true).unwrap();
    assert_eq!(instruction.b as i64, record.b);
    assert_eq!(instruction.c as i64, record.c);
    assert_eq!(instruction.opcode, record.mnemonic.parse::<Operation>().unwrap());
  }
}

#[test]
fn fault_reports_the_instruction_and_keeps_the_state() {
  let records = vec![
    SourceRecord::new("LOAD_CONST", 3,    0),
    SourceRecord::new("LOAD_CONST", 2000, 1),
    SourceRecord::new("LOAD_MEM",   2,    1),
    SourceRecord::new("LOAD_CONST", 9,    5),
  ];
  let bytes = encode(&records).unwrap().bytes;

  match run(&bytes, &MachineConfig::default()) {
    Err(RunError::Faulted(fault)) => {
      assert_eq!(fault.index, 2);
      assert_eq!(fault.error, ExecutionError::MemoryFault{ field: Field::C, address: 2000, capacity: 1024 });
      assert_eq!(&fault.state.registers()[..6], &[3, 2000, 0, 0, 0, 0][..]);
      assert!(fault.to_string().starts_with("instruction 2 at byte 12"));
    }
    other => panic!("expected a fault, got {:?}", other.map(|e| e.executed)),
  }
}

#[test]
fn bundled_vector_demo_produces_absolute_values() {
  let demo = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/vector_abs.csv");
  let mut records = uvm::bytecode::read_records(demo).unwrap();
  uvm::bytecode::normalize_constants(&mut records);

  let execution = run(&encode(&records).unwrap().bytes, &MachineConfig::default()).unwrap();
  assert_eq!(
    execution.state.dump(0, 6).collect::<Vec<_>>(),
    vec![(0, 12), (1, 15), (2, 20), (3, 25), (4, 30), (5, 35), (6, 40)]
  );
  assert!(execution.warnings.is_empty());
}
