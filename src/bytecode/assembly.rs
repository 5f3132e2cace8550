/*!
  The human readable form of a program is a delimited table of instruction records. The first
  row is a header and is skipped. Every other row is

  ```text
      <record>    ::= <mnemonic> ',' <integer> ',' <integer> (',' <anything>)?
      <mnemonic>  ::= [A-Za-z0-9_]+
      <integer>   ::= ('-' | '+')? [0-9]+
  ```

  Whitespace around fields is ignored, as are blank lines and lines starting with `#`. Columns
  after the third are free text and ignored.

  This module deliberately knows nothing about the instruction set beyond the mnemonic of
  `LOAD_CONST`: validating mnemonics and ranges is the encoder's job.
*/

use std::fs;
use std::path::Path;
use std::str::FromStr;

use nom::{
  bytes::complete::take_while1,
  character::complete::{
    char as one_char,
    digit1,
    one_of,
    space0
  },
  combinator::{all_consuming, map_res, opt, recognize, rest},
  sequence::{delimited, pair, preceded, tuple},
  IResult
};
use tracing::debug;

use crate::bytecode::Operation;
use crate::error::SourceError;

/// One instruction as read from a record table. The integers are kept wide and signed so that
/// out of range values survive until the encoder can report them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceRecord {
  /// One-based line in the source table, for diagnostics.
  pub line     : usize,
  pub mnemonic : String,
  pub b        : i64,
  pub c        : i64
}

impl SourceRecord {
  pub fn new(mnemonic: &str, b: i64, c: i64) -> SourceRecord {
    SourceRecord{ line: 0, mnemonic: mnemonic.to_string(), b, c }
  }
}

fn mnemonic_p(input: &str) -> IResult<&str, &str> {
  take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn integer_p(input: &str) -> IResult<&str, i64> {
  map_res(
    recognize(pair(opt(one_of("+-")), digit1)),
    i64::from_str
  )(input)
}

fn field_p<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
  where F: FnMut(&'a str) -> IResult<&'a str, O>
{
  delimited(space0, inner, space0)
}

fn record_p(input: &str) -> IResult<&str, (&str, i64, i64)> {
  let (input, (mnemonic, _, b, _, c, _trailing)) =
    all_consuming(
      tuple((
        field_p(mnemonic_p),
        one_char(','),
        field_p(integer_p),
        one_char(','),
        field_p(integer_p),
        opt(preceded(one_char(','), rest))
      ))
    )(input)?;
  Ok((input, (mnemonic, b, c)))
}

fn is_skipped(line: &str) -> bool {
  let trimmed = line.trim();
  trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parses a whole record table. The first meaningful line is taken to be the header.
pub fn parse_records(text: &str) -> Result<Vec<SourceRecord>, SourceError> {
  let mut records = vec![];
  let mut seen_header = false;

  for (idx, line) in text.lines().enumerate() {
    if is_skipped(line) {
      continue;
    }
    if !seen_header {
      seen_header = true;
      debug!(header = line.trim(), "skipping record table header");
      continue;
    }

    match record_p(line.trim_end_matches('\r')) {
      Ok((_, (mnemonic, b, c))) => {
        records.push(SourceRecord{ line: idx + 1, mnemonic: mnemonic.to_string(), b, c });
      }
      Err(_e) => {
        return Err(SourceError::Syntax{ line: idx + 1, content: line.trim().to_string() });
      }
    }
  }

  Ok(records)
}

pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<SourceRecord>, SourceError> {
  let text = fs::read_to_string(path)?;
  parse_records(&text)
}

/**
  Rewrites negative `LOAD_CONST` constants into their 32 bit two's complement form, so that
  `-12` becomes `4294967284`. This is a property of the record source and not of the encoder,
  which only accepts `b` in `0..=u32::MAX`. Constants below `i32::MIN` are left as they are
  for the encoder to reject.
*/
pub fn normalize_constants(records: &mut [SourceRecord]) {
  for record in records.iter_mut() {
    let is_load_const = matches!(Operation::from_str(&record.mnemonic), Ok(Operation::LoadConst));
    if is_load_const && record.b < 0 && record.b >= i32::MIN as i64 {
      let normalized = record.b + (1i64 << 32);
      debug!(line = record.line, from = record.b, to = normalized, "normalized negative constant");
      record.b = normalized;
    }
  }
}
