//! Labelled sentence datasets.
//!
//! One record per line, `LABEL|sentence`, where a label of `VALID` (any case)
//! marks a sentence expected to parse and anything else one expected not to.
//! A line starting with `#` names the category for the records after it.
//! Blank lines and lines without a `|` are skipped.

use std::fs;
use std::path::Path;

use seken::Err;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
  pub sentence: String,
  pub expected: bool,
  pub category: String,
}

pub fn parse_dataset(src: &str) -> Vec<TestCase> {
  let mut cases = Vec::new();
  let mut category = DEFAULT_CATEGORY.to_string();

  for line in src.lines().map(str::trim) {
    if line.is_empty() {
      continue;
    }

    if let Some(header) = line.strip_prefix('#') {
      let header = header.trim_start_matches('#').trim();
      category = if header.is_empty() {
        DEFAULT_CATEGORY.to_string()
      } else {
        header.to_string()
      };
      continue;
    }

    let mut parts = line.split('|');
    if let (Some(label), Some(sentence)) = (parts.next(), parts.next()) {
      cases.push(TestCase {
        sentence: sentence.trim().to_string(),
        expected: label.trim().eq_ignore_ascii_case("valid"),
        category: category.clone(),
      });
    }
  }

  cases
}

pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<TestCase>, Err> {
  Ok(parse_dataset(&fs::read_to_string(path)?))
}
