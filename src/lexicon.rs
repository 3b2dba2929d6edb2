use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::category::CategorySet;
use crate::error::{CykError, Result};
use crate::utils::Err;

/// Maps lowercase words to the word classes they can take.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
  entries: HashMap<String, CategorySet>,
}

/// Result of checking a sentence's words against the lexicon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconCheck {
  pub all_known: bool,
  /// Each unknown word once, in order of first occurrence
  pub unknown_words: Vec<String>,
}

impl Lexicon {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn read_from_file<P: AsRef<Path>>(filename: P) -> std::result::Result<Self, Err> {
    Ok(fs::read_to_string(filename)?.parse()?)
  }

  /// Adds classes for a word, merging with any it already has. Only word
  /// classes may be assigned, and at least one must be.
  pub fn insert(&mut self, word: impl Into<String>, classes: CategorySet) -> Result<()> {
    let word = word.into();
    if classes.is_empty() {
      return Err(CykError::InvalidLexicon(format!("'{}' has no word classes", word)));
    }
    if let Some(bad) = classes.iter().find(|c| !c.is_word_class()) {
      return Err(CykError::InvalidLexicon(format!(
        "'{}' is given {}, which is not a word class",
        word, bad
      )));
    }
    let entry = self.entries.entry(word).or_default();
    for class in classes.iter() {
      entry.insert(class);
    }
    Ok(())
  }

  pub fn classes(&self, word: &str) -> Option<CategorySet> {
    self.entries.get(word).copied()
  }

  pub fn contains(&self, word: &str) -> bool {
    self.entries.contains_key(word)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Checks every word against the lexicon. Does not parse anything.
  pub fn check(&self, words: &[&str]) -> LexiconCheck {
    let mut unknown_words: Vec<String> = Vec::new();
    for word in words {
      if !self.contains(word) && !unknown_words.iter().any(|w| w.as_str() == *word) {
        unknown_words.push(word.to_string());
      }
    }

    LexiconCheck {
      all_known: unknown_words.is_empty(),
      unknown_words,
    }
  }

  /// Word classes for each word, or None if any word is unknown
  pub fn lookup_all(&self, words: &[&str]) -> Option<Vec<CategorySet>> {
    words.iter().map(|w| self.classes(w)).collect()
  }
}
