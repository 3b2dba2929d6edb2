use std::fmt;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::category::{Category, CategorySet};
use crate::error::{CykError, Result};
use crate::rules::{Rule, RuleId};
use crate::utils::Err;

/// A validated CNF grammar. Read-only once built, and shared by reference
/// between any number of parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
  pub start: Category,
  rules: Vec<Rule>,
  binary: Vec<RuleId>,
  /// Terminal rules indexed by the word class they consume
  terminal_by_class: Vec<Vec<RuleId>>,
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "%start {};", self.start)?;
    for rule in self.rules.iter() {
      match rule {
        Rule::Terminal { lhs, class } => writeln!(f, "{} -> {};", lhs, class)?,
        Rule::Binary { lhs, left, right } => writeln!(f, "{} -> {} {};", lhs, left, right)?,
      }
    }
    Ok(())
  }
}

impl Grammar {
  /// Builds a grammar from rules in declaration order. Declaration order is
  /// significant: it decides which derivation is kept when several exist.
  pub fn new(start: Category, rules: Vec<Rule>) -> Result<Self> {
    if rules.is_empty() {
      return Err(CykError::InvalidGrammar("empty ruleset".into()));
    }
    if start.is_word_class() {
      return Err(CykError::InvalidGrammar(format!(
        "start symbol {} is a word class",
        start
      )));
    }

    let mut binary = Vec::new();
    let mut terminal_by_class = vec![Vec::new(); Category::COUNT];

    for (idx, rule) in rules.iter().enumerate() {
      if rule.lhs().is_word_class() {
        return Err(CykError::InvalidGrammar(format!(
          "rule {} rewrites the word class {}",
          rule,
          rule.lhs()
        )));
      }
      if rules[..idx].contains(rule) {
        warn!(%rule, "duplicate grammar rule");
      }

      match rule {
        Rule::Terminal { class, .. } => {
          if !class.is_word_class() {
            return Err(CykError::InvalidGrammar(format!(
              "unit production {}: {} is not a word class",
              rule, class
            )));
          }
          terminal_by_class[class.index()].push(RuleId(idx));
        }
        Rule::Binary { .. } => binary.push(RuleId(idx)),
      }
    }

    if !rules.iter().any(|r| r.lhs() == start) {
      return Err(CykError::InvalidGrammar(format!(
        "no rule produces the start symbol {}",
        start
      )));
    }

    Ok(Self {
      start,
      rules,
      binary,
      terminal_by_class,
    })
  }

  pub fn read_from_file<P: AsRef<Path>>(filename: P) -> std::result::Result<Self, Err> {
    Ok(fs::read_to_string(filename)?.parse()?)
  }

  pub fn rule(&self, id: RuleId) -> Option<&Rule> {
    self.rules.get(id.0)
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Binary rules, in declaration order
  pub fn binary_rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> + '_ {
    self.binary.iter().map(move |id| (*id, &self.rules[id.0]))
  }

  /// Terminal rules consuming `class`, in declaration order
  pub fn terminal_rules(&self, class: Category) -> impl Iterator<Item = (RuleId, &Rule)> + '_ {
    self.terminal_by_class[class.index()]
      .iter()
      .map(move |id| (*id, &self.rules[id.0]))
  }

  /// All categories a single word with these classes can carry: the classes
  /// themselves plus the heads of terminal rules consuming them.
  pub fn terminal_categories(&self, classes: CategorySet) -> CategorySet {
    let mut out = classes;
    for class in classes.iter() {
      for (_, rule) in self.terminal_rules(class) {
        out.insert(rule.lhs());
      }
    }
    out
  }
}
