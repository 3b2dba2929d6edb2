use std::fmt;

use crate::category::Category;
use crate::error::{CykError, Result};

/// Index of a rule in its grammar, in declaration order
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

impl fmt::Display for RuleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A rule in Chomsky Normal Form. There is no way to build a rule with any
/// other shape; free-form productions go through `Rule::from_productions`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
  /// `lhs -> class`, where `class` is a word class from the lexicon
  Terminal { lhs: Category, class: Category },
  /// `lhs -> left right`
  Binary {
    lhs: Category,
    left: Category,
    right: Category,
  },
}

impl Rule {
  pub fn terminal(lhs: Category, class: Category) -> Self {
    Self::Terminal { lhs, class }
  }

  pub fn binary(lhs: Category, left: Category, right: Category) -> Self {
    Self::Binary { lhs, left, right }
  }

  /// Checks a free-form production against CNF
  pub fn from_productions(lhs: Category, productions: &[Category]) -> Result<Self> {
    match productions {
      [class] if class.is_word_class() => Ok(Self::terminal(lhs, *class)),
      [other] => Err(CykError::InvalidGrammar(format!(
        "unit production {} -> {}: a single right-hand symbol must be a word class",
        lhs, other
      ))),
      [left, right] => Ok(Self::binary(lhs, *left, *right)),
      _ => Err(CykError::InvalidGrammar(format!(
        "{} -> {} has {} right-hand symbols, expected 1 or 2",
        lhs,
        productions
          .iter()
          .map(|c| c.name())
          .collect::<Vec<_>>()
          .join(" "),
        productions.len()
      ))),
    }
  }

  pub fn lhs(&self) -> Category {
    match self {
      Self::Terminal { lhs, .. } | Self::Binary { lhs, .. } => *lhs,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Terminal { .. })
  }

  /// The label used in derivation patterns, e.g. `K→NP P`
  pub fn label(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Terminal { lhs, class } => write!(f, "{}→{}", lhs, class),
      Self::Binary { lhs, left, right } => write!(f, "{}→{} {}", lhs, left, right),
    }
  }
}
