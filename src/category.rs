use std::fmt;
use std::str::FromStr;

use crate::error::CykError;

/// A grammar symbol. The set is closed, so charts can store categories as
/// bits and backpointers in flat arrays indexed by `Category::index`.
///
/// Phrase categories appear on the left-hand side of rules. Word classes are
/// what the lexicon assigns to words, and only ever sit on the right.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
  /// Kalimat, a full clause
  K,
  /// Predikat
  P,
  /// Predicate followed by an adverbial
  PK,
  /// Keterangan, an adverbial
  Ket,
  /// Noun phrase
  NP,
  N,
  Pron,
  V,
  Adj,
  Adv,
  Num,
  Prep,
  Det,
}

impl Category {
  pub const COUNT: usize = 13;

  pub const ALL: [Category; Category::COUNT] = [
    Self::K,
    Self::P,
    Self::PK,
    Self::Ket,
    Self::NP,
    Self::N,
    Self::Pron,
    Self::V,
    Self::Adj,
    Self::Adv,
    Self::Num,
    Self::Prep,
    Self::Det,
  ];

  pub fn index(self) -> usize {
    self as usize
  }

  pub fn from_index(idx: usize) -> Option<Self> {
    Self::ALL.get(idx).copied()
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::K => "K",
      Self::P => "P",
      Self::PK => "PK",
      Self::Ket => "Ket",
      Self::NP => "NP",
      Self::N => "N",
      Self::Pron => "Pron",
      Self::V => "V",
      Self::Adj => "Adj",
      Self::Adv => "Adv",
      Self::Num => "Num",
      Self::Prep => "Prep",
      Self::Det => "Det",
    }
  }

  /// Word classes are assigned by the lexicon, never derived by a rule.
  pub fn is_word_class(self) -> bool {
    match self {
      Self::K | Self::P | Self::PK | Self::Ket | Self::NP => false,
      Self::N
      | Self::Pron
      | Self::V
      | Self::Adj
      | Self::Adv
      | Self::Num
      | Self::Prep
      | Self::Det => true,
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl FromStr for Category {
  type Err = CykError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .iter()
      .copied()
      .find(|c| c.name() == s)
      .ok_or_else(|| CykError::UnknownCategory(s.to_string()))
  }
}

/// A set of categories stored as a bitmask. Iteration is in index order, so
/// anything derived from iterating a set is deterministic.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct CategorySet(u32);

impl CategorySet {
  pub fn new() -> Self {
    Self(0)
  }

  pub fn len(&self) -> usize {
    self.0.count_ones() as usize
  }

  pub fn is_empty(&self) -> bool {
    self.0 == 0
  }

  pub fn contains(&self, c: Category) -> bool {
    self.0 & (1 << c.index()) != 0
  }

  /// Adds `c`, returning true if it wasn't already present
  pub fn insert(&mut self, c: Category) -> bool {
    let added = !self.contains(c);
    self.0 |= 1 << c.index();
    added
  }

  /// True if every member of `self` is also in `other`
  pub fn is_subset(&self, other: &CategorySet) -> bool {
    self.0 & !other.0 == 0
  }

  pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
    Category::ALL.iter().copied().filter(move |c| self.contains(*c))
  }
}

impl FromIterator<Category> for CategorySet {
  fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
    let mut set = Self::new();
    for c in iter {
      set.insert(c);
    }
    set
  }
}

impl fmt::Display for CategorySet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{{")?;
    for (idx, c) in self.iter().enumerate() {
      if idx > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{}", c)?;
    }
    write!(f, "}}")
  }
}
