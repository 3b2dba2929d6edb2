use std::fmt;

use crate::category::Category;
use crate::chart::Span;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Constituent {
  pub category: Category,
  pub span: Span,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Word {
  pub value: String,
  pub category: Category,
  pub span: Span,
}

/// A binary derivation tree. Owns its words, so it outlives the chart it
/// was extracted from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SynTree {
  Branch(Constituent, Box<SynTree>, Box<SynTree>),
  Leaf(Word),
}

impl SynTree {
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(..))
  }

  pub fn get_branch(&self) -> Option<(&Constituent, &SynTree, &SynTree)> {
    match self {
      Self::Branch(c, l, r) => Some((c, l, r)),
      _ => None,
    }
  }

  pub fn category(&self) -> Category {
    match self {
      Self::Branch(c, _, _) => c.category,
      Self::Leaf(w) => w.category,
    }
  }

  pub fn span(&self) -> Span {
    match self {
      Self::Branch(c, _, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  /// Leaves, left to right
  pub fn leaves(&self) -> Vec<&Word> {
    let mut leaves = Vec::new();
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      match node {
        Self::Leaf(w) => leaves.push(w),
        Self::Branch(_, l, r) => {
          stack.push(r);
          stack.push(l);
        }
      }
    }
    leaves
  }

  /// The sentence the tree covers
  pub fn words(&self) -> Vec<&str> {
    self.leaves().into_iter().map(|w| w.value.as_str()).collect()
  }

  fn render(&self, f: &mut fmt::Formatter<'_>, prefix: &str, position: Position) -> fmt::Result {
    let connector = position.connector();
    match self {
      Self::Leaf(w) => writeln!(f, "{}{}{} → {}", prefix, connector, w.category, w.value),
      Self::Branch(c, l, r) => {
        writeln!(f, "{}{}{}", prefix, connector, c.category)?;
        let child_prefix = format!("{}{}", prefix, position.indent());
        l.render(f, &child_prefix, Position::Middle)?;
        r.render(f, &child_prefix, Position::Last)
      }
    }
  }
}

/// Where a node sits under its parent when rendered
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Position {
  Root,
  Middle,
  Last,
}

impl Position {
  fn connector(self) -> &'static str {
    match self {
      Self::Root => "",
      Self::Middle => "├── ",
      Self::Last => "└── ",
    }
  }

  /// What the node's children are indented by, beyond the node's own prefix
  fn indent(self) -> &'static str {
    match self {
      Self::Root => "",
      Self::Middle => "│   ",
      Self::Last => "    ",
    }
  }
}

impl fmt::Display for SynTree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.render(f, "", Position::Root)
  }
}

/// Renders a tree with box-drawing connectors, one node per line. Branches
/// show their category, leaves `category → word`.
pub fn format_tree(tree: &SynTree) -> String {
  tree.to_string()
}
