use std::fmt;
use std::time::Instant;

use tracing::{debug, trace};

use crate::category::{Category, CategorySet};
use crate::grammar::Grammar;
use crate::rules::{Rule, RuleId};

/// A run of `len` words starting at word `start`
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
  pub start: usize,
  pub len: usize,
}

impl Span {
  pub fn new(start: usize, len: usize) -> Self {
    Self { start, len }
  }

  /// One past the last word
  pub fn end(&self) -> usize {
    self.start + self.len
  }

  /// Splits into `(start, split)` and `(start + split, len - split)`
  pub fn split(&self, split: usize) -> (Span, Span) {
    (
      Span::new(self.start, split),
      Span::new(self.start + split, self.len - split),
    )
  }
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start, self.end())
  }
}

/// How a category came to be in a cell. Only the first one found is kept.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Backpointer {
  /// The word itself carries this class in the lexicon
  Lexical,
  /// Produced from one of the word's classes by a terminal rule
  Terminal { rule: RuleId },
  /// Produced by a binary rule from the cells either side of `split`
  Binary {
    rule: RuleId,
    split: usize,
    left: Category,
    right: Category,
  },
}

/// Which derivation wins when a category can be built several ways over the
/// same span. Either way the first one found is kept and later ones are
/// dropped.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum DerivationOrder {
  /// Try split points in ascending order, and at each split the binary rules
  /// in declaration order. The leftmost split that works wins.
  #[default]
  SplitMajor,
  /// Try binary rules in declaration order, and for each rule the split
  /// points in ascending order. The earliest declared rule that works wins.
  RuleMajor,
}

/// Chart building ran past its deadline
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Interrupted {
  /// Every span up to this length had been filled
  pub completed_len: usize,
}

/// A CYK table over `n` words. Cells are stored flat, indexed by
/// `(len - 1) * n + start`, and backpointers likewise with one slot per
/// category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
  n: usize,
  cells: Vec<CategorySet>,
  backpointers: Vec<Option<Backpointer>>,
}

impl Chart {
  pub fn new(n: usize) -> Self {
    Self {
      n,
      cells: vec![CategorySet::new(); n * n],
      backpointers: vec![None; n * n * Category::COUNT],
    }
  }

  /// Number of words the chart covers
  pub fn len(&self) -> usize {
    self.n
  }

  pub fn is_empty(&self) -> bool {
    self.n == 0
  }

  pub fn has_span(&self, span: Span) -> bool {
    span.len >= 1 && span.end() <= self.n
  }

  fn cell_idx(&self, span: Span) -> usize {
    debug_assert!(self.has_span(span), "span {} outside chart", span);
    (span.len - 1) * self.n + span.start
  }

  fn bp_idx(&self, span: Span, c: Category) -> usize {
    self.cell_idx(span) * Category::COUNT + c.index()
  }

  /// Categories derivable for exactly `span`. Empty for spans outside the chart.
  pub fn cell(&self, span: Span) -> CategorySet {
    if self.has_span(span) {
      self.cells[self.cell_idx(span)]
    } else {
      CategorySet::new()
    }
  }

  pub fn backpointer(&self, span: Span, c: Category) -> Option<Backpointer> {
    if self.has_span(span) {
      self.backpointers[self.bp_idx(span, c)]
    } else {
      None
    }
  }

  /// Adds `c` to the cell at `span`, keeping an existing backpointer if
  /// there is one. Returns true if `c` is new to the cell.
  fn add(&mut self, span: Span, c: Category, bp: Backpointer) -> bool {
    let cell_idx = self.cell_idx(span);
    let bp_idx = self.bp_idx(span, c);
    let added = self.cells[cell_idx].insert(c);
    if self.backpointers[bp_idx].is_none() {
      self.backpointers[bp_idx] = Some(bp);
    }
    if added {
      trace!(%span, category = %c, ?bp, "added");
    }
    added
  }

  /// The cell covering the whole sentence, for diagnostics. Empty when there
  /// are no words.
  pub fn top_categories(&self) -> CategorySet {
    self.cell(Span::new(0, self.n))
  }

  /// True iff `start` covers the whole sentence
  pub fn accepts(&self, start: Category) -> bool {
    self.top_categories().contains(start)
  }

  /// All spans, shortest first, then left to right
  pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
    (1..=self.n).flat_map(move |len| (0..=self.n - len).map(move |start| Span::new(start, len)))
  }

  pub fn display<'a>(&'a self, grammar: &'a Grammar) -> ChartDisplay<'a> {
    ChartDisplay {
      chart: self,
      grammar,
    }
  }

  /// Fills a chart bottom-up. `classes` holds each word's lexicon classes.
  /// If `deadline` passes before the chart is complete, building stops.
  pub fn build(
    grammar: &Grammar,
    classes: &[CategorySet],
    order: DerivationOrder,
    deadline: Option<Instant>,
  ) -> Result<Self, Interrupted> {
    let n = classes.len();
    let mut chart = Self::new(n);

    for (start, word_classes) in classes.iter().enumerate() {
      let span = Span::new(start, 1);
      for class in word_classes.iter() {
        chart.add(span, class, Backpointer::Lexical);
      }
      for (idx, rule) in grammar.rules().iter().enumerate() {
        if let Rule::Terminal { lhs, class } = *rule {
          if word_classes.contains(class) {
            chart.add(span, lhs, Backpointer::Terminal { rule: RuleId(idx) });
          }
        }
      }
    }

    for len in 2..=n {
      for start in 0..=n - len {
        if deadline.is_some_and(|d| Instant::now() >= d) {
          debug!(len, start, "chart deadline passed");
          return Err(Interrupted {
            completed_len: len - 1,
          });
        }

        let span = Span::new(start, len);
        match order {
          DerivationOrder::SplitMajor => {
            for split in 1..len {
              for (id, rule) in grammar.binary_rules() {
                chart.combine(span, split, id, rule);
              }
            }
          }
          DerivationOrder::RuleMajor => {
            for (id, rule) in grammar.binary_rules() {
              for split in 1..len {
                chart.combine(span, split, id, rule);
              }
            }
          }
        }
      }
    }

    debug!(words = n, top = %chart.top_categories(), "chart complete");
    Ok(chart)
  }

  fn combine(&mut self, span: Span, split: usize, id: RuleId, rule: &Rule) {
    if let Rule::Binary { lhs, left, right } = *rule {
      let (l, r) = span.split(split);
      if self.cell(l).contains(left) && self.cell(r).contains(right) {
        self.add(
          span,
          lhs,
          Backpointer::Binary {
            rule: id,
            split,
            left,
            right,
          },
        );
      }
    }
  }

  #[cfg(test)]
  pub(crate) fn clear_backpointer(&mut self, span: Span, c: Category) {
    let idx = self.bp_idx(span, c);
    self.backpointers[idx] = None;
  }
}

/// Displays a chart with rule labels from its grammar
pub struct ChartDisplay<'a> {
  chart: &'a Chart,
  grammar: &'a Grammar,
}

impl fmt::Display for ChartDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut last_len = 0;
    for span in self.chart.spans() {
      if span.len != last_len {
        writeln!(f, "Length {}:", span.len)?;
        last_len = span.len;
      }
      let cell = self.chart.cell(span);
      writeln!(f, "  {}: {}", span, cell)?;
      for c in cell.iter() {
        match self.chart.backpointer(span, c) {
          Some(Backpointer::Lexical) => writeln!(f, "    {}: lexical", c)?,
          Some(Backpointer::Terminal { rule }) => match self.grammar.rule(rule) {
            Some(r) => writeln!(f, "    {}: {}", c, r)?,
            None => writeln!(f, "    {}: {}", c, rule)?,
          },
          Some(Backpointer::Binary { rule, split, .. }) => match self.grammar.rule(rule) {
            Some(r) => writeln!(f, "    {}: {} split {}", c, r, split)?,
            None => writeln!(f, "    {}: {} split {}", c, rule, split)?,
          },
          None => writeln!(f, "    {}: ???", c)?,
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use Category::*;

  fn set(cs: &[Category]) -> CategorySet {
    cs.iter().copied().collect()
  }

  fn grammar() -> Grammar {
    r#"
      K -> NP P;
      NP -> N;
      NP -> Pron;
      P -> V;
      P -> V NP;
      NP -> N NP;
    "#
    .parse()
    .unwrap()
  }

  #[test]
  fn test_empty_input() {
    let chart = Chart::build(&grammar(), &[], DerivationOrder::default(), None).unwrap();
    assert!(chart.is_empty());
    assert_eq!(chart.spans().count(), 0);
    assert!(chart.top_categories().is_empty());
    assert!(!chart.accepts(K));
  }

  #[test]
  fn test_single_word_only_fills_base_cell() {
    let g = grammar();
    let chart = Chart::build(&g, &[set(&[V])], DerivationOrder::default(), None).unwrap();
    assert_eq!(chart.spans().collect::<Vec<_>>(), vec![Span::new(0, 1)]);
    assert_eq!(chart.top_categories(), set(&[P, V]));
    assert_eq!(chart.backpointer(Span::new(0, 1), V), Some(Backpointer::Lexical));
    assert_eq!(
      chart.backpointer(Span::new(0, 1), P),
      Some(Backpointer::Terminal { rule: RuleId(3) })
    );
    assert!(!chart.accepts(K));
  }

  #[test]
  fn test_single_word_accepted_when_start_is_terminal_category() {
    let g: Grammar = "K -> V; K -> N V;".parse().unwrap();
    let classes = [set(&[V])];
    let chart = Chart::build(&g, &classes, DerivationOrder::default(), None).unwrap();
    assert!(chart.accepts(K));
    assert_eq!(g.terminal_categories(classes[0]), chart.top_categories());
  }

  #[test]
  fn test_fills_cells_bottom_up() {
    // meme medaar nasi: N V N
    let g = grammar();
    let chart = Chart::build(&g, &[set(&[N]), set(&[V]), set(&[N])], DerivationOrder::default(), None)
      .unwrap();

    assert_eq!(chart.cell(Span::new(0, 1)), set(&[NP, N]));
    assert_eq!(chart.cell(Span::new(1, 2)), set(&[P]));
    assert_eq!(chart.cell(Span::new(0, 2)), set(&[K]));
    assert_eq!(chart.top_categories(), set(&[K]));
    assert_eq!(
      chart.backpointer(Span::new(0, 3), K),
      Some(Backpointer::Binary {
        rule: RuleId(0),
        split: 1,
        left: NP,
        right: P
      })
    );
    assert!(chart.accepts(K));
    // out of range spans are empty rather than panicking
    assert!(chart.cell(Span::new(2, 2)).is_empty());
    assert_eq!(chart.backpointer(Span::new(0, 4), K), None);
  }

  #[test]
  fn test_every_split_contributes_to_its_cell() {
    let g = grammar();
    let classes = [set(&[N]), set(&[N]), set(&[V]), set(&[Pron]), set(&[N, V])];
    let chart = Chart::build(&g, &classes, DerivationOrder::default(), None).unwrap();

    for span in chart.spans().filter(|s| s.len > 1) {
      let mut from_splits = CategorySet::new();
      for split in 1..span.len {
        let (l, r) = span.split(split);
        for (_, rule) in g.binary_rules() {
          if let Rule::Binary { lhs, left, right } = *rule {
            if chart.cell(l).contains(left) && chart.cell(r).contains(right) {
              from_splits.insert(lhs);
            }
          }
        }
      }
      // nothing found at any split is missing, and nothing appears from nowhere
      assert_eq!(chart.cell(span), from_splits, "span {}", span);
      for c in chart.cell(span).iter() {
        assert!(chart.backpointer(span, c).is_some());
      }
    }
  }

  #[test]
  fn test_cells_only_grow_while_splits_are_tried() {
    let g = grammar();
    let classes = [set(&[N]), set(&[N]), set(&[V]), set(&[Pron]), set(&[N, V])];
    let full = Chart::build(&g, &classes, DerivationOrder::default(), None).unwrap();

    // replay the fill one (split, rule) step at a time
    let n = classes.len();
    let mut partial = Chart::new(n);
    for start in 0..n {
      let span = Span::new(start, 1);
      for c in full.cell(span).iter() {
        partial.add(span, c, Backpointer::Lexical);
      }
    }
    for len in 2..=n {
      for start in 0..=n - len {
        let span = Span::new(start, len);
        for split in 1..len {
          for (id, rule) in g.binary_rules() {
            let before = partial.cell(span);
            partial.combine(span, split, id, rule);
            let after = partial.cell(span);
            assert!(before.is_subset(&after), "span {} shrank at split {}", span, split);
            assert!(after.is_subset(&full.cell(span)), "span {} overshot", span);
          }
        }
      }
    }

    for span in full.spans() {
      assert_eq!(partial.cell(span), full.cell(span), "span {}", span);
    }
  }

  #[test]
  fn test_building_is_deterministic() {
    let g = grammar();
    let classes = [set(&[N]), set(&[V]), set(&[N]), set(&[N, Pron])];
    let a = Chart::build(&g, &classes, DerivationOrder::default(), None).unwrap();
    let b = Chart::build(&g, &classes, DerivationOrder::default(), None).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn test_derivation_order_decides_backpointer() {
    let g: Grammar = r#"
      %start K;
      NP -> N;
      PK -> NP NP;
      K -> PK NP;
      K -> NP PK;
    "#
    .parse()
    .unwrap();
    let classes = [set(&[N]), set(&[N]), set(&[N])];
    let top = Span::new(0, 3);

    let split_major = Chart::build(&g, &classes, DerivationOrder::SplitMajor, None).unwrap();
    assert_eq!(
      split_major.backpointer(top, K),
      Some(Backpointer::Binary {
        rule: RuleId(3),
        split: 1,
        left: NP,
        right: PK
      })
    );

    let rule_major = Chart::build(&g, &classes, DerivationOrder::RuleMajor, None).unwrap();
    assert_eq!(
      rule_major.backpointer(top, K),
      Some(Backpointer::Binary {
        rule: RuleId(2),
        split: 2,
        left: PK,
        right: NP
      })
    );

    // same cells either way, only the kept derivation differs
    for span in split_major.spans() {
      assert_eq!(split_major.cell(span), rule_major.cell(span));
    }
  }

  #[test]
  fn test_expired_deadline_interrupts() {
    let g = grammar();
    let classes = [set(&[N]), set(&[V])];
    let result = Chart::build(&g, &classes, DerivationOrder::default(), Some(Instant::now()));
    assert_eq!(result, Err(Interrupted { completed_len: 1 }));
  }

  #[test]
  fn test_display_lists_backpointers() {
    let g = grammar();
    let chart = Chart::build(&g, &[set(&[N]), set(&[V])], DerivationOrder::default(), None).unwrap();
    let shown = chart.display(&g).to_string();
    assert!(shown.contains("Length 2:"));
    assert!(shown.contains("0..2: {K}"));
    assert!(shown.contains("K: K→NP P split 1"));
    assert!(shown.contains("N: lexical"));
  }
}
