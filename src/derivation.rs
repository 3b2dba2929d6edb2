use tracing::debug;

use crate::category::Category;
use crate::chart::{Backpointer, Chart, Span};
use crate::error::{CykError, Result};
use crate::grammar::Grammar;
use crate::rules::{Rule, RuleId};
use crate::syntree::{Constituent, SynTree, Word};

/// One parse of a sentence: its tree, and the labels of the rules it used
/// in pre-order (`["K→NP P", "NP→N", "P→V"]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
  pub tree: SynTree,
  pub pattern: Vec<String>,
}

impl Derivation {
  /// The pattern as one string, for grouping sentences by structure
  pub fn pattern_string(&self) -> String {
    self.pattern.join(", ")
  }
}

enum Frame {
  /// Build the subtree for this category over this span
  Visit(Span, Category),
  /// Both children are on the output stack; join them
  Join(Span, Category),
}

fn malformed(span: Span, category: Category, reason: impl Into<String>) -> CykError {
  CykError::MalformedDerivation {
    span,
    category,
    reason: reason.into(),
  }
}

/// Rebuilds the kept derivation of `start` over the whole sentence.
///
/// Returns `Ok(None)` if the chart doesn't accept `start`. Any backpointer
/// that doesn't fit the chart is an error rather than a truncated tree.
pub fn extract(
  chart: &Chart,
  grammar: &Grammar,
  words: &[&str],
  start: Category,
) -> Result<Option<Derivation>> {
  if chart.is_empty() || !chart.accepts(start) {
    return Ok(None);
  }
  if words.len() != chart.len() {
    return Err(malformed(
      Span::new(0, chart.len()),
      start,
      format!("chart covers {} words but {} were given", chart.len(), words.len()),
    ));
  }

  let mut pattern = Vec::new();
  let mut built: Vec<SynTree> = Vec::new();
  let mut stack = vec![Frame::Visit(Span::new(0, chart.len()), start)];

  while let Some(frame) = stack.pop() {
    match frame {
      Frame::Visit(span, category) => {
        if !chart.cell(span).contains(category) {
          return Err(malformed(span, category, "category is not in its cell"));
        }
        let bp = chart
          .backpointer(span, category)
          .ok_or_else(|| malformed(span, category, "no backpointer recorded"))?;

        match bp {
          Backpointer::Lexical => {
            if span.len != 1 || !category.is_word_class() {
              return Err(malformed(span, category, "lexical backpointer off a word class"));
            }
            built.push(leaf(words, span, category));
          }
          Backpointer::Terminal { rule } => {
            let r = rule_for(grammar, span, category, rule)?;
            if span.len != 1 || !r.is_terminal() {
              return Err(malformed(span, category, format!("terminal backpointer to {}", r)));
            }
            pattern.push(r.label());
            built.push(leaf(words, span, category));
          }
          Backpointer::Binary {
            rule,
            split,
            left,
            right,
          } => {
            let r = rule_for(grammar, span, category, rule)?;
            if *r != Rule::binary(category, left, right) {
              return Err(malformed(
                span,
                category,
                format!("binary backpointer ({} {}) to {}", left, right, r),
              ));
            }
            if split == 0 || split >= span.len {
              return Err(malformed(span, category, format!("split {} out of range", split)));
            }
            pattern.push(r.label());
            let (l, r) = span.split(split);
            stack.push(Frame::Join(span, category));
            stack.push(Frame::Visit(r, right));
            stack.push(Frame::Visit(l, left));
          }
        }
      }
      Frame::Join(span, category) => {
        let (right, left) = match (built.pop(), built.pop()) {
          (Some(right), Some(left)) => (right, left),
          _ => return Err(malformed(span, category, "missing subtree")),
        };
        built.push(SynTree::Branch(
          Constituent { category, span },
          Box::new(left),
          Box::new(right),
        ));
      }
    }
  }

  let tree = built
    .pop()
    .ok_or_else(|| malformed(Span::new(0, chart.len()), start, "no tree built"))?;
  debug!(rules = pattern.len(), "extracted derivation");

  Ok(Some(Derivation { tree, pattern }))
}

fn rule_for<'g>(
  grammar: &'g Grammar,
  span: Span,
  category: Category,
  id: RuleId,
) -> Result<&'g Rule> {
  let rule = grammar
    .rule(id)
    .ok_or_else(|| malformed(span, category, format!("unknown rule {}", id)))?;
  if rule.lhs() != category {
    return Err(malformed(span, category, format!("rule {} has the wrong head", rule)));
  }
  Ok(rule)
}

fn leaf(words: &[&str], span: Span, category: Category) -> SynTree {
  SynTree::Leaf(Word {
    value: words[span.start].to_string(),
    category,
    span,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::category::CategorySet;
  use crate::chart::DerivationOrder;
  use Category::*;

  fn set(cs: &[Category]) -> CategorySet {
    cs.iter().copied().collect()
  }

  fn grammar() -> Grammar {
    r#"
      K -> NP P;
      K -> NP PK;
      PK -> P Ket;
      NP -> N;
      NP -> Pron;
      NP -> N NP;
      P -> V;
      P -> V NP;
      Ket -> Prep NP;
    "#
    .parse()
    .unwrap()
  }

  fn chart(g: &Grammar, classes: &[CategorySet]) -> Chart {
    Chart::build(g, classes, DerivationOrder::default(), None).unwrap()
  }

  #[test]
  fn test_extracts_tree_and_pattern() {
    let g = grammar();
    // cang mejalan ka peken
    let words = ["cang", "mejalan", "ka", "peken"];
    let c = chart(&g, &[set(&[Pron]), set(&[V]), set(&[Prep]), set(&[N])]);
    let d = extract(&c, &g, &words, K).unwrap().unwrap();

    assert_eq!(
      d.pattern,
      vec!["K→NP PK", "NP→Pron", "PK→P Ket", "P→V", "Ket→Prep NP", "NP→N"]
    );
    assert_eq!(d.tree.words(), words);
    assert_eq!(
      d.tree.to_string(),
      "K\n├── NP → cang\n└── PK\n    ├── P → mejalan\n    └── Ket\n        ├── Prep → ka\n        └── NP → peken\n"
    );
    assert_eq!(
      d.pattern_string(),
      "K→NP PK, NP→Pron, PK→P Ket, P→V, Ket→Prep NP, NP→N"
    );
  }

  #[test]
  fn test_lexical_leaves_add_no_label() {
    let g: Grammar = "K -> N V;".parse().unwrap();
    let c = chart(&g, &[set(&[N]), set(&[V])]);
    let d = extract(&c, &g, &["cang", "mejalan"], K).unwrap().unwrap();
    assert_eq!(d.pattern, vec!["K→N V"]);
    assert_eq!(d.tree.leaves()[0].category, N);
  }

  #[test]
  fn test_no_derivation_is_not_an_error() {
    let g = grammar();
    let c = chart(&g, &[set(&[V]), set(&[Pron])]);
    assert_eq!(extract(&c, &g, &["medaar", "cang"], K).unwrap(), None);

    let empty = chart(&g, &[]);
    assert_eq!(extract(&empty, &g, &[], K).unwrap(), None);
  }

  #[test]
  fn test_leaves_round_trip_for_every_accepted_sentence() {
    let g = grammar();
    let sentences: [(&[&str], Vec<CategorySet>); 3] = [
      (&["meme", "medaar"], vec![set(&[N]), set(&[V])]),
      (
        &["meme", "cang", "meli", "nasi"],
        vec![set(&[N]), set(&[Pron]), set(&[V]), set(&[N])],
      ),
      (
        &["ia", "mejalan", "di", "umah", "meme"],
        vec![set(&[Pron]), set(&[V]), set(&[Prep]), set(&[N]), set(&[N])],
      ),
    ];
    for (words, classes) in sentences {
      let c = chart(&g, &classes);
      let d = extract(&c, &g, words, K).unwrap().unwrap();
      assert_eq!(d.tree.words(), words);
      assert_eq!(d.tree.span(), Span::new(0, words.len()));
    }
  }

  #[test]
  fn test_extraction_is_deterministic() {
    let g = grammar();
    let classes = [set(&[N]), set(&[N]), set(&[V]), set(&[N])];
    let words = ["adi", "meme", "meli", "nasi"];
    let a = extract(&chart(&g, &classes), &g, &words, K).unwrap();
    let b = extract(&chart(&g, &classes), &g, &words, K).unwrap();
    assert!(a.is_some());
    assert_eq!(a, b);
  }

  #[test]
  fn test_missing_backpointer_is_malformed() {
    let g = grammar();
    let words = ["meme", "medaar", "nasi"];
    let mut c = chart(&g, &[set(&[N]), set(&[V]), set(&[N])]);
    c.clear_backpointer(Span::new(1, 2), P);

    match extract(&c, &g, &words, K) {
      Err(CykError::MalformedDerivation { span, category, .. }) => {
        assert_eq!(span, Span::new(1, 2));
        assert_eq!(category, P);
      }
      other => panic!("expected malformed derivation, got {:?}", other),
    }
  }

  #[test]
  fn test_word_count_mismatch_is_malformed() {
    let g = grammar();
    let c = chart(&g, &[set(&[N]), set(&[V])]);
    assert!(matches!(
      extract(&c, &g, &["meme"], K),
      Err(CykError::MalformedDerivation { .. })
    ));
  }

  #[test]
  fn test_derivation_order_changes_tree() {
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
    let words = ["a", "b", "c"];

    let split_major = Chart::build(&g, &classes, DerivationOrder::SplitMajor, None).unwrap();
    let d = extract(&split_major, &g, &words, K).unwrap().unwrap();
    assert_eq!(d.pattern, vec!["K→NP PK", "NP→N", "PK→NP NP", "NP→N", "NP→N"]);

    let rule_major = Chart::build(&g, &classes, DerivationOrder::RuleMajor, None).unwrap();
    let d = extract(&rule_major, &g, &words, K).unwrap().unwrap();
    assert_eq!(d.pattern, vec!["K→PK NP", "PK→NP NP", "NP→N", "NP→N", "NP→N"]);
  }
}
