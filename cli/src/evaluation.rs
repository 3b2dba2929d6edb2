use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info};

use seken::utils::{as_strs, words_of};
use seken::{ParseOutcome, Parser};

use crate::dataset::TestCase;

/// How one labelled sentence fared
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
  pub sentence: String,
  pub expected: bool,
  pub actual: bool,
  pub correct: bool,
  /// Seconds
  pub parse_time: f64,
  pub category: String,
  pub pattern: Option<Vec<String>>,
  #[serde(skip)]
  pub tree: Option<String>,
  #[serde(skip)]
  pub top: Option<String>,
  pub error: Option<String>,
}

impl CaseResult {
  /// Scores an outcome against its expected label. Anything other than a
  /// valid parse counts as "invalid".
  pub fn new(case: &TestCase, outcome: &Result<ParseOutcome, seken::CykError>, parse_time: f64) -> Self {
    let (actual, pattern, tree, top, error) = match outcome {
      Ok(ParseOutcome::Valid { derivation, top }) => (
        true,
        Some(derivation.pattern.clone()),
        Some(derivation.tree.to_string()),
        Some(top.to_string()),
        None,
      ),
      Ok(ParseOutcome::Invalid { top }) => (false, None, None, Some(top.to_string()), None),
      Ok(ParseOutcome::UnknownWords(words)) => (
        false,
        None,
        None,
        None,
        Some(format!("Unknown words: {}", words.join(", "))),
      ),
      Ok(ParseOutcome::Timeout { elapsed }) => (
        false,
        None,
        None,
        None,
        Some(format!("timed out after {:.3}s", elapsed.as_secs_f64())),
      ),
      Err(e) => (false, None, None, None, Some(e.to_string())),
    };

    Self {
      sentence: case.sentence.clone(),
      expected: case.expected,
      actual,
      correct: actual == case.expected,
      parse_time,
      category: case.category.clone(),
      pattern,
      tree,
      top,
      error,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
  pub true_positive: usize,
  pub true_negative: usize,
  pub false_positive: usize,
  pub false_negative: usize,
}

impl ConfusionMatrix {
  fn record(&mut self, expected: bool, actual: bool) {
    match (expected, actual) {
      (true, true) => self.true_positive += 1,
      (false, false) => self.true_negative += 1,
      (false, true) => self.false_positive += 1,
      (true, false) => self.false_negative += 1,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
  pub total: usize,
  pub passed: usize,
  pub failed: usize,
}

impl CategoryStats {
  pub fn accuracy(&self) -> f64 {
    percent(self.passed, self.total)
  }
}

/// Headline numbers; rates are percentages
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
  pub total_tests: usize,
  pub passed: usize,
  pub failed: usize,
  pub accuracy: f64,
  pub precision: f64,
  pub recall: f64,
  pub f1_score: f64,
  /// Seconds
  pub avg_parse_time: f64,
}

fn percent(part: usize, whole: usize) -> f64 {
  if whole == 0 {
    0.0
  } else {
    part as f64 / whole as f64 * 100.0
  }
}

#[derive(Debug, Clone, Default)]
pub struct Evaluation {
  pub cases: Vec<CaseResult>,
  pub confusion: ConfusionMatrix,
  pub categories: BTreeMap<String, CategoryStats>,
}

impl Evaluation {
  pub fn new() -> Self {
    Default::default()
  }

  /// Parses every case in parallel and records the results in dataset order.
  /// A case whose parse fails outright is recorded as a failure; the rest of
  /// the run carries on.
  pub fn run(parser: &Parser<'_>, cases: &[TestCase]) -> Self {
    info!(cases = cases.len(), "evaluating");

    let results = cases
      .par_iter()
      .map(|case| {
        let started = Instant::now();
        let words = words_of(&case.sentence);
        let outcome = parser.parse(&as_strs(&words));
        let parse_time = started.elapsed().as_secs_f64();
        if let Err(e) = &outcome {
          error!(sentence = %case.sentence, %e, "parse failed");
        }
        CaseResult::new(case, &outcome, parse_time)
      })
      .collect::<Vec<_>>();

    let mut evaluation = Self::new();
    for result in results {
      evaluation.record(result);
    }
    evaluation
  }

  pub fn record(&mut self, result: CaseResult) {
    self.confusion.record(result.expected, result.actual);

    let stats = self.categories.entry(result.category.clone()).or_default();
    stats.total += 1;
    if result.correct {
      stats.passed += 1;
    } else {
      stats.failed += 1;
    }

    self.cases.push(result);
  }

  pub fn failed_cases(&self) -> impl Iterator<Item = &CaseResult> + '_ {
    self.cases.iter().filter(|c| !c.correct)
  }

  pub fn summary(&self) -> Summary {
    let total = self.cases.len();
    let passed = self.cases.iter().filter(|c| c.correct).count();
    let ConfusionMatrix {
      true_positive: tp,
      false_positive: fp,
      false_negative: fn_,
      ..
    } = self.confusion;

    let precision = percent(tp, tp + fp);
    let recall = percent(tp, tp + fn_);
    let f1_score = if precision + recall > 0.0 {
      2.0 * precision * recall / (precision + recall)
    } else {
      0.0
    };
    let total_time: f64 = self.cases.iter().map(|c| c.parse_time).sum();

    Summary {
      total_tests: total,
      passed,
      failed: total - passed,
      accuracy: percent(passed, total),
      precision,
      recall,
      f1_score,
      avg_parse_time: if total == 0 { 0.0 } else { total_time / total as f64 },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dataset::parse_dataset;
  use seken::{Category, CykError, Span};

  fn result(expected: bool, actual: bool, category: &str) -> CaseResult {
    CaseResult {
      sentence: String::new(),
      expected,
      actual,
      correct: expected == actual,
      parse_time: 0.5,
      category: category.into(),
      pattern: None,
      tree: None,
      top: None,
      error: None,
    }
  }

  #[test]
  fn test_summary_metrics() {
    let mut e = Evaluation::new();
    e.record(result(true, true, "a"));
    e.record(result(true, true, "a"));
    e.record(result(true, false, "b"));
    e.record(result(false, true, "b"));
    e.record(result(false, false, "b"));

    assert_eq!(
      e.confusion,
      ConfusionMatrix {
        true_positive: 2,
        true_negative: 1,
        false_positive: 1,
        false_negative: 1,
      }
    );

    let s = e.summary();
    assert_eq!(s.total_tests, 5);
    assert_eq!(s.passed, 3);
    assert_eq!(s.failed, 2);
    assert!((s.accuracy - 60.0).abs() < 1e-9);
    assert!((s.precision - 200.0 / 3.0).abs() < 1e-9);
    assert!((s.recall - 200.0 / 3.0).abs() < 1e-9);
    assert!((s.f1_score - 200.0 / 3.0).abs() < 1e-9);
    assert!((s.avg_parse_time - 0.5).abs() < 1e-9);

    assert_eq!(
      e.categories["b"],
      CategoryStats {
        total: 3,
        passed: 1,
        failed: 2
      }
    );
    assert_eq!(e.failed_cases().count(), 2);
  }

  #[test]
  fn test_broken_derivation_is_recorded_as_a_failed_case() {
    let case = TestCase {
      sentence: "cang mejalan".into(),
      expected: true,
      category: "General".into(),
    };
    let err = CykError::MalformedDerivation {
      span: Span::new(0, 2),
      category: Category::K,
      reason: "no backpointer recorded".into(),
    };
    let result = CaseResult::new(&case, &Err(err.clone()), 0.25);

    assert!(!result.actual);
    assert!(!result.correct);
    assert_eq!(result.error, Some(err.to_string()));
    assert!(result.error.as_deref().unwrap().contains("no backpointer recorded"));
    assert_eq!(result.pattern, None);
    assert_eq!(result.top, None);

    let mut e = Evaluation::new();
    e.record(result);
    assert_eq!(e.confusion.false_negative, 1);
    assert_eq!(e.failed_cases().count(), 1);
  }

  #[test]
  fn test_empty_summary_is_all_zero() {
    let s = Evaluation::new().summary();
    assert_eq!(s, Summary::default());
  }

  #[test]
  fn test_run_against_builtin_grammar() {
    let g = seken::builtin::grammar().unwrap();
    let lex = seken::builtin::lexicon().unwrap();
    let parser = Parser::new(&g, &lex);
    let cases = parse_dataset(
      r#"
      # Predikat verba
      VALID|Cang mejalan
      INVALID|mejalan cang
      # Predikat frasa preposisi
      VALID|meme di peken
      VALID|meme di amerika
      "#,
    );

    let e = Evaluation::run(&parser, &cases);
    let correct = e.cases.iter().map(|c| c.correct).collect::<Vec<_>>();
    assert_eq!(correct, vec![true, true, true, false]);
    assert_eq!(e.cases[3].error.as_deref(), Some("Unknown words: amerika"));
    assert_eq!(
      e.cases[2].pattern.as_deref(),
      Some(&["K→NP P", "NP→N", "P→Prep NP", "NP→N"].map(String::from)[..])
    );
    assert_eq!(e.categories.len(), 2);
    assert_eq!(e.confusion.false_negative, 1);
  }
}
