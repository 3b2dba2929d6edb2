use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use seken::Err;

use crate::evaluation::{CaseResult, CategoryStats, ConfusionMatrix, Evaluation, Summary};

const RULE: &str = "======================================================================";

#[derive(Debug, Serialize)]
pub struct Report<'a> {
  pub timestamp: String,
  pub summary: Summary,
  pub confusion_matrix: ConfusionMatrix,
  pub category_stats: &'a BTreeMap<String, CategoryStats>,
  pub test_cases: &'a [CaseResult],
}

impl<'a> Report<'a> {
  pub fn new(evaluation: &'a Evaluation) -> Self {
    Self {
      timestamp: chrono::Local::now().to_rfc3339(),
      summary: evaluation.summary(),
      confusion_matrix: evaluation.confusion,
      category_stats: &evaluation.categories,
      test_cases: &evaluation.cases,
    }
  }

  pub fn to_json(&self) -> Result<String, Err> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Err> {
    fs::write(path, self.to_json()?)?;
    Ok(())
  }
}

/// Renders the console summary: totals, confusion matrix, rates and the
/// per-category breakdown.
pub fn summary_text(evaluation: &Evaluation) -> String {
  let s = evaluation.summary();
  let m = evaluation.confusion;
  let mut out = String::new();

  out.push_str(&format!("\n{}\nEVALUATION SUMMARY\n{}\n", RULE, RULE));
  out.push_str("\nOverall Statistics:\n");
  out.push_str(&format!("Total Tests: {}\n", s.total_tests));
  out.push_str(&format!(
    "Passed: {} ({:.1}%)\n",
    s.passed,
    share(s.passed, s.total_tests)
  ));
  out.push_str(&format!(
    "Failed: {} ({:.1}%)\n",
    s.failed,
    share(s.failed, s.total_tests)
  ));
  out.push_str(&format!("Accuracy: {:.2}%\n", s.accuracy));

  out.push_str("\nConfusion Matrix:\n");
  out.push_str("┌─────────────────────┬──────────────────────┐\n");
  out.push_str("│                     │      Predicted       │\n");
  out.push_str("│       Actual        ├──────────┬───────────┤\n");
  out.push_str("│                     │  Valid   │  Invalid  │\n");
  out.push_str("├─────────────────────┼──────────┼───────────┤\n");
  out.push_str(&format!(
    "│      Valid          │   {:3}    │    {:3}    │\n",
    m.true_positive, m.false_negative
  ));
  out.push_str(&format!(
    "│     Invalid         │   {:3}    │    {:3}    │\n",
    m.false_positive, m.true_negative
  ));
  out.push_str("└─────────────────────┴──────────┴───────────┘\n");

  out.push_str("\nClassification Metrics:\n");
  out.push_str(&format!("Precision: {:.2}%\n", s.precision));
  out.push_str(&format!("Recall:    {:.2}%\n", s.recall));
  out.push_str(&format!("F1 Score:  {:.2}%\n", s.f1_score));

  out.push_str("\nPerformance Metrics:\n");
  out.push_str(&format!(
    "Average Parse Time: {:.2}ms\n",
    s.avg_parse_time * 1000.0
  ));

  if !evaluation.categories.is_empty() {
    out.push_str("\nCategory Breakdown:\n");
    out.push_str(&format!(
      "{:<45} {:>6} {:>6} {:>6} {:>6}\n",
      "Category", "Total", "Pass", "Fail", "Acc%"
    ));
    out.push_str(&format!("{}\n", "-".repeat(RULE.len())));
    for (category, stats) in evaluation.categories.iter() {
      let name = category.chars().take(44).collect::<String>();
      out.push_str(&format!(
        "{:<45} {:>6} {:>6} {:>6} {:>5.1}%\n",
        name,
        stats.total,
        stats.passed,
        stats.failed,
        stats.accuracy()
      ));
    }
  }

  out.push_str(&format!("\n{}\n", RULE));
  out
}

pub fn failed_cases_text(evaluation: &Evaluation) -> String {
  let failed = evaluation.failed_cases().collect::<Vec<_>>();
  if failed.is_empty() {
    return "\nAll test cases passed!\n".to_string();
  }

  let mut out = format!("\nFailed Test Cases ({} cases):\n{}\n", failed.len(), RULE);
  for (idx, case) in failed.iter().enumerate() {
    out.push_str(&format!("\n{}. {}\n", idx + 1, case.sentence));
    out.push_str(&format!("   Expected: {}\n", label(case.expected)));
    out.push_str(&format!("   Actual:   {}\n", label(case.actual)));
    out.push_str(&format!("   Category: {}\n", case.category));
    if let Some(top) = &case.top {
      out.push_str(&format!("   Top cell: {}\n", top));
    }
    if let Some(error) = &case.error {
      out.push_str(&format!("   Error: {}\n", error));
    }
  }
  out
}

pub fn label(valid: bool) -> &'static str {
  if valid { "VALID" } else { "INVALID" }
}

fn share(part: usize, whole: usize) -> f64 {
  if whole == 0 {
    0.0
  } else {
    part as f64 / whole as f64 * 100.0
  }
}
