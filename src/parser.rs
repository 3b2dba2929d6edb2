use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::category::CategorySet;
use crate::chart::{Chart, DerivationOrder};
use crate::derivation::{extract, Derivation};
use crate::error::Result;
use crate::grammar::Grammar;
use crate::lexicon::{Lexicon, LexiconCheck};

/// Per-parse settings
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
  pub order: DerivationOrder,
  /// Wall-clock budget for building one chart. `None` means no limit.
  pub time_budget: Option<Duration>,
}

impl ParserConfig {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn with_order(mut self, order: DerivationOrder) -> Self {
    self.order = order;
    self
  }

  pub fn with_time_budget(mut self, budget: Duration) -> Self {
    self.time_budget = Some(budget);
    self
  }
}

/// What happened to one sentence. None of these are errors: a caller
/// running a batch can tell bad vocabulary, bad syntax and a slow parse
/// apart without special-casing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
  /// Some words aren't in the lexicon, so no chart was built
  UnknownWords(Vec<String>),
  /// The start symbol doesn't cover the sentence. `top` is what does.
  Invalid { top: CategorySet },
  Valid {
    derivation: Derivation,
    top: CategorySet,
  },
  /// The time budget ran out before the chart was complete
  Timeout { elapsed: Duration },
}

impl ParseOutcome {
  pub fn is_valid(&self) -> bool {
    matches!(self, Self::Valid { .. })
  }

  pub fn derivation(&self) -> Option<&Derivation> {
    match self {
      Self::Valid { derivation, .. } => Some(derivation),
      _ => None,
    }
  }

  /// Categories covering the whole sentence, if a chart was completed
  pub fn top_categories(&self) -> Option<CategorySet> {
    match self {
      Self::Valid { top, .. } | Self::Invalid { top } => Some(*top),
      _ => None,
    }
  }
}

/// Runs sentences through lexicon check, chart building and extraction.
/// Only borrows its grammar and lexicon, so one parser can be shared across
/// threads.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'g> {
  grammar: &'g Grammar,
  lexicon: &'g Lexicon,
  config: ParserConfig,
}

impl<'g> Parser<'g> {
  pub fn new(grammar: &'g Grammar, lexicon: &'g Lexicon) -> Self {
    Self::with_config(grammar, lexicon, ParserConfig::default())
  }

  pub fn with_config(grammar: &'g Grammar, lexicon: &'g Lexicon, config: ParserConfig) -> Self {
    Self {
      grammar,
      lexicon,
      config,
    }
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.grammar
  }

  pub fn lexicon(&self) -> &'g Lexicon {
    self.lexicon
  }

  pub fn config(&self) -> &ParserConfig {
    &self.config
  }

  pub fn check(&self, words: &[&str]) -> LexiconCheck {
    self.lexicon.check(words)
  }

  /// Builds the full chart without a time budget, for inspection. None if
  /// any word is unknown.
  pub fn chart(&self, words: &[&str]) -> Option<Chart> {
    let classes = self.lexicon.lookup_all(words)?;
    Chart::build(self.grammar, &classes, self.config.order, None).ok()
  }

  /// Parses one sentence of lowercase words. Errors only if the chart and
  /// its backpointers disagree, which is a bug.
  pub fn parse(&self, words: &[&str]) -> Result<ParseOutcome> {
    let started = Instant::now();

    let check = self.check(words);
    if !check.all_known {
      debug!(unknown = ?check.unknown_words, "skipping parse");
      return Ok(ParseOutcome::UnknownWords(check.unknown_words));
    }
    let classes = match self.lexicon.lookup_all(words) {
      Some(classes) => classes,
      None => return Ok(ParseOutcome::UnknownWords(check.unknown_words)),
    };

    let deadline = self.config.time_budget.map(|budget| started + budget);
    let chart = match Chart::build(self.grammar, &classes, self.config.order, deadline) {
      Ok(chart) => chart,
      Err(interrupted) => {
        let elapsed = started.elapsed();
        warn!(
          words = words.len(),
          completed_len = interrupted.completed_len,
          ?elapsed,
          "parse timed out"
        );
        return Ok(ParseOutcome::Timeout { elapsed });
      }
    };

    let top = chart.top_categories();
    let outcome = match extract(&chart, self.grammar, words, self.grammar.start)? {
      Some(derivation) => ParseOutcome::Valid { derivation, top },
      None => ParseOutcome::Invalid { top },
    };
    debug!(words = words.len(), valid = outcome.is_valid(), %top, "parsed");

    Ok(outcome)
  }

  /// Parses pre-split sentences in parallel. Results come back in input
  /// order, one per sentence, so a failure in one doesn't affect the rest.
  pub fn parse_batch<S>(&self, sentences: &[Vec<S>]) -> Vec<Result<ParseOutcome>>
  where
    S: AsRef<str> + Sync,
  {
    sentences
      .par_iter()
      .map(|sentence| {
        let words = sentence.iter().map(|w| w.as_ref()).collect::<Vec<_>>();
        self.parse(&words)
      })
      .collect()
  }
}
