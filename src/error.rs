use thiserror::Error;

use crate::category::Category;
use crate::chart::Span;

/// Errors from loading a grammar or lexicon, and from derivation extraction.
///
/// Unknown words, rejected sentences and timeouts are not errors; they are
/// reported through `ParseOutcome`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CykError {
  /// A rule is not in Chomsky Normal Form, or the rule set is unusable.
  #[error("invalid grammar: {0}")]
  InvalidGrammar(String),

  /// A lexicon entry names something other than a word class.
  #[error("invalid lexicon: {0}")]
  InvalidLexicon(String),

  /// Grammar or lexicon source text could not be read.
  #[error("syntax error: {message}")]
  Syntax { message: String },

  #[error("unknown category '{0}'")]
  UnknownCategory(String),

  /// The chart claims a category it has no derivation for. Always a bug in
  /// chart building or extraction.
  #[error("malformed derivation for {category} over {span}: {reason}")]
  MalformedDerivation {
    span: Span,
    category: Category,
    reason: String,
  },
}

pub type Result<T> = std::result::Result<T, CykError>;
