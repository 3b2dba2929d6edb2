#[macro_use]
extern crate lazy_static;

pub mod builtin;
pub mod category;
pub mod chart;
pub mod derivation;
pub mod error;
pub mod grammar;
pub mod lexicon;
pub mod parse_grammar;
pub mod parser;
pub mod rules;
pub mod syntree;
pub mod utils;

pub use crate::category::{Category, CategorySet};
pub use crate::chart::{Chart, DerivationOrder, Span};
pub use crate::derivation::{extract, Derivation};
pub use crate::error::CykError;
pub use crate::grammar::Grammar;
pub use crate::lexicon::{Lexicon, LexiconCheck};
pub use crate::parser::{ParseOutcome, Parser, ParserConfig};
pub use crate::rules::{Rule, RuleId};
pub use crate::syntree::{format_tree, SynTree};
pub use crate::utils::Err;

impl Grammar {
  /// Parses already-split lowercase words with default settings
  pub fn parse_words(&self, lexicon: &Lexicon, words: &[&str]) -> error::Result<ParseOutcome> {
    Parser::new(self, lexicon).parse(words)
  }
}
