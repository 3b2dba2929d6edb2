//! The bundled Balinese grammar and lexicon.

use crate::error::Result;
use crate::grammar::Grammar;
use crate::lexicon::Lexicon;

pub const GRAMMAR_SRC: &str = include_str!("../grammars/bali.cnf");
pub const LEXICON_SRC: &str = include_str!("../grammars/bali.lex");

pub fn grammar() -> Result<Grammar> {
  GRAMMAR_SRC.parse()
}

pub fn lexicon() -> Result<Lexicon> {
  LEXICON_SRC.parse()
}
