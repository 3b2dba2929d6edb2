use regex::Regex;
// Simple recursive-descent parsing of grammar and lexicon files
use std::str::FromStr;

use crate::category::{Category, CategorySet};
use crate::error::{CykError, Result};
use crate::grammar::Grammar;
use crate::lexicon::Lexicon;
use crate::rules::Rule;

impl FromStr for Grammar {
  type Err = CykError;

  /// Parses a grammar from a string. The start symbol is the one named by a
  /// `%start` directive, or else the first rule's symbol.
  fn from_str(s: &str) -> Result<Self> {
    let ((start, rules), s) = parse_rules(s)?;
    debug_assert!(s.is_empty());

    let start = match (start, rules.first()) {
      (Some(start), _) => start,
      (None, Some(rule)) => rule.lhs(),
      (None, None) => return Err(CykError::InvalidGrammar("empty ruleset".into())),
    };

    Grammar::new(start, rules)
  }
}

impl FromStr for Lexicon {
  type Err = CykError;

  fn from_str(s: &str) -> Result<Self> {
    let (entries, s) = parse_entries(s)?;
    debug_assert!(s.is_empty());

    let mut lexicon = Lexicon::new();
    for (word, classes) in entries {
      lexicon.insert(word, classes)?;
    }
    Ok(lexicon)
  }
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str)>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

fn syntax_error(message: String) -> CykError {
  CykError::Syntax { message }
}

/// Cuts the input down to something readable for error messages
fn context(s: &str) -> &str {
  let line = s.lines().next().unwrap_or("");
  match line.char_indices().nth(40) {
    Some((idx, _)) => &line[..idx],
    None => line,
  }
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 => {
      let (_, rest) = s.split_at(m.end());
      (Some(m.as_str()), rest)
    }
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, what: &str, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(syntax_error(format!("expected {} at '{}'", what, context(s))))
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(syntax_error(format!("expected '{}' at '{}'", c, context(s))))
  }
}

/// Skips any run of whitespace and `//` comments
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"^(\s|//[^\n]*)+");
  optional_re(&*WHITESPACE_OR_COMMENT, s).1
}

/// Category names are capitalized: `K`, `NP`, `Pron`
fn parse_category(s: &str) -> ParseResult<'_, Category> {
  regex_static!(CATEGORY, r"^[A-Z][a-zA-Z0-9_]*");
  let (name, s) = needed_re(&*CATEGORY, "category", s)?;
  Ok((name.parse()?, s))
}

/// Words are lowercase, and may contain digits, hyphens and apostrophes
fn parse_word(s: &str) -> ParseResult<'_, &str> {
  regex_static!(WORD, r"^[\p{Ll}0-9][\p{Ll}0-9'\-]*");
  needed_re(&*WORD, "lowercase word", s)
}

/// Categories up to the terminating `;`
fn parse_category_list(s: &str) -> ParseResult<'_, Vec<Category>> {
  let mut categories = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), s) = optional_char(';', rem) {
      return Ok((categories, s));
    }
    if rem.is_empty() {
      return Err(syntax_error("missing ';' at end of input".into()));
    }
    let (category, s) = parse_category(rem)?;
    categories.push(category);
    rem = s;
  }
}

/// `%start K;`
fn parse_start_directive(s: &str) -> ParseResult<'_, Option<Category>> {
  regex_static!(START, r"^%start\b");
  let (directive, s) = optional_re(&*START, s);
  if directive.is_none() {
    return Ok((None, s));
  }
  let s = skip_whitespace(s);
  let (start, s) = parse_category(s)?;
  let s = skip_whitespace(s);
  let (_, s) = needed_char(';', s)?;
  Ok((Some(start), s))
}

/// Symbol, productions, terminated by `;`
fn parse_rule(s: &str) -> ParseResult<'_, Rule> {
  #![allow(clippy::trivial_regex)]
  regex_static!(ARROW, "^(->|→)");

  let (lhs, s) = parse_category(s)?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&*ARROW, "'->'", s)?;
  let (productions, s) = parse_category_list(s)?;

  Ok((Rule::from_productions(lhs, &productions)?, s))
}

fn parse_rules(s: &str) -> ParseResult<'_, (Option<Category>, Vec<Rule>)> {
  let mut start = None;
  let mut rules = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok(((start, rules), rem));
    }
    let (directive, s) = parse_start_directive(rem)?;
    if let Some(directive) = directive {
      if start.replace(directive).is_some() {
        return Err(syntax_error("more than one %start directive".into()));
      }
      rem = s;
      continue;
    }
    let (rule, s) = parse_rule(rem)?;
    rules.push(rule);
    rem = s;
  }
}

/// `word: Class Class;`
fn parse_entry(s: &str) -> ParseResult<'_, (String, CategorySet)> {
  let (word, s) = parse_word(s)?;
  let s = skip_whitespace(s);
  let (_, s) = needed_char(':', s)?;
  let (classes, s) = parse_category_list(s)?;
  if classes.is_empty() {
    return Err(syntax_error(format!("word '{}' has no classes", word)));
  }
  Ok(((word.to_string(), classes.into_iter().collect()), s))
}

fn parse_entries(s: &str) -> ParseResult<'_, Vec<(String, CategorySet)>> {
  let mut entries = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok((entries, rem));
    }
    let (entry, s) = parse_entry(rem)?;
    entries.push(entry);
    rem = s;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rules::RuleId;
  use Category::*;

  #[test]
  fn test_parse_grammar() {
    let g: Grammar = r#"
      // clause
      K -> NP P;   // subject predicate
      NP -> N;
      P → V;
    "#
    .parse()
    .unwrap();

    assert_eq!(g.start, K);
    assert_eq!(
      g.rules(),
      &[
        Rule::binary(K, NP, P),
        Rule::terminal(NP, N),
        Rule::terminal(P, V)
      ]
    );
  }

  #[test]
  fn test_start_directive() {
    let g: Grammar = "%start K;\nNP -> N;\nK -> NP V;".parse().unwrap();
    assert_eq!(g.start, K);
    assert_eq!(g.rule(RuleId(0)), Some(&Rule::terminal(NP, N)));

    assert!(matches!(
      "%start K; %start NP; K -> N V;".parse::<Grammar>(),
      Err(CykError::Syntax { .. })
    ));
  }

  #[test]
  fn test_three_symbol_rule_is_invalid_grammar() {
    assert!(matches!(
      "K -> N V Adj;".parse::<Grammar>(),
      Err(CykError::InvalidGrammar(_))
    ));
  }

  #[test]
  fn test_grammar_errors() {
    assert!(matches!(
      "K -> N V".parse::<Grammar>(),
      Err(CykError::Syntax { .. })
    ));
    assert!(matches!(
      "K N V;".parse::<Grammar>(),
      Err(CykError::Syntax { .. })
    ));
    assert!(matches!(
      "K -> N M;".parse::<Grammar>(),
      Err(CykError::UnknownCategory(name)) if name == "M"
    ));
    assert!(matches!(
      "// nothing here\n".parse::<Grammar>(),
      Err(CykError::InvalidGrammar(_))
    ));
  }

  #[test]
  fn test_parse_lexicon() {
    let lex: Lexicon = r#"
      cang: Pron;
      lima: Num N;   // five, or hand
      i-meme: N;
    "#
    .parse()
    .unwrap();

    assert_eq!(lex.len(), 3);
    assert_eq!(
      lex.classes("lima"),
      Some([Num, N].into_iter().collect::<CategorySet>())
    );
    assert!(lex.classes("i-meme").is_some());
  }

  #[test]
  fn test_lexicon_errors() {
    assert!(matches!(
      "cang;".parse::<Lexicon>(),
      Err(CykError::Syntax { .. })
    ));
    assert!(matches!(
      "cang: ;".parse::<Lexicon>(),
      Err(CykError::Syntax { .. })
    ));
    assert!(matches!(
      "cang: NP;".parse::<Lexicon>(),
      Err(CykError::InvalidLexicon(_))
    ));
    assert!(matches!(
      "Cang: N;".parse::<Lexicon>(),
      Err(CykError::Syntax { .. })
    ));
  }
}
