use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + Send + Sync + 'static>;

/// Lowercases a sentence and splits it on whitespace.
///
/// ```
/// assert_eq!(seken::utils::words_of("Cang  mejalan\tKA peken"), vec![
///   "cang", "mejalan", "ka", "peken",
/// ]);
/// ```
pub fn words_of(sentence: &str) -> Vec<String> {
  sentence
    .split_whitespace()
    .map(|w| w.to_lowercase())
    .collect()
}

/// Borrows each word of an owned sentence
pub fn as_strs(words: &[String]) -> Vec<&str> {
  words.iter().map(|w| w.as_str()).collect()
}
