mod dataset;
mod evaluation;
mod report;

use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use seken::utils::{as_strs, words_of};
use seken::{builtin, DerivationOrder, Err, Grammar, Lexicon, ParseOutcome, Parser, ParserConfig};

use crate::evaluation::Evaluation;
use crate::report::{failed_cases_text, label, summary_text, Report};

/// Checks Balinese sentences against a CNF grammar with CYK parsing
#[derive(ClapParser, Debug)]
#[command(name = "seken", version)]
struct Args {
  /// Grammar file (defaults to the built-in grammar)
  #[arg(long, short = 'g', global = true)]
  grammar: Option<PathBuf>,

  /// Lexicon file (defaults to the built-in lexicon)
  #[arg(long, short = 'l', global = true)]
  lexicon: Option<PathBuf>,

  /// Which derivation to keep when a sentence is ambiguous
  #[arg(long, value_enum, default_value_t = Order::Split, global = true)]
  order: Order,

  /// Give up on a sentence after this many milliseconds
  #[arg(long, global = true)]
  timeout_ms: Option<u64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Parse one sentence given as arguments
  Parse {
    #[arg(required = true)]
    words: Vec<String>,

    /// Print the parse chart
    #[arg(long, short = 'c')]
    chart: bool,
  },
  /// Read sentences from stdin, one per line
  Repl {
    /// Print the parse chart
    #[arg(long, short = 'c')]
    chart: bool,
  },
  /// Run a labelled dataset and report accuracy
  Evaluate {
    dataset: PathBuf,

    /// Where to write the JSON report
    #[arg(long, short = 'o', default_value = "evaluation_report.json")]
    report: PathBuf,

    /// Print one line per sentence as well as the summary
    #[arg(long, short = 'v')]
    verbose: bool,
  },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Order {
  /// Leftmost split point wins
  Split,
  /// Earliest declared rule wins
  Rule,
}

impl From<Order> for DerivationOrder {
  fn from(order: Order) -> Self {
    match order {
      Order::Split => DerivationOrder::SplitMajor,
      Order::Rule => DerivationOrder::RuleMajor,
    }
  }
}

fn load(args: &Args) -> Result<(Grammar, Lexicon), Err> {
  let grammar = match &args.grammar {
    Some(path) => Grammar::read_from_file(path)?,
    None => builtin::grammar()?,
  };
  let lexicon = match &args.lexicon {
    Some(path) => Lexicon::read_from_file(path)?,
    None => builtin::lexicon()?,
  };
  tracing::info!(rules = grammar.len(), words = lexicon.len(), start = %grammar.start, "loaded");
  Ok((grammar, lexicon))
}

fn parse(parser: &Parser<'_>, sentence: &str, print_chart: bool) -> Result<(), Err> {
  let words = words_of(sentence);
  let words = as_strs(&words);

  if print_chart {
    if let Some(chart) = parser.chart(&words) {
      println!("chart:\n{}", chart.display(parser.grammar()));
    }
  }

  match parser.parse(&words)? {
    ParseOutcome::UnknownWords(unknown) => {
      println!("{}: unknown words: {}", label(false), unknown.join(", "))
    }
    ParseOutcome::Invalid { top } => {
      println!("{}", label(false));
      println!("top cell: {}", top);
    }
    ParseOutcome::Valid { derivation, top } => {
      println!("{}", label(true));
      println!("top cell: {}", top);
      println!("pattern: {}", derivation.pattern_string());
      print!("{}", derivation.tree);
    }
    ParseOutcome::Timeout { elapsed } => {
      println!("timed out after {:.3}s", elapsed.as_secs_f64())
    }
  }
  println!();

  Ok(())
}

fn repl(parser: &Parser<'_>, print_chart: bool) -> Result<(), Err> {
  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    input.clear();
    if io::stdin().read_line(&mut input)? == 0 {
      // ctrl+d
      return Ok(());
    }
    if input.trim().is_empty() {
      continue;
    }
    // one bad sentence shouldn't end the session
    if let Err(e) = parse(parser, &input, print_chart) {
      eprintln!("error: {}", e);
    }
  }
}

fn evaluate(parser: &Parser<'_>, dataset: &Path, report: &Path, verbose: bool) -> Result<(), Err> {
  let cases = dataset::read_dataset(dataset)?;
  if cases.is_empty() {
    println!("No test cases loaded from {}", dataset.display());
    return Ok(());
  }
  println!("Loaded {} test cases from {}", cases.len(), dataset.display());

  let evaluation = Evaluation::run(parser, &cases);

  if verbose {
    for (idx, case) in evaluation.cases.iter().enumerate() {
      println!(
        "[{}/{}] {} {}: expected {}, actual {}",
        idx + 1,
        evaluation.cases.len(),
        if case.correct { "CORRECT" } else { "INCORRECT" },
        case.sentence,
        label(case.expected),
        label(case.actual)
      );
      if let Some(pattern) = &case.pattern {
        println!("   Pattern: {}", pattern.join(", "));
      }
      if let Some(tree) = &case.tree {
        for line in tree.lines() {
          println!("   {}", line);
        }
      }
    }
  }

  print!("{}", summary_text(&evaluation));
  print!("{}", failed_cases_text(&evaluation));

  Report::new(&evaluation).save(report)?;
  println!("\nReport saved to: {}", report.display());

  Ok(())
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let args = Args::parse();
  let (grammar, lexicon) = load(&args)?;

  let mut config = ParserConfig::new().with_order(args.order.into());
  if let Some(ms) = args.timeout_ms {
    config = config.with_time_budget(Duration::from_millis(ms));
  }
  let parser = Parser::with_config(&grammar, &lexicon, config);

  match &args.command {
    Command::Parse { words, chart } => parse(&parser, &words.join(" "), *chart),
    Command::Repl { chart } => repl(&parser, *chart),
    Command::Evaluate {
      dataset,
      report,
      verbose,
    } => evaluate(&parser, dataset, report, *verbose),
  }
}
