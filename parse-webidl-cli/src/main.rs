use clap::Parser;
use parse_webidl::ast::Program;
use parse_webidl::options::ParserOptions;
use parse_webidl::WebIdlParser;
use serde::Serialize;
use std::fs;
use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(author, version, about = "Parse and validate WebIDL files")]
struct Cli {
  /// WebIDL files, parsed in order and validated together.
  #[arg(required = true)]
  files: Vec<PathBuf>,

  /// Global name used for constructs without [Exposed].
  #[arg(long, default_value = "Window")]
  primary_global: String,

  /// Keep dictionary members in declaration order.
  #[arg(long)]
  unsorted_dictionaries: bool,

  /// Emit tracing spans (JSON) to stderr.
  #[arg(long)]
  trace: bool,

  /// Pretty-print the JSON output.
  #[arg(long)]
  pretty: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
  schema_version: u32,
  options: &'a ParserOptions,
  program: &'a Program,
}

fn init_tracing(enabled: bool) {
  if !enabled {
    return;
  }
  let _ = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(Level::DEBUG)
    .json()
    .with_ansi(false)
    .with_writer(std::io::stderr)
    .try_init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.trace);

  let options = ParserOptions::default()
    .with_primary_global(cli.primary_global.as_str())
    .with_sorted_dictionary_members(!cli.unsorted_dictionaries);
  let mut parser = WebIdlParser::new(options);

  for path in &cli.files {
    let text = match fs::read_to_string(path) {
      Ok(text) => text,
      Err(err) => {
        eprintln!("failed to read {}: {}", path.display(), err);
        return ExitCode::FAILURE;
      }
    };
    let name = path.display().to_string();
    match parser.parse(&text, &name) {
      Ok(defs) => debug!(file = name.as_str(), definitions = defs.len(), "parsed"),
      Err(err) => {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
      }
    };
  }

  if let Err(err) = parser.finish() {
    eprintln!("{}", err);
    return ExitCode::FAILURE;
  };

  let program = parser.program();
  let output = JsonOutput {
    schema_version: 1,
    options: program.options(),
    program,
  };
  let written = if cli.pretty {
    serde_json::to_writer_pretty(stdout(), &output)
  } else {
    serde_json::to_writer(stdout(), &output)
  };
  if let Err(err) = written {
    eprintln!("failed to write output: {}", err);
    return ExitCode::FAILURE;
  };
  println!();
  ExitCode::SUCCESS
}
