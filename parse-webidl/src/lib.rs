use ast::DefId;
use ast::Program;
use error::ErrorKind;
use error::IdlResult;
use error::WebIdlError;
use loc::SourceFile;
use options::ParserOptions;
use parse::Parser;

pub mod ast;
pub mod builtins;
pub mod error;
pub mod ext_attr;
pub mod finish;
pub mod lex;
pub mod loc;
pub mod num;
pub mod options;
pub mod parse;
pub mod scope;
pub mod token;
pub mod types;
pub mod validate;

/// Accumulates definitions over any number of source files, then resolves and validates them
/// together.
#[derive(Debug)]
pub struct WebIdlParser {
  program: Program,
  finished: bool,
}

impl Default for WebIdlParser {
  fn default() -> Self {
    WebIdlParser::new(ParserOptions::default())
  }
}

impl WebIdlParser {
  pub fn new(options: ParserOptions) -> WebIdlParser {
    WebIdlParser {
      program: Program::new(options),
      finished: false,
    }
  }

  /// Parses one file, returning the definitions it introduced. Partial declarations of an
  /// existing definition introduce nothing.
  pub fn parse(&mut self, text: &str, filename: &str) -> IdlResult<Vec<DefId>> {
    if self.finished {
      return Err(WebIdlError::new(
        ErrorKind::AlreadyFinished,
        format!("Cannot parse '{}' after finish()", filename),
        Vec::new(),
      ));
    };
    let file = SourceFile::new(filename, text);
    Parser::new(text, file, &mut self.program).parse_file()
  }

  /// Resolves and validates everything parsed so far. Calling it again returns the same
  /// definitions without changing anything.
  pub fn finish(&mut self) -> IdlResult<Vec<DefId>> {
    self.finished = true;
    self.program.finish()
  }

  pub fn program(&self) -> &Program {
    &self.program
  }

  /// Discards everything parsed, keeping the options.
  pub fn reset(&mut self) {
    *self = WebIdlParser::new(self.program.options().clone());
  }
}
