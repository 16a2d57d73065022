use crate::ast::DefId;
use crate::ast::Identifier;
use crate::ast::Program;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::error::WebIdlError;
use crate::lex::lex_next;
use crate::lex::Lexer;
use crate::lex::KEYWORDS_MAPPING;
use crate::loc::Loc;
use crate::loc::Location;
use crate::loc::SourceFile;
use crate::scope::identifier_from_source;
use crate::token::Token;
use crate::token::TT;
use std::sync::Arc;
use tracing::debug_span;

pub mod definition;
pub mod ext_attr;
pub mod member;
#[cfg(test)]
mod tests;
pub mod types;
pub mod value;

#[derive(Debug)]
#[must_use]
pub struct MaybeToken {
  loc: Loc,
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }

  pub fn match_loc(&self) -> Option<Loc> {
    if self.matched {
      Some(self.loc)
    } else {
      None
    }
  }
}

pub struct ParserCheckpoint {
  next_tok_i: usize,
}

/// A recursive descent parser for one source file. Definitions are added straight into the
/// program, with names bound as each construct is reduced.
pub struct Parser<'a> {
  lexer: Lexer<'a>,
  buf: Vec<Token>,
  next_tok_i: usize,
  file: Arc<SourceFile>,
  program: &'a mut Program,
}

// Parsing methods live in the submodules as further `impl Parser` blocks, grouped by the part of
// the grammar they handle.
impl<'a> Parser<'a> {
  pub fn new(source: &'a str, file: Arc<SourceFile>, program: &'a mut Program) -> Parser<'a> {
    Parser {
      lexer: Lexer::new(source),
      buf: Vec::new(),
      next_tok_i: 0,
      file,
      program,
    }
  }

  pub fn location(&self, loc: Loc) -> Location {
    Location::new(self.file.clone(), loc)
  }

  pub fn str(&self, loc: Loc) -> &str {
    &self.lexer[loc]
  }

  pub fn string(&self, loc: Loc) -> String {
    self.str(loc).to_string()
  }

  pub fn checkpoint(&self) -> ParserCheckpoint {
    ParserCheckpoint {
      next_tok_i: self.next_tok_i,
    }
  }

  pub fn restore_checkpoint(&mut self, checkpoint: ParserCheckpoint) {
    self.next_tok_i = checkpoint.next_tok_i;
  }

  fn forward<K: FnOnce(&Token) -> bool>(&mut self, keep: K) -> (bool, Token) {
    if self.buf.len() == self.next_tok_i {
      let token = lex_next(&mut self.lexer);
      self.buf.push(token);
    }
    let t = self.buf[self.next_tok_i];
    let k = keep(&t);
    if k {
      self.next_tok_i += 1;
    };
    (k, t)
  }

  pub fn consume(&mut self) -> Token {
    self.forward(|_| true).1
  }

  pub fn peek(&mut self) -> Token {
    self.forward(|_| false).1
  }

  pub fn peek_2(&mut self) -> (Token, Token) {
    let cp = self.checkpoint();
    let a = self.forward(|_| true);
    let b = self.forward(|_| true);
    self.restore_checkpoint(cp);
    (a.1, b.1)
  }

  pub fn consume_if(&mut self, typ: TT) -> MaybeToken {
    let (matched, t) = self.forward(|t| t.typ == typ);
    MaybeToken {
      matched,
      loc: t.loc,
    }
  }

  pub fn consume_if_pred<F: FnOnce(&Token) -> bool>(&mut self, pred: F) -> MaybeToken {
    let (matched, t) = self.forward(pred);
    MaybeToken {
      matched,
      loc: t.loc,
    }
  }

  /// The syntax error for a token that the grammar did not expect.
  pub fn unexpected(&self, t: Token, kind: ErrorKind) -> WebIdlError {
    let kind = t.unexpected(kind);
    let message = kind.syntax_message(Some(t.typ));
    WebIdlError::new(kind, message, vec![self.location(t.loc)])
  }

  pub fn require(&mut self, typ: TT) -> IdlResult<Token> {
    let t = self.consume();
    if t.typ != typ {
      Err(self.unexpected(t, ErrorKind::RequiredTokenNotFound(typ)))
    } else {
      Ok(t)
    }
  }

  pub fn require_predicate<P: FnOnce(TT) -> bool>(
    &mut self,
    pred: P,
    expected: &'static str,
  ) -> IdlResult<Token> {
    let t = self.consume();
    if !pred(t.typ) {
      Err(self.unexpected(t, ErrorKind::ExpectedSyntax(expected)))
    } else {
      Ok(t)
    }
  }

  /// Requires a plain identifier token and applies the identifier naming rules.
  pub fn require_identifier(&mut self) -> IdlResult<Identifier> {
    let t = self.require(TT::Identifier)?;
    identifier_from_source(self.str(t.loc), self.location(t.loc))
  }

  /// Requires an identifier, also accepting the keywords `pred` allows in this position.
  pub fn require_name<P: Fn(TT) -> bool>(&mut self, pred: P, expected: &'static str) -> IdlResult<Identifier> {
    let t = self.require_predicate(|typ| typ == TT::Identifier || pred(typ), expected)?;
    identifier_from_source(self.str(t.loc), self.location(t.loc))
  }

  pub fn is_keyword(typ: TT) -> bool {
    KEYWORDS_MAPPING.contains_key(&typ)
  }

  /// Parses every definition in the file, returning the definitions this file created.
  pub fn parse_file(&mut self) -> IdlResult<Vec<DefId>> {
    let _span = debug_span!(
      "parse_file",
      file = self.file.name.as_str(),
      bytes = self.file.text.len()
    )
    .entered();
    let mut created = Vec::new();
    while self.peek().typ != TT::EOF {
      if let Some(id) = self.parse_definition()? {
        created.push(id);
      };
    }
    tracing::debug!(definitions = created.len(), "parsed file");
    Ok(created)
  }
}
