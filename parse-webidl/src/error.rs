use crate::loc::Location;
use crate::token::TT;

/// A stable classification of every error the front end can raise.
///
/// Diagnostic codes are assigned per variant and are stable. Syntax errors use the `WI0` prefix
/// and are raised while parsing; semantic errors use the `WI1` prefix and are raised by
/// [`finish`](crate::WebIdlParser::finish).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ErrorKind {
  ExpectedSyntax(&'static str),
  RequiredTokenNotFound(TT),
  UnexpectedEnd,
  UnrecognizedInput,
  UnterminatedComment,
  UnterminatedString,
  MalformedNumber,
  NumberOutOfRange,

  DuplicateIdentifier,
  ReservedIdentifier,
  UnresolvedIdentifier,
  InvalidInheritance,
  InheritanceCycle,
  MissingNonPartial,
  InvalidExtendedAttribute,
  InvalidType,
  IndistinguishableUnion,
  IndistinguishableOverloads,
  SelfContainingDictionary,
  ExposureViolation,
  InvalidMember,
  InvalidValue,
  InvalidSignature,
  InvalidIterable,
  InvalidGlobal,
  AlreadyFinished,
}

impl ErrorKind {
  pub fn code(&self) -> &'static str {
    match self {
      ErrorKind::ExpectedSyntax(_) => "WI0001",
      ErrorKind::RequiredTokenNotFound(_) => "WI0002",
      ErrorKind::UnexpectedEnd => "WI0003",
      ErrorKind::UnrecognizedInput => "WI0004",
      ErrorKind::UnterminatedComment => "WI0005",
      ErrorKind::UnterminatedString => "WI0006",
      ErrorKind::MalformedNumber => "WI0007",
      ErrorKind::NumberOutOfRange => "WI0008",
      ErrorKind::DuplicateIdentifier => "WI1001",
      ErrorKind::ReservedIdentifier => "WI1002",
      ErrorKind::UnresolvedIdentifier => "WI1003",
      ErrorKind::InvalidInheritance => "WI1004",
      ErrorKind::InheritanceCycle => "WI1005",
      ErrorKind::MissingNonPartial => "WI1006",
      ErrorKind::InvalidExtendedAttribute => "WI1007",
      ErrorKind::InvalidType => "WI1008",
      ErrorKind::IndistinguishableUnion => "WI1009",
      ErrorKind::IndistinguishableOverloads => "WI1010",
      ErrorKind::SelfContainingDictionary => "WI1011",
      ErrorKind::ExposureViolation => "WI1012",
      ErrorKind::InvalidMember => "WI1013",
      ErrorKind::InvalidValue => "WI1014",
      ErrorKind::InvalidSignature => "WI1015",
      ErrorKind::InvalidIterable => "WI1016",
      ErrorKind::InvalidGlobal => "WI1017",
      ErrorKind::AlreadyFinished => "WI1018",
    }
  }

  pub fn is_syntax(&self) -> bool {
    self.code().starts_with("WI0")
  }

  /// Default message for syntax errors raised at a token.
  pub fn syntax_message(&self, actual: Option<TT>) -> String {
    match self {
      ErrorKind::ExpectedSyntax(expected) => match actual {
        Some(tok) => format!("expected {} but found {:?}", expected, tok),
        None => format!("expected {}", expected),
      },
      ErrorKind::RequiredTokenNotFound(token) => match actual {
        Some(tok) => format!("expected token {:?} but found {:?}", token, tok),
        None => format!("expected token {:?}", token),
      },
      ErrorKind::UnexpectedEnd => "unexpected end of file".into(),
      ErrorKind::UnrecognizedInput => "unrecognized input".into(),
      ErrorKind::UnterminatedComment => "unterminated comment".into(),
      ErrorKind::UnterminatedString => "unterminated string literal".into(),
      ErrorKind::MalformedNumber => "malformed number literal".into(),
      ErrorKind::NumberOutOfRange => "numeric literal out of range".into(),
      other => format!("{:?}", other),
    }
  }
}

/// The single structured error raised by every stage.
///
/// Locations are ordered from the most specific offending site outward.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{}: {}{}", severity(.warning), .message, render_locations(.locations))]
pub struct WebIdlError {
  pub kind: ErrorKind,
  pub message: String,
  pub warning: bool,
  pub locations: Vec<Location>,
}

fn severity(warning: &bool) -> &'static str {
  if *warning {
    "warning"
  } else {
    "error"
  }
}

fn render_locations(locations: &[Location]) -> String {
  if locations.is_empty() {
    return String::new();
  }
  let rendered: Vec<String> = locations.iter().map(|l| l.to_string()).collect();
  format!(", {}", rendered.join("\n"))
}

impl WebIdlError {
  pub fn new(kind: ErrorKind, message: impl Into<String>, locations: Vec<Location>) -> WebIdlError {
    WebIdlError {
      kind,
      message: message.into(),
      warning: false,
      locations,
    }
  }

  pub fn warning(kind: ErrorKind, message: impl Into<String>, locations: Vec<Location>) -> WebIdlError {
    WebIdlError {
      warning: true,
      ..WebIdlError::new(kind, message, locations)
    }
  }

  pub fn with_location(mut self, location: &Location) -> WebIdlError {
    self.locations.push(location.clone());
    self
  }

  pub fn code(&self) -> &'static str {
    self.kind.code()
  }
}

pub type IdlResult<T> = Result<T, WebIdlError>;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::loc::Loc;
  use crate::loc::SourceFile;

  #[test]
  fn display_without_locations_has_no_separator() {
    let err = WebIdlError::new(ErrorKind::MissingNonPartial, "no declaration", Vec::new());
    assert_eq!(err.to_string(), "error: no declaration");
  }

  #[test]
  fn display_joins_locations_with_newlines() {
    let file = SourceFile::new("x.webidl", "enum E { \"a\", \"a\" };");
    let a = Location::new(file.clone(), Loc(9, 12));
    let b = Location::new(file, Loc(14, 17));
    let err = WebIdlError::new(ErrorKind::DuplicateIdentifier, "dup", vec![a, b]);
    assert_eq!(
      err.to_string(),
      "error: dup, x.webidl line 1:10\nenum E { \"a\", \"a\" };\n         ^\nx.webidl line 1:15\nenum E { \"a\", \"a\" };\n              ^",
    );
  }

  #[test]
  fn warnings_render_with_warning_prefix() {
    let err = WebIdlError::warning(ErrorKind::InvalidMember, "odd", Vec::new());
    assert!(err.warning);
    assert_eq!(err.to_string(), "warning: odd");
  }

  #[test]
  fn codes_are_partitioned() {
    assert!(ErrorKind::UnexpectedEnd.is_syntax());
    assert!(ErrorKind::NumberOutOfRange.is_syntax());
    assert!(!ErrorKind::SelfContainingDictionary.is_syntax());
    assert_eq!(ErrorKind::IndistinguishableOverloads.code(), "WI1010");
  }
}
