use crate::error::ErrorKind;
use crate::error::WebIdlError;
use serde::Serialize;
use serde::Serializer;
use std::cmp::max;
use std::cmp::min;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Add;
use std::ops::AddAssign;
use std::sync::Arc;

/// A byte range within a single source file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Loc(pub usize, pub usize);

impl Loc {
  pub fn is_empty(&self) -> bool {
    self.0 >= self.1
  }

  pub fn len(&self) -> usize {
    self.1.saturating_sub(self.0)
  }

  pub fn extend(&mut self, other: Loc) {
    self.0 = min(self.0, other.0);
    self.1 = max(self.1, other.1);
  }
}

impl Add for Loc {
  type Output = Loc;

  fn add(self, rhs: Self) -> Self::Output {
    let mut new = self;
    new.extend(rhs);
    new
  }
}

impl AddAssign for Loc {
  fn add_assign(&mut self, rhs: Self) {
    self.extend(rhs);
  }
}

/// The text of one input file, shared by every [`Location`] pointing into it.
pub struct SourceFile {
  pub name: String,
  pub text: String,
}

impl SourceFile {
  pub fn new(name: impl Into<String>, text: impl Into<String>) -> Arc<SourceFile> {
    Arc::new(SourceFile {
      name: name.into(),
      text: text.into(),
    })
  }

  /// One-based line and column of a byte offset. Columns count characters, not bytes.
  pub fn line_col(&self, offset: usize) -> (usize, usize) {
    let offset = min(offset, self.text.len());
    let before = &self.text[..floor_char_boundary(&self.text, offset)];
    let line = before.bytes().filter(|b| *b == b'\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() + 1;
    (line, col)
  }

  /// The full text of the line containing `offset`, without its terminator.
  pub fn line_text(&self, offset: usize) -> &str {
    let offset = floor_char_boundary(&self.text, min(offset, self.text.len()));
    let start = self.text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = self.text[offset..]
      .find('\n')
      .map(|i| offset + i)
      .unwrap_or(self.text.len());
    self.text[start..end].trim_end_matches('\r')
  }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
  while offset > 0 && !text.is_char_boundary(offset) {
    offset -= 1;
  }
  offset
}

/// A position in a named input, rendered to a snippet with a caret only when displayed.
#[derive(Clone)]
pub struct Location {
  file: Arc<SourceFile>,
  pub loc: Loc,
}

impl Location {
  pub fn new(file: Arc<SourceFile>, loc: Loc) -> Location {
    Location { file, loc }
  }

  pub fn file_name(&self) -> &str {
    &self.file.name
  }

  pub fn line_col(&self) -> (usize, usize) {
    self.file.line_col(self.loc.0)
  }

  pub fn source_text(&self) -> &str {
    let end = min(self.loc.1, self.file.text.len());
    let start = min(self.loc.0, end);
    self.file.text.get(start..end).unwrap_or("")
  }

  /// Spans from the start of `self` to the end of `other`, which must be in the same file.
  pub fn to(&self, other: &Location) -> Location {
    if Arc::ptr_eq(&self.file, &other.file) {
      Location::new(self.file.clone(), self.loc + other.loc)
    } else {
      self.clone()
    }
  }

  pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> WebIdlError {
    WebIdlError::new(kind, message, vec![self.clone()])
  }
}

impl Display for Location {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let (line, col) = self.line_col();
    write!(
      f,
      "{} line {}:{}\n{}\n{}^",
      self.file.name,
      line,
      col,
      self.file.line_text(self.loc.0),
      " ".repeat(col - 1),
    )
  }
}

impl Debug for Location {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{}:{}]", self.file.name, self.loc.0, self.loc.1)
  }
}

// Two locations are equal when they name the same range of the same file name, so graphs built
// from separate parses of the same text compare equal.
impl PartialEq for Location {
  fn eq(&self, other: &Self) -> bool {
    self.loc == other.loc && self.file.name == other.file.name
  }
}

impl Eq for Location {}

impl Serialize for Location {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let (line, col) = self.line_col();
    serializer.serialize_str(&format!("{}:{}:{}", self.file.name, line, col))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extend_covers_both_ranges() {
    let mut loc = Loc(4, 6);
    loc.extend(Loc(1, 5));
    assert_eq!(loc, Loc(1, 6));
    assert_eq!(Loc(3, 4) + Loc(8, 9), Loc(3, 9));
  }

  #[test]
  fn line_and_column_are_one_based() {
    let file = SourceFile::new("a.webidl", "interface A {\n  attribute long x;\n};\n");
    assert_eq!(file.line_col(0), (1, 1));
    assert_eq!(file.line_col(16), (2, 3));
    assert_eq!(file.line_text(16), "  attribute long x;");
  }

  #[test]
  fn display_renders_snippet_and_caret() {
    let file = SourceFile::new("b.webidl", "typedef long L;\ntypedef Q R;");
    let location = Location::new(file, Loc(24, 25));
    assert_eq!(location.to_string(), "b.webidl line 2:9\ntypedef Q R;\n        ^");
  }

  #[test]
  fn offsets_past_end_are_clamped() {
    let file = SourceFile::new("c.webidl", "enum E {};");
    let location = Location::new(file, Loc(100, 200));
    assert_eq!(location.line_col(), (1, 11));
    assert_eq!(location.source_text(), "");
  }
}
