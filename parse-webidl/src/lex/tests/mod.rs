use crate::lex::lex_next;
use crate::lex::tokens;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::token::TT;
use crate::token::TT::*;

fn check<const N: usize>(code: &str, expecteds: [TT; N]) {
  let mut lexer = Lexer::new(code);
  for expected in expecteds {
    let t = lex_next(&mut lexer);
    assert_eq!(t.typ, expected, "lexing {:?}", code);
  }
  let t = lex_next(&mut lexer);
  assert_eq!(EOF, t.typ);
}

#[test]
fn test_lex_keywords() {
  check("interface", [KeywordInterface]);
  check("DOMString", [KeywordDomString]);
  check("unsigned long long", [KeywordUnsigned, KeywordLong, KeywordLong]);
  check("-Infinity Infinity NaN", [KeywordNegativeInfinity, KeywordInfinity, KeywordNaN]);
}

#[test]
fn test_lex_identifiers() {
  check("h929", [Identifier]);
  check("_interface", [Identifier]);
  check("interfaces", [Identifier]);
  check("moz-foo", [Identifier]);
  check("-webkit", [Identifier]);
}

#[test]
fn test_lex_literal_numbers() {
  check("1", [LiteralInteger]);
  check("0x1F", [LiteralInteger]);
  check("-017", [LiteralInteger]);
  check("1.5", [LiteralFloat]);
  check(".5", [LiteralFloat]);
  check("-.5e3", [LiteralFloat]);
  check("2e10", [LiteralFloat]);
  check("3.", [LiteralFloat]);
  check("1 - 2", [LiteralInteger, Hyphen, LiteralInteger]);
  check("0x", [Invalid, Identifier]);
}

#[test]
fn test_lex_punctuation() {
  check(
    "[](){}<>,;:=?*...",
    [
      BracketOpen,
      BracketClose,
      ParenthesisOpen,
      ParenthesisClose,
      BraceOpen,
      BraceClose,
      ChevronLeft,
      ChevronRight,
      Comma,
      Semicolon,
      Colon,
      Equals,
      Question,
      Asterisk,
      Ellipsis,
    ],
  );
  check("a.b", [Identifier, Dot, Identifier]);
}

#[test]
fn test_lex_strings() {
  check("\"a b c\"", [LiteralString]);
  check("\"multi\nline\"", [LiteralString]);
  check("\"open", [UnterminatedString]);
}

#[test]
fn test_lex_comments_and_whitespace() {
  check("// line\n  /* block\n */ long", [KeywordLong]);
  check("long /* never closed", [KeywordLong, UnterminatedComment]);
  check("\t\r\n", []);
}

#[test]
fn test_lex_invalid_characters() {
  check("@", [Invalid]);
  check("long # short", [KeywordLong, Invalid, KeywordShort]);
}

#[test]
fn test_lex_locations() {
  let mut lexer = Lexer::new("  enum E");
  let t = lex_next(&mut lexer);
  assert_eq!(t.loc, Loc(2, 6));
  let t = lex_next(&mut lexer);
  assert_eq!(&lexer[t.loc], "E");
}

#[test]
fn test_tokens_is_restartable() {
  let mut lexer = Lexer::new("typedef long L;");
  let cp = lexer.checkpoint();
  let first: Vec<TT> = tokens(&mut lexer).map(|t| t.typ).collect();
  lexer.apply_checkpoint(cp);
  let second: Vec<TT> = tokens(&mut lexer).map(|t| t.typ).collect();
  assert_eq!(first, vec![KeywordTypedef, KeywordLong, Identifier, Semicolon]);
  assert_eq!(first, second);
}
