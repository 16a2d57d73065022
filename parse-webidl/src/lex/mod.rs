use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use aho_corasick::AhoCorasick;
use aho_corasick::AhoCorasickBuilder;
use aho_corasick::AhoCorasickKind;
use aho_corasick::Anchored;
use aho_corasick::Input;
use aho_corasick::MatchKind;
use aho_corasick::StartKind;
use core::ops::Index;
use memchr::memchr;
use memchr::memmem;
use once_cell::sync::Lazy;

#[cfg(test)]
mod tests;

#[derive(Copy, Clone)]
pub struct LexerCheckpoint {
  next: usize,
}

// Contains the match length.
#[derive(Copy, Clone)]
struct Match(usize);

impl Match {
  pub fn len(&self) -> usize {
    self.0
  }
}

struct PatternMatcher {
  patterns: Vec<TT>,
  matcher: AhoCorasick,
}

impl PatternMatcher {
  pub fn new<D: AsRef<str>>(patterns: Vec<(TT, D)>) -> Self {
    let (tts, syns): (Vec<_>, Vec<_>) = patterns.into_iter().unzip();
    let byte_syns: Vec<Vec<u8>> = syns.iter().map(|s| s.as_ref().as_bytes().to_vec()).collect();
    let matcher = AhoCorasickBuilder::new()
      .start_kind(StartKind::Anchored)
      .kind(Some(AhoCorasickKind::DFA))
      .match_kind(MatchKind::LeftmostLongest)
      .build(byte_syns)
      .unwrap();
    PatternMatcher {
      patterns: tts,
      matcher,
    }
  }

  pub fn find(&self, lexer: &Lexer) -> LexResult<(TT, Match)> {
    self
      .matcher
      .find(Input::new(&lexer.source[lexer.next..]).anchored(Anchored::Yes))
      .map(|m| (self.patterns[m.pattern().as_usize()], Match(m.end())))
      .ok_or(LexNotFound)
  }
}

#[derive(Debug)]
struct LexNotFound;

type LexResult<T> = Result<T, LexNotFound>;

/// A restartable tokenizer over one in-memory source text.
///
/// Tokens are produced lazily by [`lex_next`] (or through [`tokens`]); a checkpoint taken at
/// any point can be reapplied to lex the same tokens again.
pub struct Lexer<'a> {
  source: &'a str,
  next: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(code: &'a str) -> Lexer<'a> {
    Lexer {
      source: code,
      next: 0,
    }
  }

  pub fn next(&self) -> usize {
    self.next
  }

  fn end(&self) -> usize {
    self.source.len()
  }

  pub fn source_range(&self) -> Loc {
    Loc(0, self.end())
  }

  fn eof_range(&self) -> Loc {
    Loc(self.end(), self.end())
  }

  fn at_end(&self) -> bool {
    self.next >= self.end()
  }

  fn peek_byte(&self, n: usize) -> Option<u8> {
    self.source.as_bytes().get(self.next + n).copied()
  }

  /// WARNING: Prefer checkpoints instead. Only use this if you know what you're doing.
  pub fn set_next(&mut self, next: usize) {
    self.next = next;
  }

  pub fn checkpoint(&self) -> LexerCheckpoint {
    LexerCheckpoint { next: self.next }
  }

  pub fn since_checkpoint(&self, checkpoint: LexerCheckpoint) -> Loc {
    Loc(checkpoint.next, self.next)
  }

  pub fn apply_checkpoint(&mut self, checkpoint: LexerCheckpoint) {
    self.next = checkpoint.next;
  }

  fn while_bytes(&self, pred: impl Fn(u8) -> bool) -> Match {
    Match(
      self.source.as_bytes()[self.next..]
        .iter()
        .take_while(|b| pred(**b))
        .count(),
    )
  }

  fn consume(&mut self, m: Match) -> Match {
    self.next += m.len();
    m
  }

  fn skip_expect(&mut self, n: usize) {
    debug_assert!(self.next + n <= self.end());
    self.next += n;
  }

  fn skip_to_end(&mut self) {
    self.next = self.end();
  }

  fn drive_fallible(&mut self, f: impl FnOnce(&mut Self) -> LexResult<TT>) -> Token {
    let cp = self.checkpoint();
    let typ = match f(self) {
      Ok(typ) => typ,
      Err(LexNotFound) => {
        // Always make progress so that the parser reports the invalid character itself.
        self.apply_checkpoint(cp);
        let len = self.source[self.next..].chars().next().map_or(0, |c| c.len_utf8());
        self.skip_expect(len);
        TT::Invalid
      }
    };
    Token {
      loc: self.since_checkpoint(cp),
      typ,
    }
  }
}

impl<'a> Index<Loc> for Lexer<'a> {
  type Output = str;

  fn index(&self, index: Loc) -> &Self::Output {
    &self.source[index.0..index.1]
  }
}

/// Lazily yields the remaining significant tokens, stopping before EOF.
pub fn tokens<'l, 'a>(lexer: &'l mut Lexer<'a>) -> impl Iterator<Item = Token> + use<'l, 'a> {
  std::iter::from_fn(move || {
    let t = lex_next(lexer);
    (t.typ != TT::EOF).then_some(t)
  })
}

#[rustfmt::skip]
pub static OPERATORS_MAPPING: Lazy<HashMap<TT, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static str>::new();
  map.insert(TT::Asterisk, "*");
  map.insert(TT::BraceClose, "}");
  map.insert(TT::BraceOpen, "{");
  map.insert(TT::BracketClose, "]");
  map.insert(TT::BracketOpen, "[");
  map.insert(TT::ChevronLeft, "<");
  map.insert(TT::ChevronRight, ">");
  map.insert(TT::Colon, ":");
  map.insert(TT::Comma, ",");
  map.insert(TT::Dot, ".");
  map.insert(TT::Ellipsis, "...");
  map.insert(TT::Equals, "=");
  map.insert(TT::Hyphen, "-");
  map.insert(TT::ParenthesisClose, ")");
  map.insert(TT::ParenthesisOpen, "(");
  map.insert(TT::Question, "?");
  map.insert(TT::Semicolon, ";");
  map
});

#[rustfmt::skip]
pub static KEYWORDS_MAPPING: Lazy<HashMap<TT, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static str>::new();
  map.insert(TT::KeywordAny, "any");
  map.insert(TT::KeywordAsync, "async");
  map.insert(TT::KeywordAttribute, "attribute");
  map.insert(TT::KeywordBigint, "bigint");
  map.insert(TT::KeywordBoolean, "boolean");
  map.insert(TT::KeywordByte, "byte");
  map.insert(TT::KeywordByteString, "ByteString");
  map.insert(TT::KeywordCallback, "callback");
  map.insert(TT::KeywordConst, "const");
  map.insert(TT::KeywordConstructor, "constructor");
  map.insert(TT::KeywordDeleter, "deleter");
  map.insert(TT::KeywordDictionary, "dictionary");
  map.insert(TT::KeywordDomString, "DOMString");
  map.insert(TT::KeywordDouble, "double");
  map.insert(TT::KeywordEnum, "enum");
  map.insert(TT::KeywordFalse, "false");
  map.insert(TT::KeywordFloat, "float");
  map.insert(TT::KeywordFrozenArray, "FrozenArray");
  map.insert(TT::KeywordGetter, "getter");
  map.insert(TT::KeywordIncludes, "includes");
  map.insert(TT::KeywordInfinity, "Infinity");
  map.insert(TT::KeywordInherit, "inherit");
  map.insert(TT::KeywordInterface, "interface");
  map.insert(TT::KeywordIterable, "iterable");
  map.insert(TT::KeywordJsString, "JSString");
  map.insert(TT::KeywordLegacycaller, "legacycaller");
  map.insert(TT::KeywordLong, "long");
  map.insert(TT::KeywordMaplike, "maplike");
  map.insert(TT::KeywordMixin, "mixin");
  map.insert(TT::KeywordNamespace, "namespace");
  map.insert(TT::KeywordNaN, "NaN");
  map.insert(TT::KeywordNegativeInfinity, "-Infinity");
  map.insert(TT::KeywordNull, "null");
  map.insert(TT::KeywordObject, "object");
  map.insert(TT::KeywordObservableArray, "ObservableArray");
  map.insert(TT::KeywordOctet, "octet");
  map.insert(TT::KeywordOptional, "optional");
  map.insert(TT::KeywordOr, "or");
  map.insert(TT::KeywordPartial, "partial");
  map.insert(TT::KeywordPromise, "Promise");
  map.insert(TT::KeywordReadonly, "readonly");
  map.insert(TT::KeywordRecord, "record");
  map.insert(TT::KeywordRequired, "required");
  map.insert(TT::KeywordSequence, "sequence");
  map.insert(TT::KeywordSetlike, "setlike");
  map.insert(TT::KeywordSetter, "setter");
  map.insert(TT::KeywordShort, "short");
  map.insert(TT::KeywordStatic, "static");
  map.insert(TT::KeywordStringifier, "stringifier");
  map.insert(TT::KeywordSymbol, "symbol");
  map.insert(TT::KeywordTrue, "true");
  map.insert(TT::KeywordTypedef, "typedef");
  map.insert(TT::KeywordUndefined, "undefined");
  map.insert(TT::KeywordUnrestricted, "unrestricted");
  map.insert(TT::KeywordUnsigned, "unsigned");
  map.insert(TT::KeywordUsvString, "USVString");
  map.insert(TT::KeywordUtf8String, "UTF8String");
  map.insert(TT::KeywordVoid, "void");
  map
});

pub static KEYWORD_STRS: Lazy<HashMap<&'static str, TT>> = Lazy::new(|| {
  HashMap::<&'static str, TT>::from_iter(KEYWORDS_MAPPING.iter().map(|(k, v)| (*v, *k)))
});

const ID_START_CHARSTR: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_";

fn is_id_continue(b: u8) -> bool {
  b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

#[rustfmt::skip]
static SIG: Lazy<PatternMatcher> = Lazy::new(|| {
  let mut patterns: Vec<(TT, String)> = Vec::new();
  for (&k, &v) in OPERATORS_MAPPING.iter() {
    patterns.push((k, v.into()));
  }
  for c in ID_START_CHARSTR.chars() {
    patterns.push((TT::Identifier, c.to_string()));
    // `-` directly followed by a letter starts an identifier such as `-Infinity`, not an operator.
    if c != '_' {
      patterns.push((TT::Identifier, format!("-{}", c)));
    }
  }
  for digit in '0'..='9' {
    patterns.push((TT::LiteralInteger, digit.to_string()));
    patterns.push((TT::LiteralInteger, format!("-{}", digit)));
    // Prevent `.` immediately followed by a digit from being recognised as the `.` operator.
    patterns.push((TT::LiteralFloat, format!(".{}", digit)));
    patterns.push((TT::LiteralFloat, format!("-.{}", digit)));
  }
  patterns.push((TT::LiteralString, "\"".into()));
  PatternMatcher::new(patterns)
});

static INSIG: Lazy<PatternMatcher> = Lazy::new(|| {
  PatternMatcher::new::<&str>(vec![
    (TT::Whitespace, "\t"),
    (TT::Whitespace, "\n"),
    (TT::Whitespace, "\r"),
    (TT::Whitespace, " "),
    (TT::CommentMultiline, "/*"),
    (TT::CommentSingle, "//"),
  ])
});

/// Returns false if the comment runs to the end of input without being closed.
fn lex_multiline_comment(lexer: &mut Lexer<'_>) -> bool {
  // Consume `/*`.
  lexer.skip_expect(2);
  match memmem::find(&lexer.source.as_bytes()[lexer.next..], b"*/") {
    Some(pos) => {
      lexer.skip_expect(pos + 2);
      true
    }
    None => {
      lexer.skip_to_end();
      false
    }
  }
}

fn lex_single_comment(lexer: &mut Lexer<'_>) {
  // Consume `//`.
  lexer.skip_expect(2);
  match memchr(b'\n', &lexer.source.as_bytes()[lexer.next..]) {
    Some(pos) => lexer.skip_expect(pos + 1),
    None => lexer.skip_to_end(),
  };
}

fn lex_identifier(lexer: &mut Lexer<'_>) -> TT {
  let cp = lexer.checkpoint();
  // Consume the leading `-` or first character; both are already known to be valid.
  lexer.skip_expect(1);
  lexer.consume(lexer.while_bytes(is_id_continue));
  let raw = &lexer.source[cp.next..lexer.next];
  KEYWORD_STRS.get(raw).copied().unwrap_or(TT::Identifier)
}

fn lex_digits(lexer: &mut Lexer<'_>) -> usize {
  lexer.consume(lexer.while_bytes(|b| b.is_ascii_digit())).len()
}

/// Lexes the shape of a numeric literal. The value is converted by [`crate::num`] when the parser
/// consumes the token, so that range errors carry a full location.
fn lex_number(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  if lexer.peek_byte(0) == Some(b'-') {
    lexer.skip_expect(1);
  };
  if lexer.peek_byte(0) == Some(b'0') && matches!(lexer.peek_byte(1), Some(b'x' | b'X')) {
    lexer.skip_expect(2);
    let digits = lexer.consume(lexer.while_bytes(|b| b.is_ascii_hexdigit()));
    if digits.len() == 0 {
      return Err(LexNotFound);
    };
    return Ok(TT::LiteralInteger);
  };
  let int_digits = lex_digits(lexer);
  let mut typ = TT::LiteralInteger;
  if lexer.peek_byte(0) == Some(b'.') {
    lexer.skip_expect(1);
    let frac_digits = lex_digits(lexer);
    if int_digits + frac_digits == 0 {
      return Err(LexNotFound);
    };
    typ = TT::LiteralFloat;
  };
  if matches!(lexer.peek_byte(0), Some(b'e' | b'E')) {
    let cp = lexer.checkpoint();
    lexer.skip_expect(1);
    if matches!(lexer.peek_byte(0), Some(b'+' | b'-')) {
      lexer.skip_expect(1);
    };
    if lex_digits(lexer) == 0 {
      // Not an exponent; leave the `e` for the next token.
      lexer.apply_checkpoint(cp);
    } else {
      typ = TT::LiteralFloat;
    };
  };
  Ok(typ)
}

fn lex_string(lexer: &mut Lexer<'_>) -> TT {
  // Consume the opening quote.
  lexer.skip_expect(1);
  match memchr(b'"', &lexer.source.as_bytes()[lexer.next..]) {
    Some(pos) => {
      lexer.skip_expect(pos + 1);
      TT::LiteralString
    }
    None => {
      lexer.skip_to_end();
      TT::UnterminatedString
    }
  }
}

pub fn lex_next(lexer: &mut Lexer<'_>) -> Token {
  // Skip whitespace and comments before the next significant token.
  while let Ok((tt, mat)) = INSIG.find(lexer) {
    match tt {
      TT::Whitespace => {
        lexer.consume(mat);
      }
      TT::CommentSingle => lex_single_comment(lexer),
      TT::CommentMultiline => {
        let cp = lexer.checkpoint();
        if !lex_multiline_comment(lexer) {
          return Token {
            loc: lexer.since_checkpoint(cp),
            typ: TT::UnterminatedComment,
          };
        };
      }
      _ => unreachable!(),
    };
  }

  // EOF is different from Invalid, so we should emit this specifically instead of letting drive_fallible return an Invalid.
  if lexer.at_end() {
    return Token {
      loc: lexer.eof_range(),
      typ: TT::EOF,
    };
  };

  lexer.drive_fallible(|lexer| {
    SIG.find(lexer).and_then(|(tt, mat)| match tt {
      TT::Identifier => Ok(lex_identifier(lexer)),
      TT::LiteralInteger | TT::LiteralFloat => lex_number(lexer),
      TT::LiteralString => Ok(lex_string(lexer)),
      typ => {
        lexer.consume(mat);
        Ok(typ)
      }
    })
  })
}
