use crate::error::ErrorKind;
use crate::loc::Loc;
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum TT {
  // Special token used to represent the end of the source code.
  EOF,
  // Source text that matches no rule. The parser turns this into an error when it reaches it.
  Invalid,
  // A `/*` without a closing `*/`. Spans from the opening delimiter to the end of input.
  UnterminatedComment,
  // A `"` without a closing quote on the same input.
  UnterminatedString,
  // These are only used by lexer.
  Whitespace,
  CommentSingle,
  CommentMultiline,

  Asterisk,
  BraceClose,
  BraceOpen,
  BracketClose,
  BracketOpen,
  ChevronLeft,
  ChevronRight,
  Colon,
  Comma,
  Dot,
  Ellipsis,
  Equals,
  Hyphen,
  ParenthesisClose,
  ParenthesisOpen,
  Question,
  Semicolon,

  Identifier,
  LiteralFloat,
  LiteralInteger,
  LiteralString,

  KeywordAny,
  KeywordAsync,
  KeywordAttribute,
  KeywordBigint,
  KeywordBoolean,
  KeywordByte,
  KeywordByteString,
  KeywordCallback,
  KeywordConst,
  KeywordConstructor,
  KeywordDeleter,
  KeywordDictionary,
  KeywordDomString,
  KeywordDouble,
  KeywordEnum,
  KeywordFalse,
  KeywordFloat,
  KeywordFrozenArray,
  KeywordGetter,
  KeywordIncludes,
  KeywordInfinity,
  KeywordInherit,
  KeywordInterface,
  KeywordIterable,
  KeywordJsString,
  KeywordLegacycaller,
  KeywordLong,
  KeywordMaplike,
  KeywordMixin,
  KeywordNamespace,
  KeywordNaN,
  KeywordNegativeInfinity,
  KeywordNull,
  KeywordObject,
  KeywordObservableArray,
  KeywordOctet,
  KeywordOptional,
  KeywordOr,
  KeywordPartial,
  KeywordPromise,
  KeywordReadonly,
  KeywordRecord,
  KeywordRequired,
  KeywordSequence,
  KeywordSetlike,
  KeywordSetter,
  KeywordShort,
  KeywordStatic,
  KeywordStringifier,
  KeywordSymbol,
  KeywordTrue,
  KeywordTypedef,
  KeywordUndefined,
  KeywordUnrestricted,
  KeywordUnsigned,
  KeywordUsvString,
  KeywordUtf8String,
  // Legacy spelling of `undefined`.
  KeywordVoid,
}

impl TT {
  /// Keywords that may still be used as the name of an argument.
  pub fn is_argument_name_keyword(self) -> bool {
    matches!(
      self,
      TT::KeywordAsync
        | TT::KeywordAttribute
        | TT::KeywordCallback
        | TT::KeywordConst
        | TT::KeywordConstructor
        | TT::KeywordDeleter
        | TT::KeywordDictionary
        | TT::KeywordEnum
        | TT::KeywordGetter
        | TT::KeywordIncludes
        | TT::KeywordInherit
        | TT::KeywordInterface
        | TT::KeywordIterable
        | TT::KeywordMaplike
        | TT::KeywordMixin
        | TT::KeywordNamespace
        | TT::KeywordPartial
        | TT::KeywordReadonly
        | TT::KeywordRequired
        | TT::KeywordSetlike
        | TT::KeywordSetter
        | TT::KeywordStatic
        | TT::KeywordStringifier
        | TT::KeywordTypedef
        | TT::KeywordUnrestricted
    )
  }

  pub fn is_attribute_name_keyword(self) -> bool {
    matches!(self, TT::KeywordAsync | TT::KeywordRequired)
  }

  pub fn is_operation_name_keyword(self) -> bool {
    matches!(self, TT::KeywordIncludes)
  }
}

#[derive(Clone, Copy, Debug)]
pub struct Token {
  pub loc: Loc,
  pub typ: TT,
}

impl Token {
  /// The error to raise when this token is not what the grammar expects.
  pub fn unexpected(&self, kind: ErrorKind) -> ErrorKind {
    match self.typ {
      TT::EOF => ErrorKind::UnexpectedEnd,
      TT::Invalid => ErrorKind::UnrecognizedInput,
      TT::UnterminatedComment => ErrorKind::UnterminatedComment,
      TT::UnterminatedString => ErrorKind::UnterminatedString,
      _ => kind,
    }
  }
}
