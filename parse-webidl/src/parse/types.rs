use super::Parser;
use crate::builtins::BuiltinType;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::ext_attr;
use crate::ext_attr::Target;
use crate::loc::Loc;
use crate::token::TT;
use crate::types::TypeAttrs;
use crate::types::UnresolvedKind;
use crate::types::UnresolvedType;

impl<'a> Parser<'a> {
  /// A type optionally preceded by type annotations such as `[Clamp]`.
  pub fn parse_type_with_ext_attrs(&mut self) -> IdlResult<UnresolvedType> {
    let attrs = self.parse_type_attrs()?;
    let mut ty = self.parse_type()?;
    ty.attrs = ty.attrs.union(attrs);
    Ok(ty)
  }

  fn parse_type_attrs(&mut self) -> IdlResult<TypeAttrs> {
    let mut ext_attrs = self.parse_ext_attrs()?;
    ext_attr::check(&ext_attrs, Target::Type, "")?;
    Ok(ext_attrs.take_type_attrs())
  }

  pub fn parse_type(&mut self) -> IdlResult<UnresolvedType> {
    let start = self.peek().loc.0;
    if self.consume_if(TT::ParenthesisOpen).is_match() {
      let mut members = vec![self.parse_union_member()?];
      while self.consume_if(TT::KeywordOr).is_match() {
        members.push(self.parse_union_member()?);
      }
      if members.len() < 2 {
        let t = self.peek();
        return Err(self.unexpected(t, ErrorKind::RequiredTokenNotFound(TT::KeywordOr)));
      };
      self.require(TT::ParenthesisClose)?;
      return self.finish_type(start, UnresolvedKind::Union(members), true);
    };
    let t = self.peek();
    match t.typ {
      TT::KeywordAny => {
        self.consume();
        self.finish_type(start, UnresolvedKind::Builtin(BuiltinType::Any), false)
      }
      TT::KeywordPromise => {
        self.consume();
        self.require(TT::ChevronLeft)?;
        let inner = self.parse_type()?;
        self.require(TT::ChevronRight)?;
        self.finish_type(start, UnresolvedKind::Promise(Box::new(inner)), false)
      }
      _ => self.parse_distinguishable_type(),
    }
  }

  fn parse_union_member(&mut self) -> IdlResult<UnresolvedType> {
    if self.peek().typ == TT::ParenthesisOpen {
      return self.parse_type();
    };
    let attrs = self.parse_type_attrs()?;
    let mut ty = self.parse_distinguishable_type()?;
    ty.attrs = ty.attrs.union(attrs);
    Ok(ty)
  }

  fn finish_type(&mut self, start: usize, kind: UnresolvedKind, nullable_allowed: bool) -> IdlResult<UnresolvedType> {
    let nullable = nullable_allowed && self.consume_if(TT::Question).is_match();
    let end = self.buf[self.next_tok_i - 1].loc.1;
    Ok(UnresolvedType {
      loc: self.location(Loc(start, end)),
      kind,
      nullable,
      attrs: TypeAttrs::default(),
    })
  }

  fn parse_generic_argument(&mut self) -> IdlResult<Box<UnresolvedType>> {
    self.require(TT::ChevronLeft)?;
    let inner = self.parse_type_with_ext_attrs()?;
    self.require(TT::ChevronRight)?;
    Ok(Box::new(inner))
  }

  fn parse_distinguishable_type(&mut self) -> IdlResult<UnresolvedType> {
    let start = self.peek().loc.0;
    let t = self.consume();
    let builtin = |b| Ok(UnresolvedKind::Builtin(b));
    let kind = match t.typ {
      TT::KeywordBoolean => builtin(BuiltinType::Boolean),
      TT::KeywordByte => builtin(BuiltinType::Byte),
      TT::KeywordOctet => builtin(BuiltinType::Octet),
      TT::KeywordBigint => builtin(BuiltinType::BigInt),
      TT::KeywordShort => builtin(BuiltinType::Short),
      TT::KeywordLong => {
        if self.consume_if(TT::KeywordLong).is_match() {
          builtin(BuiltinType::LongLong)
        } else {
          builtin(BuiltinType::Long)
        }
      }
      TT::KeywordUnsigned => {
        let t = self.consume();
        match t.typ {
          TT::KeywordShort => builtin(BuiltinType::UnsignedShort),
          TT::KeywordLong if self.consume_if(TT::KeywordLong).is_match() => {
            builtin(BuiltinType::UnsignedLongLong)
          }
          TT::KeywordLong => builtin(BuiltinType::UnsignedLong),
          _ => Err(self.unexpected(t, ErrorKind::ExpectedSyntax("short or long"))),
        }
      }
      TT::KeywordUnrestricted => {
        let t = self.consume();
        match t.typ {
          TT::KeywordFloat => builtin(BuiltinType::UnrestrictedFloat),
          TT::KeywordDouble => builtin(BuiltinType::UnrestrictedDouble),
          _ => Err(self.unexpected(t, ErrorKind::ExpectedSyntax("float or double"))),
        }
      }
      TT::KeywordFloat => builtin(BuiltinType::Float),
      TT::KeywordDouble => builtin(BuiltinType::Double),
      TT::KeywordDomString => builtin(BuiltinType::DomString),
      TT::KeywordByteString => builtin(BuiltinType::ByteString),
      TT::KeywordUsvString => builtin(BuiltinType::UsvString),
      TT::KeywordUtf8String => builtin(BuiltinType::Utf8String),
      TT::KeywordJsString => builtin(BuiltinType::JsString),
      TT::KeywordObject => builtin(BuiltinType::Object),
      TT::KeywordSymbol => builtin(BuiltinType::Symbol),
      TT::KeywordUndefined | TT::KeywordVoid => builtin(BuiltinType::Undefined),
      TT::KeywordSequence => Ok(UnresolvedKind::Sequence(self.parse_generic_argument()?)),
      TT::KeywordFrozenArray => Ok(UnresolvedKind::FrozenArray(self.parse_generic_argument()?)),
      TT::KeywordObservableArray => {
        Ok(UnresolvedKind::ObservableArray(self.parse_generic_argument()?))
      }
      TT::KeywordRecord => {
        self.require(TT::ChevronLeft)?;
        let k = self.consume();
        let key = match k.typ {
          TT::KeywordDomString => BuiltinType::DomString,
          TT::KeywordByteString => BuiltinType::ByteString,
          TT::KeywordUsvString => BuiltinType::UsvString,
          TT::KeywordUtf8String => BuiltinType::Utf8String,
          TT::KeywordJsString => BuiltinType::JsString,
          _ => return Err(self.unexpected(k, ErrorKind::ExpectedSyntax("string type as record key"))),
        };
        self.require(TT::Comma)?;
        let value = self.parse_type_with_ext_attrs()?;
        self.require(TT::ChevronRight)?;
        Ok(UnresolvedKind::Record(key, Box::new(value)))
      }
      TT::Identifier => {
        let ident = crate::scope::identifier_from_source(self.str(t.loc), self.location(t.loc))?;
        Ok(UnresolvedKind::Named(ident))
      }
      _ => Err(self.unexpected(t, ErrorKind::ExpectedSyntax("type"))),
    }?;
    self.finish_type(start, kind, true)
  }
}
