use super::Parser;
use crate::ast::value::Value;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::error::WebIdlError;
use crate::num::parse_float;
use crate::num::parse_integer;
use crate::num::IdlFloat;
use crate::token::Token;
use crate::token::TT;

impl<'a> Parser<'a> {
  fn number_error(&self, t: Token, kind: ErrorKind) -> WebIdlError {
    WebIdlError::new(
      kind,
      format!("{}: {}", kind.syntax_message(None), self.str(t.loc)),
      vec![self.location(t.loc)],
    )
  }

  /// The value of a `const`: a boolean, integer or float literal.
  pub fn parse_const_value(&mut self) -> IdlResult<Value> {
    let t = self.consume();
    Ok(match t.typ {
      TT::KeywordTrue => Value::Boolean(true),
      TT::KeywordFalse => Value::Boolean(false),
      TT::KeywordInfinity => Value::Float(IdlFloat(f64::INFINITY)),
      TT::KeywordNegativeInfinity => Value::Float(IdlFloat(f64::NEG_INFINITY)),
      TT::KeywordNaN => Value::Float(IdlFloat(f64::NAN)),
      TT::LiteralInteger => {
        Value::Integer(parse_integer(self.str(t.loc)).map_err(|k| self.number_error(t, k))?)
      }
      TT::LiteralFloat => {
        Value::Float(parse_float(self.str(t.loc)).map_err(|k| self.number_error(t, k))?)
      }
      _ => return Err(self.unexpected(t, ErrorKind::ExpectedSyntax("constant value"))),
    })
  }

  /// A default value of an optional argument or dictionary member.
  pub fn parse_default_value(&mut self) -> IdlResult<Value> {
    let t = self.peek();
    match t.typ {
      TT::LiteralString => {
        self.consume();
        let raw = self.str(t.loc);
        Ok(Value::String(raw[1..raw.len() - 1].to_string()))
      }
      TT::KeywordNull => {
        self.consume();
        Ok(Value::Null)
      }
      TT::KeywordUndefined => {
        self.consume();
        Ok(Value::Undefined)
      }
      TT::BracketOpen => {
        self.consume();
        self.require(TT::BracketClose)?;
        Ok(Value::EmptySequence)
      }
      TT::BraceOpen => {
        self.consume();
        self.require(TT::BraceClose)?;
        Ok(Value::EmptyDictionary)
      }
      _ => self.parse_const_value(),
    }
  }
}
