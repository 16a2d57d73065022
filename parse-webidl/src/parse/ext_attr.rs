use super::Parser;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::ext_attr::ExtAttr;
use crate::ext_attr::ExtAttrArgs;
use crate::ext_attr::ExtAttrs;
use crate::loc::Loc;
use crate::token::TT;

impl<'a> Parser<'a> {
  /// Parses an optional `[...]` list.
  pub fn parse_ext_attrs(&mut self) -> IdlResult<ExtAttrs> {
    let mut attrs = ExtAttrs::default();
    if !self.consume_if(TT::BracketOpen).is_match() {
      return Ok(attrs);
    };
    loop {
      attrs.push(self.parse_ext_attr()?);
      if !self.consume_if(TT::Comma).is_match() {
        break;
      };
    }
    self.require(TT::BracketClose)?;
    Ok(attrs)
  }

  fn parse_ext_attr(&mut self) -> IdlResult<ExtAttr> {
    let name_tok = self.require_predicate(
      |t| t == TT::Identifier || Parser::is_keyword(t),
      "extended attribute name",
    )?;
    let name = self.string(name_tok.loc);
    let args = if self.peek().typ == TT::ParenthesisOpen {
      ExtAttrArgs::Args(self.parse_argument_list()?)
    } else if self.consume_if(TT::Equals).is_match() {
      if self.consume_if(TT::ParenthesisOpen).is_match() {
        let mut values = Vec::new();
        loop {
          values.push(self.parse_ext_attr_value()?);
          if !self.consume_if(TT::Comma).is_match() {
            break;
          };
        }
        self.require(TT::ParenthesisClose)?;
        ExtAttrArgs::List(values)
      } else {
        let value = self.parse_ext_attr_value()?;
        if self.peek().typ == TT::ParenthesisOpen {
          ExtAttrArgs::NamedArgs(value, self.parse_argument_list()?)
        } else {
          ExtAttrArgs::Value(value)
        }
      }
    } else {
      ExtAttrArgs::None
    };
    let end = self.buf[self.next_tok_i - 1].loc.1;
    Ok(ExtAttr {
      name,
      loc: self.location(Loc(name_tok.loc.0, end)),
      args,
    })
  }

  fn parse_ext_attr_value(&mut self) -> IdlResult<String> {
    let t = self.consume();
    Ok(match t.typ {
      TT::LiteralString => {
        let raw = self.str(t.loc);
        raw[1..raw.len() - 1].to_string()
      }
      TT::Identifier | TT::LiteralInteger | TT::LiteralFloat | TT::Asterisk => self.string(t.loc),
      typ if Parser::is_keyword(typ) => self.string(t.loc),
      _ => {
        return Err(self.unexpected(t, ErrorKind::ExpectedSyntax("extended attribute value")));
      }
    })
  }
}
