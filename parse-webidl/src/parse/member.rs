use super::Parser;
use crate::ast::member::Argument;
use crate::ast::member::Attribute;
use crate::ast::member::Const;
use crate::ast::member::Declaration;
use crate::ast::member::DeclarationKind;
use crate::ast::member::Member;
use crate::ast::member::MemberKind;
use crate::ast::member::Method;
use crate::ast::member::MethodKind;
use crate::ast::member::Overload;
use crate::ast::member::Special;
use crate::ast::DefId;
use crate::ast::Identifier;
use crate::ast::InterfaceKind;
use crate::ast::MemberId;
use crate::builtins::BuiltinType;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::ext_attr;
use crate::ext_attr::ExtAttrs;
use crate::ext_attr::Target;
use crate::loc::Loc;
use crate::scope::check_member_name;
use crate::scope::MemberBinding;
use crate::scope::ScopeId;
use crate::token::TT;
use crate::types::Type;
use crate::types::TypeSlot;

#[derive(Clone, Copy, Default)]
struct AttributeQualifiers {
  readonly: bool,
  inherit: bool,
  is_static: bool,
  stringifier: bool,
}

/// Whether a member introduced by `typ` may appear in a body of `kind`.
fn member_allowed(kind: InterfaceKind, typ: TT) -> bool {
  let interface_only = matches!(
    typ,
    TT::KeywordConstructor
      | TT::KeywordStatic
      | TT::KeywordInherit
      | TT::KeywordIterable
      | TT::KeywordAsync
      | TT::KeywordMaplike
      | TT::KeywordSetlike
      | TT::KeywordGetter
      | TT::KeywordSetter
      | TT::KeywordDeleter
      | TT::KeywordLegacycaller
  );
  match kind {
    InterfaceKind::Interface => true,
    InterfaceKind::Mixin => !interface_only,
    InterfaceKind::Namespace => {
      !interface_only && !matches!(typ, TT::KeywordAttribute | TT::KeywordStringifier)
    }
    InterfaceKind::CallbackInterface => {
      !interface_only
        && !matches!(
          typ,
          TT::KeywordAttribute | TT::KeywordReadonly | TT::KeywordStringifier
        )
    }
  }
}

impl<'a> Parser<'a> {
  /// Parses a parenthesized argument list.
  pub fn parse_argument_list(&mut self) -> IdlResult<Vec<Argument>> {
    self.require(TT::ParenthesisOpen)?;
    let mut args: Vec<Argument> = Vec::new();
    if self.consume_if(TT::ParenthesisClose).is_match() {
      return Ok(args);
    };
    loop {
      let arg = self.parse_argument()?;
      if let Some(prev) = args.iter().find(|a| a.ident.name == arg.ident.name) {
        return Err(
          arg
            .ident
            .loc
            .error(
              ErrorKind::DuplicateIdentifier,
              format!("Duplicate argument name '{}'", arg.ident.name),
            )
            .with_location(&prev.ident.loc),
        );
      };
      if let Some(prev) = args.last().filter(|a| a.variadic) {
        return Err(prev.ident.loc.error(
          ErrorKind::InvalidSignature,
          format!("Variadic argument '{}' must be the last argument", prev.ident.name),
        ));
      };
      args.push(arg);
      if !self.consume_if(TT::Comma).is_match() {
        break;
      };
    }
    self.require(TT::ParenthesisClose)?;
    Ok(args)
  }

  fn parse_argument(&mut self) -> IdlResult<Argument> {
    let mut ext_attrs = self.parse_ext_attrs()?;
    let optional = self.consume_if(TT::KeywordOptional).is_match();
    let (mut ty, variadic) = if optional {
      (self.parse_type_with_ext_attrs()?, false)
    } else {
      let ty = self.parse_type()?;
      (ty, self.consume_if(TT::Ellipsis).is_match())
    };
    let ident = self.require_name(TT::is_argument_name_keyword, "argument name")?;
    let default = if optional && self.consume_if(TT::Equals).is_match() {
      Some(self.parse_default_value()?)
    } else {
      None
    };
    ty.attrs = ty.attrs.union(ext_attrs.take_type_attrs());
    ext_attr::check(&ext_attrs, Target::Argument, &ident.name)?;
    Ok(Argument {
      ident,
      ty: TypeSlot::Unresolved(ty),
      optional,
      variadic,
      default,
      ext_attrs,
    })
  }

  /// Parses one member of an interface, mixin, namespace or callback interface body. Returns the
  /// member if it is new; an overload merged into an existing operation returns `None`.
  pub fn parse_interface_member(
    &mut self,
    owner: DefId,
    kind: InterfaceKind,
    scope: ScopeId,
  ) -> IdlResult<Option<MemberId>> {
    let ext_attrs = self.parse_ext_attrs()?;
    let t = self.peek();
    let start = t.loc.0;
    if !member_allowed(kind, t.typ) {
      return Err(self.location(t.loc).error(
        ErrorKind::InvalidMember,
        format!(
          "'{}' members are not allowed in {} '{}'",
          self.str(t.loc),
          kind.name(),
          self.program.name_of(owner)
        ),
      ));
    };
    let plain = AttributeQualifiers::default();
    match t.typ {
      TT::KeywordConst => {
        self.consume();
        self.parse_const(owner, scope, ext_attrs)
      }
      TT::KeywordConstructor => {
        self.consume();
        self.parse_constructor(owner, scope, ext_attrs, t.loc)
      }
      TT::KeywordStatic => {
        self.consume();
        let readonly = self.consume_if(TT::KeywordReadonly).is_match();
        if readonly || self.peek().typ == TT::KeywordAttribute {
          let q = AttributeQualifiers {
            readonly,
            is_static: true,
            ..plain
          };
          self.parse_attribute(owner, scope, ext_attrs, q)
        } else {
          self.parse_operation(owner, scope, ext_attrs, start, Vec::new(), true)
        }
      }
      TT::KeywordStringifier => {
        self.consume();
        if let Some(end) = self.consume_if(TT::Semicolon).match_loc() {
          return self.parse_anonymous_stringifier(owner, ext_attrs, Loc(start, end.1));
        };
        let readonly = self.consume_if(TT::KeywordReadonly).is_match();
        if readonly || self.peek().typ == TT::KeywordAttribute {
          let q = AttributeQualifiers {
            readonly,
            stringifier: true,
            ..plain
          };
          self.parse_attribute(owner, scope, ext_attrs, q)
        } else {
          self.parse_operation(owner, scope, ext_attrs, start, vec![Special::Stringifier], false)
        }
      }
      TT::KeywordReadonly => {
        self.consume();
        match self.peek().typ {
          TT::KeywordMaplike if kind == InterfaceKind::Interface => {
            self.consume();
            self.parse_declaration(owner, ext_attrs, start, DeclarationKind::Maplike, true)
          }
          TT::KeywordSetlike if kind == InterfaceKind::Interface => {
            self.consume();
            self.parse_declaration(owner, ext_attrs, start, DeclarationKind::Setlike, true)
          }
          _ => {
            let q = AttributeQualifiers {
              readonly: true,
              ..plain
            };
            self.parse_attribute(owner, scope, ext_attrs, q)
          }
        }
      }
      TT::KeywordAttribute => self.parse_attribute(owner, scope, ext_attrs, plain),
      TT::KeywordInherit => {
        self.consume();
        let q = AttributeQualifiers {
          inherit: true,
          ..plain
        };
        self.parse_attribute(owner, scope, ext_attrs, q)
      }
      TT::KeywordIterable => {
        self.consume();
        self.parse_declaration(owner, ext_attrs, start, DeclarationKind::Iterable, false)
      }
      TT::KeywordAsync => {
        self.consume();
        self.require(TT::KeywordIterable)?;
        self.parse_declaration(owner, ext_attrs, start, DeclarationKind::AsyncIterable, false)
      }
      TT::KeywordMaplike => {
        self.consume();
        self.parse_declaration(owner, ext_attrs, start, DeclarationKind::Maplike, false)
      }
      TT::KeywordSetlike => {
        self.consume();
        self.parse_declaration(owner, ext_attrs, start, DeclarationKind::Setlike, false)
      }
      TT::KeywordGetter | TT::KeywordSetter | TT::KeywordDeleter | TT::KeywordLegacycaller => {
        self.consume();
        let special = match t.typ {
          TT::KeywordGetter => Special::Getter,
          TT::KeywordSetter => Special::Setter,
          TT::KeywordDeleter => Special::Deleter,
          _ => Special::LegacyCaller,
        };
        self.parse_operation(owner, scope, ext_attrs, start, vec![special], false)
      }
      _ => self.parse_operation(owner, scope, ext_attrs, start, Vec::new(), false),
    }
  }

  fn add_member(&mut self, scope: ScopeId, mut member: Member, ext_attrs: ExtAttrs) -> IdlResult<Option<MemberId>> {
    member.ext_attrs = ext_attrs;
    if member.ident.name.is_empty() {
      return Ok(Some(self.program.add_member(member)));
    };
    Ok(match self.program.bind_member(scope, member)? {
      MemberBinding::Added(id) => Some(id),
      MemberBinding::Merged(_) => None,
    })
  }

  fn parse_const(&mut self, owner: DefId, scope: ScopeId, ext_attrs: ExtAttrs) -> IdlResult<Option<MemberId>> {
    let ty = self.parse_type()?;
    let ident = self.require_identifier()?;
    self.require(TT::Equals)?;
    let value = self.parse_const_value()?;
    self.require(TT::Semicolon)?;
    check_member_name(&ident)?;
    ext_attr::check(&ext_attrs, Target::Const, &ident.name)?;
    let member = Member::new(
      ident,
      owner,
      MemberKind::Const(Const {
        ty: TypeSlot::Unresolved(ty),
        value,
      }),
    );
    self.add_member(scope, member, ext_attrs)
  }

  fn parse_constructor(
    &mut self,
    owner: DefId,
    scope: ScopeId,
    ext_attrs: ExtAttrs,
    keyword: Loc,
  ) -> IdlResult<Option<MemberId>> {
    let args = self.parse_argument_list()?;
    let end = self.require(TT::Semicolon)?;
    ext_attr::check(&ext_attrs, Target::Constructor, self.program.name_of(owner))?;
    let loc = self.location(Loc(keyword.0, end.loc.1));
    let overload = Overload {
      loc: loc.clone(),
      return_type: TypeSlot::Complete(Type::Interface(owner), loc),
      args,
      specials: Vec::new(),
    };
    let member = Member::new(
      Identifier::new("constructor", self.location(keyword)),
      owner,
      MemberKind::Method(Method {
        kind: MethodKind::Constructor,
        is_static: false,
        overloads: vec![overload],
      }),
    );
    self.add_member(scope, member, ext_attrs)
  }

  fn parse_anonymous_stringifier(&mut self, owner: DefId, ext_attrs: ExtAttrs, loc: Loc) -> IdlResult<Option<MemberId>> {
    ext_attr::check(&ext_attrs, Target::Operation, "stringifier")?;
    let loc = self.location(loc);
    let overload = Overload {
      loc: loc.clone(),
      return_type: TypeSlot::builtin(BuiltinType::DomString, loc.clone()),
      args: Vec::new(),
      specials: vec![Special::Stringifier],
    };
    let mut member = Member::new(
      Identifier::new("", loc),
      owner,
      MemberKind::Method(Method {
        kind: MethodKind::Regular,
        is_static: false,
        overloads: vec![overload],
      }),
    );
    member.ext_attrs = ext_attrs;
    Ok(Some(self.program.add_member(member)))
  }

  fn parse_attribute(
    &mut self,
    owner: DefId,
    scope: ScopeId,
    ext_attrs: ExtAttrs,
    q: AttributeQualifiers,
  ) -> IdlResult<Option<MemberId>> {
    self.require(TT::KeywordAttribute)?;
    let ty = self.parse_type_with_ext_attrs()?;
    let ident = self.require_name(TT::is_attribute_name_keyword, "attribute name")?;
    self.require(TT::Semicolon)?;
    check_member_name(&ident)?;
    let attribute = Attribute {
      ty: TypeSlot::Unresolved(ty),
      readonly: q.readonly,
      inherit: q.inherit,
      is_static: q.is_static,
      stringifier: q.stringifier,
      slot_index: None,
    };
    ext_attr::check(&ext_attrs, Target::Attribute, &ident.name)?;
    ext_attr::check_attribute(&ext_attrs, &attribute, &ident)?;
    let member = Member::new(ident, owner, MemberKind::Attribute(attribute));
    self.add_member(scope, member, ext_attrs)
  }

  fn parse_operation(
    &mut self,
    owner: DefId,
    scope: ScopeId,
    ext_attrs: ExtAttrs,
    start: usize,
    specials: Vec<Special>,
    is_static: bool,
  ) -> IdlResult<Option<MemberId>> {
    let return_type = self.parse_type()?;
    let t = self.peek();
    let name = if t.typ == TT::Identifier || t.typ.is_operation_name_keyword() {
      Some(self.require_name(TT::is_operation_name_keyword, "operation name")?)
    } else if specials.is_empty() {
      return Err(self.unexpected(t, ErrorKind::ExpectedSyntax("operation name")));
    } else {
      None
    };
    let args = self.parse_argument_list()?;
    let end = self.require(TT::Semicolon)?;
    let loc = self.location(Loc(start, end.loc.1));
    let ident = match name {
      Some(ident) => {
        check_member_name(&ident)?;
        ident
      }
      None => Identifier::new("", loc.clone()),
    };
    ext_attr::check(&ext_attrs, Target::Operation, &ident.name)?;
    let overload = Overload {
      loc,
      return_type: TypeSlot::Unresolved(return_type),
      args,
      specials,
    };
    let member = Member::new(
      ident,
      owner,
      MemberKind::Method(Method {
        kind: MethodKind::Regular,
        is_static,
        overloads: vec![overload],
      }),
    );
    self.add_member(scope, member, ext_attrs)
  }

  fn parse_declaration(
    &mut self,
    owner: DefId,
    ext_attrs: ExtAttrs,
    start: usize,
    kind: DeclarationKind,
    readonly: bool,
  ) -> IdlResult<Option<MemberId>> {
    self.require(TT::ChevronLeft)?;
    let first = self.parse_type_with_ext_attrs()?;
    let second = match kind {
      DeclarationKind::Iterable | DeclarationKind::AsyncIterable => {
        if self.consume_if(TT::Comma).is_match() {
          Some(self.parse_type_with_ext_attrs()?)
        } else {
          None
        }
      }
      DeclarationKind::Maplike => {
        self.require(TT::Comma)?;
        Some(self.parse_type_with_ext_attrs()?)
      }
      DeclarationKind::Setlike => None,
    };
    self.require(TT::ChevronRight)?;
    let args = if kind == DeclarationKind::AsyncIterable && self.peek().typ == TT::ParenthesisOpen {
      self.parse_argument_list()?
    } else {
      Vec::new()
    };
    let end = self.require(TT::Semicolon)?;
    ext_attr::check(&ext_attrs, Target::Declaration, kind.keyword())?;
    let loc = self.location(Loc(start, end.loc.1));
    let (key_type, value_type) = match second {
      Some(value) => (Some(TypeSlot::Unresolved(first)), TypeSlot::Unresolved(value)),
      None => (None, TypeSlot::Unresolved(first)),
    };
    let ident = Identifier::new(format!("__{}", kind.keyword().replace(' ', "_")), loc);
    if let Some(existing) = self.program.interface(owner).and_then(|i| i.declaration) {
      return Err(
        ident
          .loc
          .error(
            ErrorKind::InvalidMember,
            format!(
              "'{}' has more than one iterable, maplike or setlike declaration",
              self.program.name_of(owner)
            ),
          )
          .with_location(&self.program.member(existing).ident.loc),
      );
    };
    let mut member = Member::new(
      ident,
      owner,
      MemberKind::Declaration(Declaration {
        kind,
        key_type,
        value_type,
        readonly,
        args,
        slot_index: None,
      }),
    );
    member.ext_attrs = ext_attrs;
    let id = self.program.add_member(member);
    if let Some(i) = self.program.interface_mut(owner) {
      i.declaration = Some(id);
    };
    Ok(Some(id))
  }
}
