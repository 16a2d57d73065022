use super::Parser;
use crate::ast::member::Member;
use crate::ast::member::MemberKind;
use crate::ast::member::Method;
use crate::ast::member::MethodKind;
use crate::ast::member::Overload;
use crate::ast::Callback;
use crate::ast::DefId;
use crate::ast::Definition;
use crate::ast::Dictionary;
use crate::ast::DictionaryMember;
use crate::ast::Enum;
use crate::ast::External;
use crate::ast::FinishState;
use crate::ast::Fragment;
use crate::ast::Identifier;
use crate::ast::Includes;
use crate::ast::Interface;
use crate::ast::InterfaceKind;
use crate::ast::Program;
use crate::ast::Typedef;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::ext_attr;
use crate::ext_attr::ExtAttrArgs;
use crate::ext_attr::ExtAttrs;
use crate::ext_attr::Target;
use crate::loc::Loc;
use crate::scope::identifier_from_source;
use crate::scope::Binding;
use crate::scope::MemberBinding;
use crate::scope::ScopeId;
use crate::token::TT;
use crate::types::Type;
use crate::types::TypeSlot;
use tracing::trace;

pub fn interface_target(kind: InterfaceKind) -> Target {
  match kind {
    InterfaceKind::Interface => Target::Interface,
    InterfaceKind::Mixin => Target::Mixin,
    InterfaceKind::Namespace => Target::Namespace,
    InterfaceKind::CallbackInterface => Target::CallbackInterface,
  }
}

impl<'a> Parser<'a> {
  /// Parses one top-level definition. Returns the definition if this created a new one; partial
  /// declarations of an existing construct and repeated external declarations return `None`.
  pub fn parse_definition(&mut self) -> IdlResult<Option<DefId>> {
    let ext_attrs = self.parse_ext_attrs()?;
    let t = self.consume();
    let start = t.loc.0;
    match t.typ {
      TT::KeywordCallback => {
        if self.consume_if(TT::KeywordInterface).is_match() {
          self.parse_interface_like(InterfaceKind::CallbackInterface, false, ext_attrs, start)
        } else {
          let constructor = self.consume_if(TT::KeywordConstructor).is_match();
          self.parse_callback(constructor, ext_attrs).map(Some)
        }
      }
      TT::KeywordInterface => {
        let kind = if self.consume_if(TT::KeywordMixin).is_match() {
          InterfaceKind::Mixin
        } else {
          InterfaceKind::Interface
        };
        self.parse_interface_like(kind, false, ext_attrs, start)
      }
      TT::KeywordNamespace => {
        self.parse_interface_like(InterfaceKind::Namespace, false, ext_attrs, start)
      }
      TT::KeywordPartial => {
        let t = self.consume();
        match t.typ {
          TT::KeywordInterface if self.consume_if(TT::KeywordMixin).is_match() => {
            self.parse_interface_like(InterfaceKind::Mixin, true, ext_attrs, start)
          }
          TT::KeywordInterface => {
            self.parse_interface_like(InterfaceKind::Interface, true, ext_attrs, start)
          }
          TT::KeywordNamespace => {
            self.parse_interface_like(InterfaceKind::Namespace, true, ext_attrs, start)
          }
          TT::KeywordDictionary => self.parse_dictionary(true, ext_attrs, start),
          _ => Err(self.unexpected(
            t,
            ErrorKind::ExpectedSyntax("interface, dictionary or namespace"),
          )),
        }
      }
      TT::KeywordDictionary => self.parse_dictionary(false, ext_attrs, start),
      TT::KeywordEnum => self.parse_enum(ext_attrs).map(Some),
      TT::KeywordTypedef => self.parse_typedef(ext_attrs).map(Some),
      TT::Identifier => self.parse_includes(t.loc, ext_attrs).map(Some),
      _ => Err(self.unexpected(t, ErrorKind::ExpectedSyntax("definition"))),
    }
  }

  /// Finds the construct a declaration named `ident` continues, or creates it.
  fn declare<F: FnOnce(&mut Definition) -> bool, N: FnOnce(&mut Program) -> Definition>(
    &mut self,
    ident: &Identifier,
    continues: F,
    create: N,
  ) -> IdlResult<(DefId, bool)> {
    match self.program.scopes.lookup(ScopeId::GLOBAL, &ident.name) {
      Some(Binding::Def(existing)) => {
        if continues(self.program.def_mut(existing)) {
          return Ok((existing, false));
        };
        Err(self.program.definition_conflict(ident))
      }
      Some(_) => Err(self.program.definition_conflict(ident)),
      None => {
        let def = create(&mut *self.program);
        let id = self.program.add_def(def);
        self.program.bind_definition(ident, id)?;
        Ok((id, true))
      }
    }
  }

  fn parse_interface_like(
    &mut self,
    kind: InterfaceKind,
    partial: bool,
    ext_attrs: ExtAttrs,
    start: usize,
  ) -> IdlResult<Option<DefId>> {
    let ident = self.require_identifier()?;
    if kind == InterfaceKind::Interface && !partial && self.consume_if(TT::Semicolon).is_match() {
      return self.declare_external(ident, ext_attrs);
    };
    let parent_name = if kind == InterfaceKind::Interface && !partial && self.consume_if(TT::Colon).is_match() {
      Some(self.require_identifier()?)
    } else {
      None
    };
    self.require(TT::BraceOpen)?;
    let (id, created) = self.declare(
      &ident,
      |def| match def {
        Definition::Interface(i) if i.kind == kind => {
          if partial {
            return true;
          };
          if i.declared {
            return false;
          };
          // A partial was seen first; this is the real declaration.
          i.declared = true;
          i.ident = ident.clone();
          i.parent_name = parent_name.clone();
          true
        }
        _ => false,
      },
      |program| {
        let scope = program.scopes.add(&ident.name, ScopeId::GLOBAL);
        let mut i = Interface::new(kind, ident.clone(), scope);
        i.declared = !partial;
        i.parent_name = parent_name.clone();
        Definition::Interface(i)
      },
    )?;
    let scope = self.program.interface(id).map_or(ScopeId::GLOBAL, |i| i.scope);
    let mut members = Vec::new();
    while !self.consume_if(TT::BraceClose).is_match() {
      if let Some(m) = self.parse_interface_member(id, kind, scope)? {
        members.push(m);
      };
    }
    let end = self.require(TT::Semicolon)?;
    let loc = self.location(Loc(start, end.loc.1));
    trace!(name = ident.name.as_str(), partial, members = members.len(), "parsed {}", kind.name());
    if partial {
      ext_attr::check_partial(&ext_attrs, interface_target(kind), &ident.name)?;
      if let Some(i) = self.program.interface_mut(id) {
        i.partials.push(Fragment {
          loc,
          members,
          ext_attrs,
        });
      };
    } else {
      if let Some(i) = self.program.interface_mut(id) {
        i.members.extend(members);
      };
      self.attach_interface_attrs(id, kind, ext_attrs)?;
    };
    Ok(created.then_some(id))
  }

  fn declare_external(&mut self, ident: Identifier, ext_attrs: ExtAttrs) -> IdlResult<Option<DefId>> {
    if let Some(attr) = ext_attrs.iter().next() {
      return Err(attr.error(format!(
        "Extended attributes are not allowed on external interface '{}'",
        ident.name
      )));
    };
    let (id, created) = self.declare(
      &ident,
      |def| matches!(def, Definition::External(_)),
      |_| Definition::External(External { ident: ident.clone() }),
    )?;
    Ok(created.then_some(id))
  }

  fn attach_interface_attrs(&mut self, id: DefId, kind: InterfaceKind, ext_attrs: ExtAttrs) -> IdlResult<()> {
    let name = self.program.name_of(id).to_string();
    ext_attr::check(&ext_attrs, interface_target(kind), &name)?;
    let mut factories = Vec::new();
    for attr in ext_attrs.iter() {
      let ExtAttrArgs::NamedArgs(factory, args) = &attr.args else {
        continue;
      };
      let ident = identifier_from_source(factory, attr.loc.clone())?;
      let overload = Overload {
        loc: attr.loc.clone(),
        return_type: TypeSlot::Complete(Type::Interface(id), attr.loc.clone()),
        args: args.clone(),
        specials: Vec::new(),
      };
      let member = Member::new(
        ident,
        id,
        MemberKind::Method(Method {
          kind: MethodKind::LegacyFactoryFunction,
          is_static: false,
          overloads: vec![overload],
        }),
      );
      let m = match self.program.bind_member(ScopeId::GLOBAL, member)? {
        MemberBinding::Added(m) | MemberBinding::Merged(m) => m,
      };
      if !factories.contains(&m) {
        factories.push(m);
      };
    }
    let global_names = match ext_attrs.get("Global").map(|a| &a.args) {
      Some(ExtAttrArgs::Value(v)) => vec![v.clone()],
      Some(ExtAttrArgs::List(vs)) => vs.clone(),
      Some(_) => vec![name.clone()],
      None => Vec::new(),
    };
    for g in global_names.iter() {
      self.program.scopes.add_global_name(g, &name);
    }
    if let Some(i) = self.program.interface_mut(id) {
      i.legacy_factory_functions = factories;
      i.global_names = global_names;
      i.ext_attrs = ext_attrs;
    };
    Ok(())
  }

  fn parse_dictionary(&mut self, partial: bool, ext_attrs: ExtAttrs, start: usize) -> IdlResult<Option<DefId>> {
    let ident = self.require_identifier()?;
    let parent_name = if !partial && self.consume_if(TT::Colon).is_match() {
      Some(self.require_identifier()?)
    } else {
      None
    };
    self.require(TT::BraceOpen)?;
    let mut members = Vec::new();
    while !self.consume_if(TT::BraceClose).is_match() {
      members.push(self.parse_dictionary_member()?);
    }
    let end = self.require(TT::Semicolon)?;
    let loc = self.location(Loc(start, end.loc.1));
    if partial {
      ext_attr::check_partial(&ext_attrs, Target::Dictionary, &ident.name)?;
    } else {
      ext_attr::check(&ext_attrs, Target::Dictionary, &ident.name)?;
    };
    let (id, created) = self.declare(
      &ident,
      |def| match def {
        Definition::Dictionary(d) => {
          if partial {
            return true;
          };
          if d.declared {
            return false;
          };
          d.declared = true;
          d.ident = ident.clone();
          d.parent_name = parent_name.clone();
          true
        }
        _ => false,
      },
      |_| {
        Definition::Dictionary(Dictionary {
          ident: ident.clone(),
          declared: !partial,
          parent_name: parent_name.clone(),
          parent: None,
          members: Vec::new(),
          partials: Vec::new(),
          ext_attrs: ExtAttrs::default(),
          state: FinishState::Unfinished,
        })
      },
    )?;
    if let Some(d) = self.program.dictionary_mut(id) {
      if partial {
        d.partials.push(Fragment {
          loc,
          members,
          ext_attrs,
        });
      } else {
        d.members.extend(members);
        d.ext_attrs = ext_attrs;
      };
    };
    Ok(created.then_some(id))
  }

  fn parse_dictionary_member(&mut self) -> IdlResult<DictionaryMember> {
    let mut ext_attrs = self.parse_ext_attrs()?;
    let required = self.consume_if(TT::KeywordRequired).is_match();
    let mut ty = if required {
      self.parse_type_with_ext_attrs()?
    } else {
      self.parse_type()?
    };
    let ident = self.require_identifier()?;
    let default = if self.consume_if(TT::Equals).is_match() {
      Some(self.parse_default_value()?)
    } else {
      None
    };
    self.require(TT::Semicolon)?;
    ty.attrs = ty.attrs.union(ext_attrs.take_type_attrs());
    ext_attr::check(&ext_attrs, Target::DictionaryMember, &ident.name)?;
    Ok(DictionaryMember {
      ident,
      ty: TypeSlot::Unresolved(ty),
      required,
      default,
      ext_attrs,
    })
  }

  fn parse_enum(&mut self, ext_attrs: ExtAttrs) -> IdlResult<DefId> {
    let ident = self.require_identifier()?;
    ext_attr::check(&ext_attrs, Target::Enum, &ident.name)?;
    self.require(TT::BraceOpen)?;
    let mut values: Vec<(String, Loc)> = Vec::new();
    loop {
      let t = self.require(TT::LiteralString)?;
      let raw = self.str(t.loc);
      let value = raw[1..raw.len() - 1].to_string();
      if let Some((_, first)) = values.iter().find(|(v, _)| *v == value) {
        return Err(
          self
            .location(t.loc)
            .error(
              ErrorKind::DuplicateIdentifier,
              format!("Enum '{}' has duplicate value \"{}\"", ident.name, value),
            )
            .with_location(&self.location(*first)),
        );
      };
      values.push((value, t.loc));
      if !self.consume_if(TT::Comma).is_match() || self.peek().typ == TT::BraceClose {
        break;
      };
    }
    self.require(TT::BraceClose)?;
    self.require(TT::Semicolon)?;
    let (id, _) = self.declare(
      &ident,
      |_| false,
      |_| {
        Definition::Enum(Enum {
          ident: ident.clone(),
          values: values.into_iter().map(|(v, _)| v).collect(),
          ext_attrs,
        })
      },
    )?;
    Ok(id)
  }

  fn parse_typedef(&mut self, ext_attrs: ExtAttrs) -> IdlResult<DefId> {
    let ty = self.parse_type_with_ext_attrs()?;
    let ident = self.require_identifier()?;
    self.require(TT::Semicolon)?;
    ext_attr::check(&ext_attrs, Target::Typedef, &ident.name)?;
    let (id, _) = self.declare(
      &ident,
      |_| false,
      |_| {
        Definition::Typedef(Typedef {
          ident: ident.clone(),
          ty: TypeSlot::Unresolved(ty),
          state: FinishState::Unfinished,
        })
      },
    )?;
    Ok(id)
  }

  fn parse_callback(&mut self, constructor: bool, ext_attrs: ExtAttrs) -> IdlResult<DefId> {
    let ident = self.require_identifier()?;
    self.require(TT::Equals)?;
    let return_type = self.parse_type()?;
    let args = self.parse_argument_list()?;
    self.require(TT::Semicolon)?;
    ext_attr::check(&ext_attrs, Target::Callback, &ident.name)?;
    let (id, _) = self.declare(
      &ident,
      |_| false,
      |_| {
        Definition::Callback(Callback {
          ident: ident.clone(),
          constructor,
          return_type: TypeSlot::Unresolved(return_type),
          args,
          ext_attrs,
          state: FinishState::Unfinished,
        })
      },
    )?;
    Ok(id)
  }

  fn parse_includes(&mut self, first: Loc, ext_attrs: ExtAttrs) -> IdlResult<DefId> {
    let interface = identifier_from_source(self.str(first), self.location(first))?;
    self.require(TT::KeywordIncludes)?;
    let mixin = self.require_identifier()?;
    let end = self.require(TT::Semicolon)?;
    ext_attr::check(&ext_attrs, Target::Includes, &interface.name)?;
    Ok(self.program.add_def(Definition::Includes(Includes {
      loc: self.location(Loc(first.0, end.loc.1)),
      interface,
      mixin,
      state: FinishState::Unfinished,
    })))
  }
}
