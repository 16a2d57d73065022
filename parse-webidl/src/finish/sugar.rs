//! Expansion of `iterable`, `async iterable`, `maplike` and `setlike` declarations into ordinary
//! members, and synthesis of iterator interfaces.
use crate::ast::member::Argument;
use crate::ast::member::Attribute;
use crate::ast::member::Declaration;
use crate::ast::member::DeclarationKind;
use crate::ast::member::Member;
use crate::ast::member::MemberKind;
use crate::ast::member::Method;
use crate::ast::member::MethodKind;
use crate::ast::member::Overload;
use crate::ast::DefId;
use crate::ast::Definition;
use crate::ast::Identifier;
use crate::ast::Interface;
use crate::ast::InterfaceKind;
use crate::ast::MemberId;
use crate::ast::Program;
use crate::builtins::BuiltinType;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::ext_attr::ExtAttr;
use crate::ext_attr::ExtAttrArgs;
use crate::ext_attr::ExtAttrs;
use crate::loc::Location;
use crate::scope::Binding;
use crate::scope::ScopeId;
use crate::types::Type;
use crate::types::TypeSlot;
use tracing::debug;

/// Generated methods an interface may declare itself, in which case its own declaration is kept.
const OVERRIDABLE: &[&str] = &["set", "add", "delete", "clear"];

/// How a generated member is annotated.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Effect {
  /// Reads state without changing it.
  Query,
  /// Returns a fresh object on every call.
  Fresh,
  Mutation,
}

fn ext_attrs(effect: Effect, loc: &Location) -> ExtAttrs {
  let attr = |name: &str, args: ExtAttrArgs| ExtAttr {
    name: name.into(),
    loc: loc.clone(),
    args,
  };
  let affects_nothing = attr("Affects", ExtAttrArgs::Value("Nothing".into()));
  match effect {
    Effect::Query => ExtAttrs::new(vec![affects_nothing]),
    Effect::Fresh => ExtAttrs::new(vec![affects_nothing, attr("NewObject", ExtAttrArgs::None)]),
    Effect::Mutation => ExtAttrs::default(),
  }
}

fn arg(name: &str, ty: Type, optional: bool, loc: &Location) -> Argument {
  Argument {
    ident: Identifier::new(name, loc.clone()),
    ty: TypeSlot::Complete(ty, loc.clone()),
    optional,
    variadic: false,
    default: None,
    ext_attrs: ExtAttrs::default(),
  }
}

fn builtin(b: BuiltinType) -> Type {
  Type::Builtin(b)
}

/// Builds members generated for the declaration `decl` on `owner`.
struct Generator<'a> {
  owner: DefId,
  decl: MemberId,
  loc: &'a Location,
}

impl<'a> Generator<'a> {
  fn method(&self, name: &str, ret: Type, args: Vec<Argument>, effect: Effect) -> Member {
    let overload = Overload {
      loc: self.loc.clone(),
      return_type: TypeSlot::Complete(ret, self.loc.clone()),
      args,
      specials: Vec::new(),
    };
    let mut member = Member::new(
      Identifier::new(name, self.loc.clone()),
      self.owner,
      MemberKind::Method(Method {
        kind: MethodKind::Regular,
        is_static: false,
        overloads: vec![overload],
      }),
    );
    member.generated_by = Some(self.decl);
    member.ext_attrs = ext_attrs(effect, self.loc);
    member
  }

  fn size(&self) -> Member {
    let mut member = Member::new(
      Identifier::new("size", self.loc.clone()),
      self.owner,
      MemberKind::Attribute(Attribute {
        ty: TypeSlot::builtin(BuiltinType::UnsignedLong, self.loc.clone()),
        readonly: true,
        inherit: false,
        is_static: false,
        stringifier: false,
        slot_index: None,
      }),
    );
    member.generated_by = Some(self.decl);
    member.ext_attrs = ext_attrs(Effect::Query, self.loc);
    member
  }

  fn for_each(&self) -> Member {
    let args = vec![
      arg("callback", builtin(BuiltinType::Object), false, self.loc),
      arg("thisArg", builtin(BuiltinType::Any), true, self.loc),
    ];
    self.method("forEach", builtin(BuiltinType::Undefined), args, Effect::Query)
  }

  fn iteration(&self, names: &[&str], args: &[Argument]) -> Vec<Member> {
    names
      .iter()
      .map(|n| self.method(n, builtin(BuiltinType::Object), args.to_vec(), Effect::Fresh))
      .collect()
  }

  /// Every member the declaration expands to, in a fixed order.
  fn expand(&self, d: &Declaration, key: Option<Type>, value: Type) -> Vec<Member> {
    let l = self.loc;
    let mut out = Vec::new();
    match d.kind {
      DeclarationKind::Iterable => {
        out.extend(self.iteration(&["entries", "keys", "values"], &[]));
        out.push(self.for_each());
      }
      DeclarationKind::AsyncIterable => {
        let names: &[&str] = if key.is_some() {
          &["entries", "keys", "values"]
        } else {
          &["values"]
        };
        out.extend(self.iteration(names, &d.args));
      }
      DeclarationKind::Maplike => {
        let key = key.unwrap_or_else(|| builtin(BuiltinType::Any));
        out.push(self.size());
        out.extend(self.iteration(&["entries", "keys", "values"], &[]));
        out.push(self.for_each());
        let key_arg = || vec![arg("key", key.clone(), false, l)];
        out.push(self.method("get", builtin(BuiltinType::Any), key_arg(), Effect::Query));
        out.push(self.method("has", builtin(BuiltinType::Boolean), key_arg(), Effect::Query));
        if !d.readonly {
          let entry = vec![arg("key", key.clone(), false, l), arg("value", value, false, l)];
          out.push(self.method("set", builtin(BuiltinType::Object), entry, Effect::Mutation));
          out.push(self.method("delete", builtin(BuiltinType::Boolean), key_arg(), Effect::Mutation));
          out.push(self.method("clear", builtin(BuiltinType::Undefined), Vec::new(), Effect::Mutation));
        };
      }
      DeclarationKind::Setlike => {
        out.push(self.size());
        out.extend(self.iteration(&["entries", "keys", "values"], &[]));
        out.push(self.for_each());
        let value_arg = || vec![arg("value", value.clone(), false, l)];
        out.push(self.method("has", builtin(BuiltinType::Boolean), value_arg(), Effect::Query));
        if !d.readonly {
          out.push(self.method("add", builtin(BuiltinType::Object), value_arg(), Effect::Mutation));
          out.push(self.method("delete", builtin(BuiltinType::Boolean), value_arg(), Effect::Mutation));
          out.push(self.method("clear", builtin(BuiltinType::Undefined), Vec::new(), Effect::Mutation));
        };
      }
    };
    out
  }
}

impl Program {
  /// Adds the members generated by an interface's declaration.
  pub(super) fn expand_declaration(&mut self, id: DefId) -> IdlResult<()> {
    let Some((scope, decl_id)) = self.interface(id).and_then(|i| Some((i.scope, i.declaration?))) else {
      return Ok(());
    };
    let decl = self.member(decl_id).clone();
    let Some(d) = decl.as_declaration() else {
      return Ok(());
    };
    let Some(value) = d.value_type.completed().cloned() else {
      return Ok(());
    };
    let key = d.key_type.as_ref().and_then(|k| k.completed()).cloned();
    let generator = Generator {
      owner: id,
      decl: decl_id,
      loc: &decl.ident.loc,
    };
    let mut added = Vec::new();
    for member in generator.expand(d, key, value) {
      match self.scopes.lookup(scope, &member.ident.name) {
        None => added.push(self.bind_member(scope, member)?.id()),
        Some(Binding::Member(existing))
          if OVERRIDABLE.contains(&member.ident.name.as_str())
            && self.member(existing).as_method().is_some() => {}
        Some(existing) => {
          let mut err = decl.ident.loc.error(
            ErrorKind::InvalidMember,
            format!(
              "'{}' declares '{}', which conflicts with the member generated by its {} declaration",
              self.name_of(id),
              member.ident.name,
              d.kind.keyword()
            ),
          );
          if let Binding::Member(e) = existing {
            err = err.with_location(&self.member(e).ident.loc);
          };
          return Err(err);
        }
      };
    }
    debug!(
      interface = self.name_of(id),
      declaration = d.kind.keyword(),
      generated = added.len(),
      "expanded declaration"
    );
    if let Some(i) = self.interface_mut(id) {
      i.members.extend(added);
    };
    Ok(())
  }

  /// Creates the iterator interface of every pair iterable and async iterable, placed directly
  /// after the interface it iterates.
  pub(super) fn synthesize_iterators(&mut self) -> IdlResult<()> {
    for id in self.order.clone() {
      let Some(i) = self.interface(id) else {
        continue;
      };
      if i.kind != InterfaceKind::Interface || i.iterator.is_some() {
        continue;
      };
      let Some(decl_id) = i.declaration else {
        continue;
      };
      let decl = self.member(decl_id);
      let Some(d) = decl.as_declaration() else {
        continue;
      };
      let suffix = match d.kind {
        DeclarationKind::Iterable if d.is_pair_iterator() => "Iterator",
        DeclarationKind::AsyncIterable => "AsyncIterator",
        _ => continue,
      };
      let name = format!("{}{}", i.ident.name, suffix);
      let loc = decl.ident.loc.clone();
      let is_async = d.kind == DeclarationKind::AsyncIterable;
      let return_method = decl.ext_attrs.has("GenerateReturnMethod");
      let ident = Identifier::new(name.as_str(), loc.clone());
      if self.find(&name).is_some() {
        return Err(self.definition_conflict(&ident));
      };

      let scope = self.scopes.add(&name, ScopeId::GLOBAL);
      let mut iface = Interface::new(InterfaceKind::Interface, ident.clone(), scope);
      iface.declared = true;
      iface.iterator_of = Some(id);
      iface.ext_attrs = ExtAttrs::new(vec![ExtAttr {
        name: "LegacyNoInterfaceObject".into(),
        loc: loc.clone(),
        args: ExtAttrArgs::None,
      }]);
      let iterator = self.insert_def_after(Definition::Interface(iface), id);
      self.bind_definition(&ident, iterator)?;

      let generator = Generator {
        owner: iterator,
        decl: decl_id,
        loc: &loc,
      };
      let promise_any = Type::Promise(Box::new(builtin(BuiltinType::Any)));
      let mut members = Vec::new();
      if is_async {
        members.push(generator.method("next", promise_any.clone(), Vec::new(), Effect::Mutation));
        if return_method {
          let value = vec![arg("value", builtin(BuiltinType::Any), true, &loc)];
          members.push(generator.method("return", promise_any, value, Effect::Mutation));
        };
      } else {
        members.push(generator.method("next", builtin(BuiltinType::Object), Vec::new(), Effect::Mutation));
      };
      let mut ids = Vec::new();
      for member in members {
        ids.push(self.bind_member(scope, member)?.id());
      }
      if let Some(it) = self.interface_mut(iterator) {
        it.members = ids;
      };
      if let Some(owner) = self.interface_mut(id) {
        owner.iterator = Some(iterator);
      };
      debug!(
        interface = self.name_of(id),
        iterator = name.as_str(),
        "synthesized iterator interface"
      );
    }
    Ok(())
  }
}
