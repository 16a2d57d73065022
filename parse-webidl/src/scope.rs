//! Name scopes and the binding rules for definitions and members.
//!
//! The global scope holds definitions plus built-in type names. Each interface-like definition
//! gets a child scope for its members. Every name may be bound once per scope;
//! re-declaring a name is either merged (operation overloads, legacy factory functions) or raised
//! with the locations of both declarations.
use crate::ast::member::Member;
use crate::ast::member::MemberKind;
use crate::ast::DefId;
use crate::ast::Identifier;
use crate::ast::MemberId;
use crate::ast::Program;
use crate::builtins::BuiltinType;
use crate::builtins::BUILTIN_NAMES;
use crate::builtins::BUILTIN_TYPEDEFS;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::loc::Location;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
  pub const GLOBAL: ScopeId = ScopeId(0);

  pub fn raw(self) -> u32 {
    self.0
  }

  pub fn from_raw(raw: u32) -> Self {
    ScopeId(raw)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
  Builtin(BuiltinType),
  /// A built-in typedef for a union of buffer types.
  BuiltinUnion(&'static [BuiltinType]),
  Def(DefId),
  Member(MemberId),
}

#[derive(Clone, Debug)]
pub struct ScopeData {
  pub name: String,
  pub parent: Option<ScopeId>,
  pub bindings: BTreeMap<String, Binding>,
}

/// Result of binding a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberBinding {
  Added(MemberId),
  /// The member was an overload of an existing method and was merged into it.
  Merged(MemberId),
}

impl MemberBinding {
  pub fn id(self) -> MemberId {
    match self {
      MemberBinding::Added(id) | MemberBinding::Merged(id) => id,
    }
  }
}

#[derive(Clone, Debug)]
pub struct Scopes {
  data: Vec<ScopeData>,
  /// Global names declared by `[Global]` interfaces, mapped to the interfaces declaring them.
  global_names: BTreeMap<String, BTreeSet<String>>,
}

impl Scopes {
  pub fn new(primary_global: &str) -> Scopes {
    let mut global = ScopeData {
      name: "::".into(),
      parent: None,
      bindings: BTreeMap::new(),
    };
    for (name, b) in BUILTIN_NAMES.iter() {
      global.bindings.insert(name.to_string(), Binding::Builtin(*b));
    }
    for (name, members) in BUILTIN_TYPEDEFS.iter() {
      global
        .bindings
        .insert(name.to_string(), Binding::BuiltinUnion(members));
    }
    let mut scopes = Scopes {
      data: vec![global],
      global_names: BTreeMap::new(),
    };
    scopes.add_global_name(primary_global, primary_global);
    scopes
  }

  pub fn add(&mut self, name: &str, parent: ScopeId) -> ScopeId {
    let id = ScopeId(self.data.len() as u32);
    self.data.push(ScopeData {
      name: name.into(),
      parent: Some(parent),
      bindings: BTreeMap::new(),
    });
    id
  }

  pub fn get(&self, id: ScopeId) -> &ScopeData {
    &self.data[id.0 as usize]
  }

  /// Looks up a name bound directly in `scope`.
  pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<Binding> {
    self.get(scope).bindings.get(name).copied()
  }

  fn bind(&mut self, scope: ScopeId, name: &str, binding: Binding) {
    self.data[scope.0 as usize]
      .bindings
      .insert(name.to_string(), binding);
  }

  pub fn add_global_name(&mut self, global_name: &str, interface: &str) {
    self
      .global_names
      .entry(global_name.to_string())
      .or_default()
      .insert(interface.to_string());
  }

  pub fn is_global_name(&self, name: &str) -> bool {
    self.global_names.contains_key(name)
  }

  /// Interfaces declaring the global name.
  pub fn global_name_owners(&self, name: &str) -> Option<&BTreeSet<String>> {
    self.global_names.get(name)
  }

  pub fn global_names(&self) -> impl Iterator<Item = &str> + '_ {
    self.global_names.keys().map(|n| n.as_str())
  }
}

fn conflict(name: &str, scope: &str, new: &Location, existing: &Location) -> crate::error::WebIdlError {
  new
    .error(
      ErrorKind::DuplicateIdentifier,
      format!(
        "Multiple unresolvable definitions of identifier '{}' in scope '{}'",
        name, scope
      ),
    )
    .with_location(existing)
}

impl Program {
  fn binding_location(&self, binding: Binding) -> Option<&Location> {
    match binding {
      Binding::Def(id) => Some(&self.def(id).ident().loc),
      Binding::Member(id) => Some(&self.member(id).ident.loc),
      Binding::Builtin(_) | Binding::BuiltinUnion(_) => None,
    }
  }

  fn bound_conflict(&self, scope: ScopeId, ident: &Identifier, existing: Binding) -> crate::error::WebIdlError {
    let scope_name = &self.scopes.get(scope).name;
    match self.binding_location(existing) {
      Some(loc) => conflict(&ident.name, scope_name, &ident.loc, loc),
      None => ident.loc.error(
        ErrorKind::DuplicateIdentifier,
        format!("'{}' is a built-in type and cannot be redeclared", ident.name),
      ),
    }
  }

  /// The error for a definition named like something already in the global scope.
  pub(crate) fn definition_conflict(&self, ident: &Identifier) -> crate::error::WebIdlError {
    match self.scopes.lookup(ScopeId::GLOBAL, &ident.name) {
      Some(existing) => self.bound_conflict(ScopeId::GLOBAL, ident, existing),
      None => ident.loc.error(
        ErrorKind::DuplicateIdentifier,
        format!("Conflicting declarations of '{}'", ident.name),
      ),
    }
  }

  /// Binds a top-level definition's name in the global scope.
  pub(crate) fn bind_definition(&mut self, ident: &Identifier, id: DefId) -> IdlResult<()> {
    if self.scopes.lookup(ScopeId::GLOBAL, &ident.name).is_some() {
      return Err(self.definition_conflict(ident));
    };
    trace!(name = ident.name.as_str(), "bind definition");
    self.scopes.bind(ScopeId::GLOBAL, &ident.name, Binding::Def(id));
    Ok(())
  }

  /// Binds a member in `scope`, merging it into an existing method when it is another overload.
  pub(crate) fn bind_member(&mut self, scope: ScopeId, member: Member) -> IdlResult<MemberBinding> {
    let existing = match self.scopes.lookup(scope, &member.ident.name) {
      None => {
        let name = member.ident.name.clone();
        let id = self.add_member(member);
        self.scopes.bind(scope, &name, Binding::Member(id));
        return Ok(MemberBinding::Added(id));
      }
      Some(Binding::Member(existing)) => existing,
      Some(other) => return Err(self.bound_conflict(scope, &member.ident, other)),
    };
    let mergeable = {
      let current = self.member(existing);
      match (&current.kind, &member.kind) {
        (MemberKind::Method(a), MemberKind::Method(b)) => {
          a.kind == b.kind && a.is_static == b.is_static
        }
        _ => false,
      }
    };
    if !mergeable {
      return Err(self.bound_conflict(scope, &member.ident, Binding::Member(existing)));
    };
    if member.ext_attrs.has("LenientFloat") {
      return Err(member.ident.loc.error(
        ErrorKind::InvalidExtendedAttribute,
        "[LenientFloat] used on an overloaded operation",
      ));
    };
    trace!(name = member.ident.name.as_str(), "merge overload");
    self.member_mut(existing).absorb_overloads(member);
    Ok(MemberBinding::Merged(existing))
  }
}

/// Converts a name as written into an identifier: one leading underscore is removed, and names
/// starting with a double underscore are reserved.
pub fn identifier_from_source(raw: &str, loc: Location) -> IdlResult<Identifier> {
  if raw.starts_with("__") {
    return Err(loc.error(
      ErrorKind::ReservedIdentifier,
      format!("Identifiers beginning with __ are reserved: {}", raw),
    ));
  };
  let name = raw.strip_prefix('_').unwrap_or(raw);
  Ok(Identifier::new(name, loc))
}

/// Member names that cannot be declared since they would clash with language built-ins.
pub fn check_member_name(ident: &Identifier) -> IdlResult<()> {
  if matches!(ident.name.as_str(), "constructor" | "toString") {
    return Err(ident.loc.error(
      ErrorKind::ReservedIdentifier,
      format!("Cannot use reserved identifier '{}'", ident.name),
    ));
  };
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::loc::Loc;
  use crate::loc::SourceFile;

  fn loc(start: usize) -> Location {
    Location::new(SourceFile::new("t.webidl", "interface A {};"), Loc(start, start + 1))
  }

  #[test]
  fn leading_underscore_is_stripped_once() {
    assert_eq!(identifier_from_source("_interface", loc(0)).unwrap().name, "interface");
    assert_eq!(identifier_from_source("plain", loc(0)).unwrap().name, "plain");
    let err = identifier_from_source("__proto", loc(0)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReservedIdentifier);
  }

  #[test]
  fn reserved_member_names() {
    assert!(check_member_name(&Identifier::new("toString", loc(0))).is_err());
    assert!(check_member_name(&Identifier::new("constructor", loc(0))).is_err());
    assert!(check_member_name(&Identifier::new("toJSON", loc(0))).is_ok());
  }

  #[test]
  fn builtins_are_pre_bound() {
    let scopes = Scopes::new("Window");
    assert_eq!(
      scopes.lookup(ScopeId::GLOBAL, "Uint8Array"),
      Some(Binding::Builtin(BuiltinType::Uint8Array)),
    );
    assert!(matches!(
      scopes.lookup(ScopeId::GLOBAL, "BufferSource"),
      Some(Binding::BuiltinUnion(_)),
    ));
    assert!(scopes.is_global_name("Window"));
    assert!(!scopes.is_global_name("Worker"));
  }

  #[test]
  fn child_scopes_are_independent() {
    let mut scopes = Scopes::new("Window");
    let a = scopes.add("A", ScopeId::GLOBAL);
    let b = scopes.add("B", ScopeId::GLOBAL);
    scopes.bind(a, "x", Binding::Member(MemberId::from_raw(0)));
    assert!(scopes.lookup(b, "x").is_none());
    assert_eq!(scopes.get(a).parent, Some(ScopeId::GLOBAL));
  }
}
