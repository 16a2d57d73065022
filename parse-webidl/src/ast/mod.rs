//! The definitions arena.
//!
//! Every top-level construct lives in [`Program::defs`] and is referred to by [`DefId`]; every
//! interface-like member lives in [`Program::members`] and is referred to by [`MemberId`]. Links
//! between constructs (parents, included mixins, iterator interfaces, member owners) are ids, so
//! the graph may contain cycles without shared ownership. Ids are never reused, and
//! [`Program::order`] records the source order of definitions that callers observe.
use crate::ext_attr::ExtAttrs;
use crate::loc::Location;
use crate::options::ParserOptions;
use crate::scope::ScopeId;
use crate::scope::Scopes;
use crate::types::TypeSlot;
use member::Argument;
use member::Member;
use serde::Serialize;
use std::collections::BTreeSet;
use value::Value;

pub mod member;
pub mod value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DefId(u32);

impl DefId {
  pub fn raw(self) -> u32 {
    self.0
  }

  pub fn from_raw(raw: u32) -> Self {
    DefId(raw)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MemberId(u32);

impl MemberId {
  pub fn raw(self) -> u32 {
    self.0
  }

  pub fn from_raw(raw: u32) -> Self {
    MemberId(raw)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FinishState {
  Unfinished,
  Finishing,
  Finished,
}

/// A name as written in the source, with one leading underscore removed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Identifier {
  pub name: String,
  pub loc: Location,
}

impl Identifier {
  pub fn new(name: impl Into<String>, loc: Location) -> Identifier {
    Identifier {
      name: name.into(),
      loc,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum InterfaceKind {
  Interface,
  Mixin,
  Namespace,
  CallbackInterface,
}

impl InterfaceKind {
  pub fn name(self) -> &'static str {
    match self {
      InterfaceKind::Interface => "interface",
      InterfaceKind::Mixin => "interface mixin",
      InterfaceKind::Namespace => "namespace",
      InterfaceKind::CallbackInterface => "callback interface",
    }
  }
}

/// A `partial` block awaiting merge into its target.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Fragment<M> {
  pub loc: Location,
  pub members: Vec<M>,
  pub ext_attrs: ExtAttrs,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Interface {
  pub kind: InterfaceKind,
  pub ident: Identifier,
  /// False while only partial declarations have been seen.
  pub declared: bool,
  pub parent_name: Option<Identifier>,
  pub parent: Option<DefId>,
  pub members: Vec<MemberId>,
  pub mixins: Vec<DefId>,
  pub partials: Vec<Fragment<MemberId>>,
  pub ext_attrs: ExtAttrs,
  #[serde(skip)]
  pub scope: ScopeId,
  pub exposure: BTreeSet<String>,
  /// Names declared by `[Global]`.
  pub global_names: Vec<String>,
  pub legacy_factory_functions: Vec<MemberId>,
  /// The `iterable`, `async iterable`, `maplike` or `setlike` declaration.
  pub declaration: Option<MemberId>,
  /// The synthesized iterator interface for an iterable or async iterable declaration.
  pub iterator: Option<DefId>,
  /// Set on synthesized iterator interfaces: the interface they iterate.
  pub iterator_of: Option<DefId>,
  pub total_slots: u32,
  pub on_global_proto_chain: bool,
  pub state: FinishState,
}

impl Interface {
  pub fn new(kind: InterfaceKind, ident: Identifier, scope: ScopeId) -> Interface {
    Interface {
      kind,
      ident,
      declared: false,
      parent_name: None,
      parent: None,
      members: Vec::new(),
      mixins: Vec::new(),
      partials: Vec::new(),
      ext_attrs: ExtAttrs::default(),
      scope,
      exposure: BTreeSet::new(),
      global_names: Vec::new(),
      legacy_factory_functions: Vec::new(),
      declaration: None,
      iterator: None,
      iterator_of: None,
      total_slots: 0,
      on_global_proto_chain: false,
      state: FinishState::Unfinished,
    }
  }

  pub fn is_global(&self) -> bool {
    self.ext_attrs.has("Global")
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DictionaryMember {
  pub ident: Identifier,
  pub ty: TypeSlot,
  pub required: bool,
  pub default: Option<Value>,
  pub ext_attrs: ExtAttrs,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dictionary {
  pub ident: Identifier,
  pub declared: bool,
  pub parent_name: Option<Identifier>,
  pub parent: Option<DefId>,
  pub members: Vec<DictionaryMember>,
  pub partials: Vec<Fragment<DictionaryMember>>,
  pub ext_attrs: ExtAttrs,
  pub state: FinishState,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Enum {
  pub ident: Identifier,
  pub values: Vec<String>,
  pub ext_attrs: ExtAttrs,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Typedef {
  pub ident: Identifier,
  pub ty: TypeSlot,
  pub state: FinishState,
}

/// A callback function, or a callback constructor when `constructor` is set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Callback {
  pub ident: Identifier,
  pub constructor: bool,
  pub return_type: TypeSlot,
  pub args: Vec<Argument>,
  pub ext_attrs: ExtAttrs,
  pub state: FinishState,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Includes {
  pub loc: Location,
  pub interface: Identifier,
  pub mixin: Identifier,
  pub state: FinishState,
}

/// A forward declaration `interface Foo;` naming an interface defined elsewhere.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct External {
  pub ident: Identifier,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Definition {
  Interface(Interface),
  Dictionary(Dictionary),
  Enum(Enum),
  Typedef(Typedef),
  Callback(Callback),
  Includes(Includes),
  External(External),
}

impl Definition {
  pub fn ident(&self) -> &Identifier {
    match self {
      Definition::Interface(d) => &d.ident,
      Definition::Dictionary(d) => &d.ident,
      Definition::Enum(d) => &d.ident,
      Definition::Typedef(d) => &d.ident,
      Definition::Callback(d) => &d.ident,
      Definition::Includes(d) => &d.interface,
      Definition::External(d) => &d.ident,
    }
  }

  pub fn kind_name(&self) -> &'static str {
    match self {
      Definition::Interface(d) => d.kind.name(),
      Definition::Dictionary(_) => "dictionary",
      Definition::Enum(_) => "enum",
      Definition::Typedef(_) => "typedef",
      Definition::Callback(d) if d.constructor => "callback constructor",
      Definition::Callback(_) => "callback",
      Definition::Includes(_) => "includes statement",
      Definition::External(_) => "external interface",
    }
  }

  /// Enums and external interfaces have nothing to finish.
  pub fn state(&self) -> FinishState {
    match self {
      Definition::Interface(d) => d.state,
      Definition::Dictionary(d) => d.state,
      Definition::Typedef(d) => d.state,
      Definition::Callback(d) => d.state,
      Definition::Includes(d) => d.state,
      Definition::Enum(_) | Definition::External(_) => FinishState::Finished,
    }
  }

  pub fn set_state(&mut self, state: FinishState) {
    match self {
      Definition::Interface(d) => d.state = state,
      Definition::Dictionary(d) => d.state = state,
      Definition::Typedef(d) => d.state = state,
      Definition::Callback(d) => d.state = state,
      Definition::Includes(d) => d.state = state,
      Definition::Enum(_) | Definition::External(_) => {}
    }
  }
}

/// All definitions accumulated across parsed files.
#[derive(Debug, Serialize)]
pub struct Program {
  pub(crate) defs: Vec<Definition>,
  pub(crate) members: Vec<Member>,
  #[serde(skip)]
  pub(crate) scopes: Scopes,
  pub(crate) order: Vec<DefId>,
  #[serde(skip)]
  pub(crate) options: ParserOptions,
}

impl Program {
  pub fn new(options: ParserOptions) -> Program {
    Program {
      defs: Vec::new(),
      members: Vec::new(),
      scopes: Scopes::new(&options.primary_global),
      order: Vec::new(),
      options,
    }
  }

  pub fn options(&self) -> &ParserOptions {
    &self.options
  }

  /// Definitions in the order they were declared. Synthesized iterator interfaces directly follow
  /// the interface they iterate.
  pub fn definitions(&self) -> impl Iterator<Item = (DefId, &Definition)> + '_ {
    self.order.iter().map(|id| (*id, self.def(*id)))
  }

  pub fn def(&self, id: DefId) -> &Definition {
    &self.defs[id.0 as usize]
  }

  pub fn def_mut(&mut self, id: DefId) -> &mut Definition {
    &mut self.defs[id.0 as usize]
  }

  pub fn member(&self, id: MemberId) -> &Member {
    &self.members[id.0 as usize]
  }

  pub fn member_mut(&mut self, id: MemberId) -> &mut Member {
    &mut self.members[id.0 as usize]
  }

  pub(crate) fn add_def(&mut self, def: Definition) -> DefId {
    let id = DefId(self.defs.len() as u32);
    self.defs.push(def);
    self.order.push(id);
    id
  }

  /// Adds a definition that callers observe directly after `after`.
  pub(crate) fn insert_def_after(&mut self, def: Definition, after: DefId) -> DefId {
    let id = DefId(self.defs.len() as u32);
    self.defs.push(def);
    let pos = self.order.iter().position(|d| *d == after).map_or(self.order.len(), |p| p + 1);
    self.order.insert(pos, id);
    id
  }

  pub(crate) fn add_member(&mut self, member: Member) -> MemberId {
    let id = MemberId(self.members.len() as u32);
    self.members.push(member);
    id
  }

  pub fn interface(&self, id: DefId) -> Option<&Interface> {
    match self.def(id) {
      Definition::Interface(i) => Some(i),
      _ => None,
    }
  }

  pub(crate) fn interface_mut(&mut self, id: DefId) -> Option<&mut Interface> {
    match self.def_mut(id) {
      Definition::Interface(i) => Some(i),
      _ => None,
    }
  }

  pub fn dictionary(&self, id: DefId) -> Option<&Dictionary> {
    match self.def(id) {
      Definition::Dictionary(d) => Some(d),
      _ => None,
    }
  }

  pub(crate) fn dictionary_mut(&mut self, id: DefId) -> Option<&mut Dictionary> {
    match self.def_mut(id) {
      Definition::Dictionary(d) => Some(d),
      _ => None,
    }
  }

  pub fn enumeration(&self, id: DefId) -> Option<&Enum> {
    match self.def(id) {
      Definition::Enum(e) => Some(e),
      _ => None,
    }
  }

  pub fn callback(&self, id: DefId) -> Option<&Callback> {
    match self.def(id) {
      Definition::Callback(c) => Some(c),
      _ => None,
    }
  }

  /// Looks up a top-level definition by name.
  pub fn find(&self, name: &str) -> Option<DefId> {
    match self.scopes.lookup(ScopeId::GLOBAL, name) {
      Some(crate::scope::Binding::Def(id)) => Some(id),
      _ => None,
    }
  }

  /// Looks up a member of an interface-like definition by name. Only the definition's own scope
  /// is searched, not its ancestors.
  pub fn find_member(&self, owner: DefId, name: &str) -> Option<MemberId> {
    let scope = self.interface(owner)?.scope;
    match self.scopes.lookup(scope, name) {
      Some(crate::scope::Binding::Member(id)) => Some(id),
      _ => None,
    }
  }

  /// Ancestors of an interface or dictionary, nearest first. Stops rather than loops if the chain
  /// is cyclic.
  pub fn ancestors(&self, id: DefId) -> Vec<DefId> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::from([id]);
    let mut cur = self.parent_of(id);
    while let Some(p) = cur {
      if !seen.insert(p) {
        break;
      };
      out.push(p);
      cur = self.parent_of(p);
    }
    out
  }

  fn parent_of(&self, id: DefId) -> Option<DefId> {
    match self.def(id) {
      Definition::Interface(i) => i.parent,
      Definition::Dictionary(d) => d.parent,
      _ => None,
    }
  }

  /// The interface itself plus every interface inheriting from it. An object can implement two
  /// interfaces only when these sets intersect.
  pub fn interfaces_based_on(&self, id: DefId) -> BTreeSet<DefId> {
    let mut set = BTreeSet::from([id]);
    for (i, def) in self.defs.iter().enumerate() {
      let candidate = DefId(i as u32);
      if matches!(def, Definition::Interface(_)) && self.ancestors(candidate).contains(&id) {
        set.insert(candidate);
      };
    }
    set
  }

  pub fn name_of(&self, id: DefId) -> &str {
    &self.def(id).ident().name
  }
}
