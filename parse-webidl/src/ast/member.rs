use super::value::Value;
use super::DefId;
use super::Identifier;
use super::MemberId;
use crate::ext_attr::ExtAttrs;
use crate::loc::Location;
use crate::types::TypeSlot;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Argument {
  pub ident: Identifier,
  pub ty: TypeSlot,
  pub optional: bool,
  pub variadic: bool,
  pub default: Option<Value>,
  pub ext_attrs: ExtAttrs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Special {
  Getter,
  Setter,
  Deleter,
  LegacyCaller,
  Stringifier,
}

impl Special {
  pub fn keyword(self) -> &'static str {
    match self {
      Special::Getter => "getter",
      Special::Setter => "setter",
      Special::Deleter => "deleter",
      Special::LegacyCaller => "legacycaller",
      Special::Stringifier => "stringifier",
    }
  }
}

/// One signature of a method.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Overload {
  pub loc: Location,
  pub return_type: TypeSlot,
  pub args: Vec<Argument>,
  pub specials: Vec<Special>,
}

impl Overload {
  pub fn has_special(&self, special: Special) -> bool {
    self.specials.contains(&special)
  }

  /// Whether calling this overload with no arguments is possible.
  pub fn all_args_optional(&self) -> bool {
    self.args.iter().all(|a| a.optional || a.variadic)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MethodKind {
  Regular,
  Constructor,
  LegacyFactoryFunction,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Method {
  pub kind: MethodKind,
  pub is_static: bool,
  pub overloads: Vec<Overload>,
}

impl Method {
  pub fn has_special(&self, special: Special) -> bool {
    self.overloads.iter().any(|o| o.has_special(special))
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attribute {
  pub ty: TypeSlot,
  pub readonly: bool,
  pub inherit: bool,
  pub is_static: bool,
  pub stringifier: bool,
  /// Reserved storage slot for `[StoreInSlot]` and `[Cached]` attributes.
  pub slot_index: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Const {
  pub ty: TypeSlot,
  pub value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeclarationKind {
  Iterable,
  AsyncIterable,
  Maplike,
  Setlike,
}

impl DeclarationKind {
  pub fn keyword(self) -> &'static str {
    match self {
      DeclarationKind::Iterable => "iterable",
      DeclarationKind::AsyncIterable => "async iterable",
      DeclarationKind::Maplike => "maplike",
      DeclarationKind::Setlike => "setlike",
    }
  }
}

/// An `iterable`, `async iterable`, `maplike` or `setlike` declaration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Declaration {
  pub kind: DeclarationKind,
  pub key_type: Option<TypeSlot>,
  pub value_type: TypeSlot,
  pub readonly: bool,
  /// Arguments of an `async iterable`.
  pub args: Vec<Argument>,
  /// Backing storage slot of a maplike or setlike.
  pub slot_index: Option<u32>,
}

impl Declaration {
  /// Value iterators iterate a single type and are implemented with the indexed getter.
  pub fn is_value_iterator(&self) -> bool {
    self.kind == DeclarationKind::Iterable && self.key_type.is_none()
  }

  pub fn is_pair_iterator(&self) -> bool {
    self.kind == DeclarationKind::Iterable && self.key_type.is_some()
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum MemberKind {
  Const(Const),
  Attribute(Attribute),
  Method(Method),
  Declaration(Declaration),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Member {
  pub ident: Identifier,
  pub owner: DefId,
  pub ext_attrs: ExtAttrs,
  pub exposure: BTreeSet<String>,
  /// The declaration a generated member was created for.
  pub generated_by: Option<MemberId>,
  /// The mixin this member was copied from by an `includes` statement.
  pub from_mixin: Option<DefId>,
  pub kind: MemberKind,
}

impl Member {
  pub fn new(ident: Identifier, owner: DefId, kind: MemberKind) -> Member {
    Member {
      ident,
      owner,
      ext_attrs: ExtAttrs::default(),
      exposure: BTreeSet::new(),
      generated_by: None,
      from_mixin: None,
      kind,
    }
  }

  pub fn kind_name(&self) -> &'static str {
    match &self.kind {
      MemberKind::Const(_) => "constant",
      MemberKind::Attribute(_) => "attribute",
      MemberKind::Method(m) => match m.kind {
        MethodKind::Regular => "operation",
        MethodKind::Constructor => "constructor",
        MethodKind::LegacyFactoryFunction => "legacy factory function",
      },
      MemberKind::Declaration(d) => d.kind.keyword(),
    }
  }

  pub fn is_static(&self) -> bool {
    match &self.kind {
      MemberKind::Attribute(a) => a.is_static,
      MemberKind::Method(m) => m.is_static,
      _ => false,
    }
  }

  pub fn as_attribute(&self) -> Option<&Attribute> {
    match &self.kind {
      MemberKind::Attribute(a) => Some(a),
      _ => None,
    }
  }

  pub fn as_method(&self) -> Option<&Method> {
    match &self.kind {
      MemberKind::Method(m) => Some(m),
      _ => None,
    }
  }

  pub fn as_declaration(&self) -> Option<&Declaration> {
    match &self.kind {
      MemberKind::Declaration(d) => Some(d),
      _ => None,
    }
  }

  /// Every type slot in this member, in declaration order.
  pub fn type_slots_mut(&mut self) -> Vec<&mut TypeSlot> {
    let mut slots = Vec::new();
    match &mut self.kind {
      MemberKind::Const(c) => slots.push(&mut c.ty),
      MemberKind::Attribute(a) => slots.push(&mut a.ty),
      MemberKind::Method(m) => {
        for o in m.overloads.iter_mut() {
          slots.push(&mut o.return_type);
          for a in o.args.iter_mut() {
            slots.push(&mut a.ty);
          }
        }
      }
      MemberKind::Declaration(d) => {
        if let Some(k) = d.key_type.as_mut() {
          slots.push(k);
        };
        slots.push(&mut d.value_type);
        for a in d.args.iter_mut() {
          slots.push(&mut a.ty);
        }
      }
    };
    slots
  }

  pub fn type_slots(&self) -> Vec<&TypeSlot> {
    let mut slots = Vec::new();
    match &self.kind {
      MemberKind::Const(c) => slots.push(&c.ty),
      MemberKind::Attribute(a) => slots.push(&a.ty),
      MemberKind::Method(m) => {
        for o in m.overloads.iter() {
          slots.push(&o.return_type);
          slots.extend(o.args.iter().map(|a| &a.ty));
        }
      }
      MemberKind::Declaration(d) => {
        slots.extend(d.key_type.as_ref());
        slots.push(&d.value_type);
        slots.extend(d.args.iter().map(|a| &a.ty));
      }
    };
    slots
  }

  /// Merges another declaration with the same name into this member. Only regular operations,
  /// constructors and legacy factory functions overload; the caller has checked that both sides
  /// agree on kind and static-ness.
  pub fn absorb_overloads(&mut self, other: Member) {
    if let (MemberKind::Method(mine), MemberKind::Method(theirs)) = (&mut self.kind, other.kind) {
      mine.overloads.extend(theirs.overloads);
    };
    self.ext_attrs.merge(other.ext_attrs);
  }
}
