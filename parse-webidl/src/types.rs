//! Types as written ([`UnresolvedType`]) and as resolved ([`Type`]).
//!
//! Parsing produces unresolved types that refer to other definitions by name. Completion is a pure
//! function of the program: it resolves names in the global scope, unrolls typedefs, expands the
//! built-in buffer typedefs, and enforces the structural rules for nullable and union types.
//! Distinguishability lives here too since overload and union checks both need it.
use crate::ast::DefId;
use crate::ast::Definition;
use crate::ast::Identifier;
use crate::ast::InterfaceKind;
use crate::ast::Program;
use crate::builtins::BuiltinType;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::loc::Location;
use crate::scope::Binding;
use crate::scope::ScopeId;
use serde::Serialize;
use std::fmt::Write;

/// Extended attributes that annotate a type rather than the construct using it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TypeAttrs {
  pub clamp: bool,
  pub enforce_range: bool,
  pub legacy_null_to_empty_string: bool,
  pub allow_shared: bool,
}

impl TypeAttrs {
  pub const NAMES: [&'static str; 4] = [
    "AllowShared",
    "Clamp",
    "EnforceRange",
    "LegacyNullToEmptyString",
  ];

  pub fn is_empty(&self) -> bool {
    *self == TypeAttrs::default()
  }

  /// Sets the flag for `name`, returning false if `name` is not a type annotation.
  pub fn set(&mut self, name: &str) -> bool {
    match name {
      "AllowShared" => self.allow_shared = true,
      "Clamp" => self.clamp = true,
      "EnforceRange" => self.enforce_range = true,
      "LegacyNullToEmptyString" => self.legacy_null_to_empty_string = true,
      _ => return false,
    };
    true
  }

  pub fn union(self, other: TypeAttrs) -> TypeAttrs {
    TypeAttrs {
      clamp: self.clamp || other.clamp,
      enforce_range: self.enforce_range || other.enforce_range,
      legacy_null_to_empty_string: self.legacy_null_to_empty_string
        || other.legacy_null_to_empty_string,
      allow_shared: self.allow_shared || other.allow_shared,
    }
  }

  pub fn names(&self) -> Vec<&'static str> {
    let mut names = Vec::new();
    if self.allow_shared {
      names.push("AllowShared");
    };
    if self.clamp {
      names.push("Clamp");
    };
    if self.enforce_range {
      names.push("EnforceRange");
    };
    if self.legacy_null_to_empty_string {
      names.push("LegacyNullToEmptyString");
    };
    names
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum UnresolvedKind {
  Builtin(BuiltinType),
  Named(Identifier),
  Sequence(Box<UnresolvedType>),
  FrozenArray(Box<UnresolvedType>),
  ObservableArray(Box<UnresolvedType>),
  Record(BuiltinType, Box<UnresolvedType>),
  Promise(Box<UnresolvedType>),
  Union(Vec<UnresolvedType>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnresolvedType {
  pub loc: Location,
  pub kind: UnresolvedKind,
  pub nullable: bool,
  pub attrs: TypeAttrs,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
  Builtin(BuiltinType),
  Annotated(Box<Type>, TypeAttrs),
  Nullable(Box<Type>),
  Sequence(Box<Type>),
  FrozenArray(Box<Type>),
  ObservableArray(Box<Type>),
  Promise(Box<Type>),
  Record(BuiltinType, Box<Type>),
  Union(Vec<Type>),
  /// An interface, callback interface or external interface.
  Interface(DefId),
  Dictionary(DefId),
  Enum(DefId),
  /// A callback function or callback constructor.
  Callback(DefId),
}

/// A type in a definition or member: unresolved until finish, then complete.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TypeSlot {
  Unresolved(UnresolvedType),
  Complete(Type, Location),
}

impl TypeSlot {
  pub fn builtin(b: BuiltinType, loc: Location) -> TypeSlot {
    TypeSlot::Complete(Type::Builtin(b), loc)
  }

  pub fn loc(&self) -> &Location {
    match self {
      TypeSlot::Unresolved(t) => &t.loc,
      TypeSlot::Complete(_, loc) => loc,
    }
  }

  pub fn completed(&self) -> Option<&Type> {
    match self {
      TypeSlot::Unresolved(_) => None,
      TypeSlot::Complete(t, _) => Some(t),
    }
  }

  pub fn unresolved(&self) -> Option<&UnresolvedType> {
    match self {
      TypeSlot::Unresolved(t) => Some(t),
      TypeSlot::Complete(..) => None,
    }
  }

  /// Resolves the slot in place. Already complete slots are left untouched.
  pub fn complete(&mut self, program: &Program) -> IdlResult<()> {
    if let TypeSlot::Unresolved(t) = self {
      let ty = t.complete(program)?;
      *self = TypeSlot::Complete(ty, t.loc.clone());
    };
    Ok(())
  }
}

impl UnresolvedType {
  pub fn builtin(b: BuiltinType, loc: Location) -> UnresolvedType {
    UnresolvedType {
      loc,
      kind: UnresolvedKind::Builtin(b),
      nullable: false,
      attrs: TypeAttrs::default(),
    }
  }

  pub fn is_builtin(&self, b: BuiltinType) -> bool {
    !self.nullable && self.kind == UnresolvedKind::Builtin(b)
  }

  pub fn complete(&self, program: &Program) -> IdlResult<Type> {
    self.complete_with(program, &mut Vec::new())
  }

  fn complete_with(&self, program: &Program, typedefs: &mut Vec<DefId>) -> IdlResult<Type> {
    let boxed = |t: &UnresolvedType, typedefs: &mut Vec<DefId>| -> IdlResult<Box<Type>> {
      t.complete_with(program, typedefs).map(Box::new)
    };
    let inner = match &self.kind {
      UnresolvedKind::Builtin(b) => Type::Builtin(*b),
      UnresolvedKind::Named(ident) => resolve_name(ident, program, typedefs)?,
      UnresolvedKind::Sequence(t) => Type::Sequence(boxed(t, typedefs)?),
      UnresolvedKind::FrozenArray(t) => Type::FrozenArray(boxed(t, typedefs)?),
      UnresolvedKind::ObservableArray(t) => {
        let element = boxed(t, typedefs)?;
        if element.includes_dictionary() {
          return Err(self.loc.error(
            ErrorKind::InvalidType,
            "ObservableArray element type must not be a dictionary",
          ));
        };
        Type::ObservableArray(element)
      }
      UnresolvedKind::Promise(t) => Type::Promise(boxed(t, typedefs)?),
      UnresolvedKind::Record(k, v) => Type::Record(*k, boxed(v, typedefs)?),
      UnresolvedKind::Union(members) => {
        let members = members
          .iter()
          .map(|m| m.complete_with(program, typedefs))
          .collect::<IdlResult<Vec<_>>>()?;
        let union = Type::Union(members);
        check_union(&union, &self.loc)?;
        union
      }
    };
    let ty = annotate(inner, self.attrs, &self.loc)?;
    if self.nullable {
      make_nullable(ty, &self.loc)
    } else {
      Ok(ty)
    }
  }
}

fn resolve_name(ident: &Identifier, program: &Program, typedefs: &mut Vec<DefId>) -> IdlResult<Type> {
  let binding = program.scopes.lookup(ScopeId::GLOBAL, &ident.name).ok_or_else(|| {
    ident.loc.error(
      ErrorKind::UnresolvedIdentifier,
      format!("Unresolved type '{}'", ident.name),
    )
  })?;
  let id = match binding {
    Binding::Builtin(b) => return Ok(Type::Builtin(b)),
    Binding::BuiltinUnion(members) => {
      return Ok(Type::Union(members.iter().map(|b| Type::Builtin(*b)).collect()))
    }
    Binding::Member(_) => {
      return Err(ident.loc.error(
        ErrorKind::InvalidType,
        format!("'{}' is not a type", ident.name),
      ))
    }
    Binding::Def(id) => id,
  };
  match program.def(id) {
    Definition::Interface(i) => match i.kind {
      InterfaceKind::Interface | InterfaceKind::CallbackInterface => Ok(Type::Interface(id)),
      InterfaceKind::Mixin | InterfaceKind::Namespace => Err(ident.loc.error(
        ErrorKind::InvalidType,
        format!("{} '{}' cannot be used as a type", i.kind.name(), ident.name),
      )),
    },
    Definition::External(_) => Ok(Type::Interface(id)),
    Definition::Dictionary(_) => Ok(Type::Dictionary(id)),
    Definition::Enum(_) => Ok(Type::Enum(id)),
    Definition::Callback(_) => Ok(Type::Callback(id)),
    Definition::Typedef(t) => {
      if typedefs.contains(&id) {
        return Err(
          ident
            .loc
            .error(
              ErrorKind::InvalidType,
              format!("Typedef '{}' refers to itself", ident.name),
            )
            .with_location(&t.ident.loc),
        );
      };
      match &t.ty {
        TypeSlot::Complete(ty, _) => Ok(ty.clone()),
        TypeSlot::Unresolved(u) => {
          typedefs.push(id);
          let ty = u.complete_with(program, typedefs);
          typedefs.pop();
          ty
        }
      }
    }
    Definition::Includes(_) => Err(ident.loc.error(
      ErrorKind::InvalidType,
      format!("'{}' is not a type", ident.name),
    )),
  }
}

fn annotate(ty: Type, attrs: TypeAttrs, loc: &Location) -> IdlResult<Type> {
  if attrs.is_empty() {
    return Ok(ty);
  };
  let (base, attrs) = match ty {
    Type::Annotated(base, existing) => (*base, existing.union(attrs)),
    other => (other, attrs),
  };
  let invalid = |msg: String| Err(loc.error(ErrorKind::InvalidType, msg));
  if attrs.clamp && attrs.enforce_range {
    return invalid("[Clamp] and [EnforceRange] are mutually exclusive".into());
  };
  let builtin = match &base {
    Type::Builtin(b) => Some(*b),
    _ => None,
  };
  if (attrs.clamp || attrs.enforce_range) && !builtin.is_some_and(|b| b.is_integer()) {
    return invalid(format!(
      "[Clamp] and [EnforceRange] apply only to integer types, not {}",
      base.describe(),
    ));
  };
  if attrs.legacy_null_to_empty_string && builtin != Some(BuiltinType::DomString) {
    return invalid(format!(
      "[LegacyNullToEmptyString] applies only to DOMString, not {}",
      base.describe(),
    ));
  };
  if attrs.allow_shared {
    let is_buffer = match &base {
      Type::Builtin(b) => b.is_buffer_source(),
      Type::Union(members) => members
        .iter()
        .all(|m| matches!(m.inner(), Type::Builtin(b) if b.is_buffer_source())),
      _ => false,
    };
    if !is_buffer {
      return invalid(format!(
        "[AllowShared] applies only to buffer source types, not {}",
        base.describe(),
      ));
    };
  };
  Ok(Type::Annotated(Box::new(base), attrs))
}

fn make_nullable(ty: Type, loc: &Location) -> IdlResult<Type> {
  let invalid = |msg: &str| Err(loc.error(ErrorKind::InvalidType, msg));
  if ty.attrs().legacy_null_to_empty_string {
    return invalid("[LegacyNullToEmptyString] cannot be used on a nullable type");
  };
  match ty.unannotated() {
    Type::Nullable(_) => return invalid("The inner type of a nullable type must not be a nullable type"),
    Type::Union(_) if ty.nullable_member_count() > 0 => {
      return invalid(
        "The inner type of a nullable type must not be a union type that itself has a nullable type as a member type",
      )
    }
    Type::Builtin(BuiltinType::Any) => return invalid("The inner type of a nullable type must not be 'any'"),
    Type::Builtin(BuiltinType::Undefined) => {
      return invalid("The inner type of a nullable type must not be 'undefined'")
    }
    Type::Promise(_) => return invalid("The inner type of a nullable type must not be a Promise type"),
    Type::ObservableArray(_) => {
      return invalid("The inner type of a nullable type must not be an ObservableArray type")
    }
    _ => {}
  };
  if ty.includes_dictionary() {
    return invalid("The inner type of a nullable type must not be a dictionary type or include one");
  };
  Ok(Type::Nullable(Box::new(ty)))
}

fn check_union(union: &Type, loc: &Location) -> IdlResult<()> {
  if union.nullable_member_count() > 1 {
    return Err(loc.error(
      ErrorKind::InvalidType,
      "A union type may include only one nullable member type",
    ));
  };
  if union
    .flattened_members()
    .iter()
    .any(|m| matches!(m, Type::Builtin(BuiltinType::Any)))
  {
    return Err(loc.error(
      ErrorKind::InvalidType,
      "A union type must not have 'any' as a member type",
    ));
  };
  Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Category {
  Undefined,
  Boolean,
  Numeric,
  BigInt,
  String,
  Object,
  Symbol,
  InterfaceLike,
  CallbackFunction,
  DictionaryLike,
  SequenceLike,
  Indistinguishable,
}

impl Type {
  /// Strips annotations.
  pub fn unannotated(&self) -> &Type {
    match self {
      Type::Annotated(t, _) => t.unannotated(),
      t => t,
    }
  }

  /// Strips annotations and nullability.
  pub fn inner(&self) -> &Type {
    match self {
      Type::Annotated(t, _) | Type::Nullable(t) => t.inner(),
      t => t,
    }
  }

  pub fn attrs(&self) -> TypeAttrs {
    match self {
      Type::Annotated(t, attrs) => attrs.union(t.attrs()),
      Type::Nullable(t) => t.attrs(),
      _ => TypeAttrs::default(),
    }
  }

  pub fn builtin(&self) -> Option<BuiltinType> {
    match self.inner() {
      Type::Builtin(b) => Some(*b),
      _ => None,
    }
  }

  pub fn is(&self, b: BuiltinType) -> bool {
    self.builtin() == Some(b)
  }

  pub fn is_nullable(&self) -> bool {
    matches!(self.unannotated(), Type::Nullable(_))
  }

  pub fn is_union(&self) -> bool {
    matches!(self.inner(), Type::Union(_))
  }

  pub fn is_promise(&self) -> bool {
    matches!(self.inner(), Type::Promise(_))
  }

  pub fn is_sequence_or_record(&self) -> bool {
    matches!(self.inner(), Type::Sequence(_) | Type::Record(..))
  }

  pub fn is_string(&self) -> bool {
    match self.inner() {
      Type::Builtin(b) => b.is_string(),
      Type::Enum(_) => true,
      Type::Union(members) => members.iter().all(|m| m.is_string()),
      _ => false,
    }
  }

  pub fn is_undefined(&self) -> bool {
    self.is(BuiltinType::Undefined)
  }

  /// The member types of a union, with nested unions expanded and nullability and annotations
  /// removed. A non-union type has no flattened members.
  pub fn flattened_members(&self) -> Vec<&Type> {
    let mut out = Vec::new();
    if let Type::Union(members) = self.inner() {
      for m in members {
        match m.inner() {
          Type::Union(_) => out.extend(m.flattened_members()),
          t => out.push(t),
        };
      }
    };
    out
  }

  pub fn nullable_member_count(&self) -> usize {
    match self.inner() {
      Type::Union(members) => members
        .iter()
        .map(|m| {
          let nested = if m.is_union() { m.nullable_member_count() } else { 0 };
          nested + usize::from(m.is_nullable())
        })
        .sum(),
      _ => 0,
    }
  }

  pub fn includes_nullable(&self) -> bool {
    self.is_nullable() || self.nullable_member_count() > 0
  }

  pub fn includes_dictionary(&self) -> bool {
    let is_dict = |t: &Type| matches!(t, Type::Dictionary(_));
    is_dict(self.inner()) || self.flattened_members().into_iter().any(is_dict)
  }

  pub fn includes_undefined(&self) -> bool {
    self.is_undefined()
      || self
        .flattened_members()
        .iter()
        .any(|m| matches!(m, Type::Builtin(BuiltinType::Undefined)))
  }

  /// Definitions named anywhere inside this type.
  pub fn referenced_defs(&self, out: &mut Vec<DefId>) {
    match self {
      Type::Builtin(_) => {}
      Type::Annotated(t, _)
      | Type::Nullable(t)
      | Type::Sequence(t)
      | Type::FrozenArray(t)
      | Type::ObservableArray(t)
      | Type::Promise(t)
      | Type::Record(_, t) => t.referenced_defs(out),
      Type::Union(members) => members.iter().for_each(|m| m.referenced_defs(out)),
      Type::Interface(id) | Type::Dictionary(id) | Type::Enum(id) | Type::Callback(id) => {
        out.push(*id)
      }
    }
  }

  /// Every union nested anywhere in this type, outermost first.
  pub fn unions(&self) -> Vec<&Type> {
    let mut out = Vec::new();
    self.collect_unions(&mut out);
    out
  }

  fn collect_unions<'a>(&'a self, out: &mut Vec<&'a Type>) {
    match self {
      Type::Builtin(_)
      | Type::Interface(_)
      | Type::Dictionary(_)
      | Type::Enum(_)
      | Type::Callback(_) => {}
      Type::Annotated(t, _)
      | Type::Nullable(t)
      | Type::Sequence(t)
      | Type::FrozenArray(t)
      | Type::ObservableArray(t)
      | Type::Promise(t)
      | Type::Record(_, t) => t.collect_unions(out),
      Type::Union(members) => {
        out.push(self);
        members.iter().for_each(|m| m.collect_unions(out));
      }
    }
  }

  /// A rendering that does not need the program, with definitions shown by id.
  fn describe(&self) -> String {
    let mut out = String::new();
    self.write_name(&mut out, &|id| format!("#{}", id.raw()));
    out
  }

  /// The type in IDL syntax.
  pub fn name(&self, program: &Program) -> String {
    let mut out = String::new();
    self.write_name(&mut out, &|id| program.name_of(id).to_string());
    out
  }

  fn write_name(&self, out: &mut String, def_name: &dyn Fn(DefId) -> String) {
    match self {
      Type::Builtin(b) => out.push_str(b.name()),
      Type::Annotated(t, attrs) => {
        let _ = write!(out, "[{}] ", attrs.names().join(", "));
        t.write_name(out, def_name);
      }
      Type::Nullable(t) => {
        t.write_name(out, def_name);
        out.push('?');
      }
      Type::Sequence(t) | Type::FrozenArray(t) | Type::ObservableArray(t) | Type::Promise(t) => {
        out.push_str(match self {
          Type::Sequence(_) => "sequence<",
          Type::FrozenArray(_) => "FrozenArray<",
          Type::ObservableArray(_) => "ObservableArray<",
          _ => "Promise<",
        });
        t.write_name(out, def_name);
        out.push('>');
      }
      Type::Record(k, v) => {
        let _ = write!(out, "record<{}, ", k.name());
        v.write_name(out, def_name);
        out.push('>');
      }
      Type::Union(members) => {
        out.push('(');
        for (i, m) in members.iter().enumerate() {
          if i > 0 {
            out.push_str(" or ");
          };
          m.write_name(out, def_name);
        }
        out.push(')');
      }
      Type::Interface(id) | Type::Dictionary(id) | Type::Enum(id) | Type::Callback(id) => {
        out.push_str(&def_name(*id))
      }
    }
  }

  fn category(&self, program: &Program) -> Category {
    match self.inner() {
      Type::Builtin(b) => match b {
        BuiltinType::Undefined => Category::Undefined,
        BuiltinType::Boolean => Category::Boolean,
        BuiltinType::BigInt => Category::BigInt,
        BuiltinType::Object => Category::Object,
        BuiltinType::Symbol => Category::Symbol,
        BuiltinType::Any => Category::Indistinguishable,
        b if b.is_numeric() => Category::Numeric,
        b if b.is_string() => Category::String,
        _ => Category::InterfaceLike,
      },
      Type::Enum(_) => Category::String,
      Type::Interface(id) => match program.interface(*id) {
        Some(i) if i.kind == InterfaceKind::CallbackInterface => Category::DictionaryLike,
        _ => Category::InterfaceLike,
      },
      Type::Callback(_) => Category::CallbackFunction,
      Type::Dictionary(_) | Type::Record(..) => Category::DictionaryLike,
      Type::Sequence(_) | Type::FrozenArray(_) | Type::ObservableArray(_) => Category::SequenceLike,
      Type::Promise(_) | Type::Union(_) => Category::Indistinguishable,
      Type::Annotated(..) | Type::Nullable(_) => Category::Indistinguishable,
    }
  }

  /// Whether a value can be unambiguously attributed to one of the two types. Symmetric.
  pub fn is_distinguishable_from(&self, other: &Type, program: &Program) -> bool {
    let nullable_conflict = |a: &Type, b: &Type| {
      a.includes_nullable() && (b.includes_nullable() || b.includes_dictionary())
    };
    if nullable_conflict(self, other) || nullable_conflict(other, self) {
      return false;
    };
    if self.is_union() || other.is_union() {
      let members = |t: &Type| -> Vec<Type> {
        if t.is_union() {
          t.flattened_members().into_iter().cloned().collect()
        } else {
          vec![t.inner().clone()]
        }
      };
      let (ours, theirs) = (members(self), members(other));
      return ours
        .iter()
        .all(|a| theirs.iter().all(|b| a.is_distinguishable_from(b, program)));
    };
    let (a, b) = (self.inner(), other.inner());
    let (ca, cb) = (a.category(program), b.category(program));
    if ca == Category::Indistinguishable || cb == Category::Indistinguishable {
      return false;
    };
    if ca == cb {
      return ca == Category::InterfaceLike && interface_likes_distinguishable(a, b, program);
    };
    use Category::*;
    match (ca, cb) {
      (Object, InterfaceLike | CallbackFunction | DictionaryLike | SequenceLike)
      | (InterfaceLike | CallbackFunction | DictionaryLike | SequenceLike, Object) => false,
      (Undefined, DictionaryLike) | (DictionaryLike, Undefined) => false,
      (CallbackFunction, DictionaryLike) => !treats_non_object_as_null(a, program),
      (DictionaryLike, CallbackFunction) => !treats_non_object_as_null(b, program),
      _ => true,
    }
  }
}

fn treats_non_object_as_null(callback: &Type, program: &Program) -> bool {
  match callback {
    Type::Callback(id) => program
      .callback(*id)
      .is_some_and(|c| c.ext_attrs.has("LegacyTreatNonObjectAsNull")),
    _ => false,
  }
}

fn interface_likes_distinguishable(a: &Type, b: &Type, program: &Program) -> bool {
  match (a, b) {
    (Type::Builtin(x), Type::Builtin(y)) => !x.buffer_overlaps(*y),
    (Type::Interface(x), Type::Interface(y)) => {
      let external = |id: DefId| matches!(program.def(id), Definition::External(_));
      if external(*x) || external(*y) {
        x != y
      } else {
        program
          .interfaces_based_on(*x)
          .is_disjoint(&program.interfaces_based_on(*y))
      }
    }
    _ => true,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::options::ParserOptions;

  fn program() -> Program {
    Program::new(ParserOptions::default())
  }

  fn b(t: BuiltinType) -> Type {
    Type::Builtin(t)
  }

  #[test]
  fn primitive_categories() {
    let p = program();
    assert!(b(BuiltinType::Long).is_distinguishable_from(&b(BuiltinType::DomString), &p));
    assert!(b(BuiltinType::Boolean).is_distinguishable_from(&b(BuiltinType::Double), &p));
    assert!(!b(BuiltinType::Long).is_distinguishable_from(&b(BuiltinType::Double), &p));
    assert!(!b(BuiltinType::UsvString).is_distinguishable_from(&b(BuiltinType::DomString), &p));
    assert!(!b(BuiltinType::Any).is_distinguishable_from(&b(BuiltinType::Long), &p));
  }

  #[test]
  fn object_overlaps_sequences() {
    let p = program();
    let seq = Type::Sequence(Box::new(b(BuiltinType::Long)));
    assert!(!b(BuiltinType::Object).is_distinguishable_from(&seq, &p));
    assert!(!seq.is_distinguishable_from(&b(BuiltinType::Object), &p));
    assert!(seq.is_distinguishable_from(&b(BuiltinType::DomString), &p));
  }

  #[test]
  fn nullable_pairs_are_not_distinguishable() {
    let p = program();
    let a = Type::Nullable(Box::new(b(BuiltinType::Long)));
    let c = Type::Nullable(Box::new(b(BuiltinType::DomString)));
    assert!(!a.is_distinguishable_from(&c, &p));
    assert!(a.is_distinguishable_from(&b(BuiltinType::DomString), &p));
  }

  #[test]
  fn buffer_types() {
    let p = program();
    assert!(b(BuiltinType::Int8Array).is_distinguishable_from(&b(BuiltinType::Uint8Array), &p));
    assert!(!b(BuiltinType::ArrayBufferView).is_distinguishable_from(&b(BuiltinType::DataView), &p));
  }

  #[test]
  fn union_members_checked_pairwise() {
    let p = program();
    let u = Type::Union(vec![b(BuiltinType::Long), b(BuiltinType::DomString)]);
    assert!(u.is_distinguishable_from(&b(BuiltinType::Boolean), &p));
    assert!(!u.is_distinguishable_from(&b(BuiltinType::Short), &p));
  }

  #[test]
  fn flattening_and_nullable_counts() {
    let inner = Type::Union(vec![
      Type::Nullable(Box::new(b(BuiltinType::Long))),
      b(BuiltinType::Boolean),
    ]);
    let outer = Type::Union(vec![inner, b(BuiltinType::DomString)]);
    assert_eq!(outer.flattened_members().len(), 3);
    assert_eq!(outer.nullable_member_count(), 1);
    assert!(outer.includes_nullable());
  }

  #[test]
  fn annotated_names() {
    let p = program();
    let t = Type::Nullable(Box::new(Type::Annotated(
      Box::new(b(BuiltinType::Octet)),
      TypeAttrs {
        clamp: true,
        ..TypeAttrs::default()
      },
    )));
    assert_eq!(t.name(&p), "[Clamp] octet?");
    assert_eq!(t.builtin(), Some(BuiltinType::Octet));
    assert!(t.attrs().clamp);
  }
}
