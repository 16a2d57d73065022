//! Extended attributes and the table of where each may appear.
//!
//! Attribute names are validated against a fixed table per kind of construct, including the shape
//! of their arguments. A handful of attributes also propagate from a container (partial block,
//! mixin) onto its members; declaring one on both is an error.
use crate::ast::member::Argument;
use crate::ast::member::Attribute;
use crate::ast::Identifier;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::error::WebIdlError;
use crate::loc::Location;
use crate::types::TypeAttrs;
use ahash::HashMap;
use ahash::HashMapExt;
use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ExtAttrArgs {
  /// `[Name]`
  None,
  /// `[Name=Value]`, where the value is an identifier, string, number or `*`.
  Value(String),
  /// `[Name=(A, B)]`
  List(Vec<String>),
  /// `[Name(args)]`
  Args(Vec<Argument>),
  /// `[Name=Other(args)]`
  NamedArgs(String, Vec<Argument>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtAttr {
  pub name: String,
  pub loc: Location,
  pub args: ExtAttrArgs,
}

impl ExtAttr {
  pub fn error(&self, msg: impl Into<String>) -> WebIdlError {
    self.loc.error(ErrorKind::InvalidExtendedAttribute, msg)
  }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtAttrs(Vec<ExtAttr>);

impl ExtAttrs {
  pub fn new(attrs: Vec<ExtAttr>) -> ExtAttrs {
    ExtAttrs(attrs)
  }

  pub fn get(&self, name: &str) -> Option<&ExtAttr> {
    self.0.iter().find(|a| a.name == name)
  }

  pub fn has(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ExtAttr> {
    self.0.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn push(&mut self, attr: ExtAttr) {
    self.0.push(attr);
  }

  pub fn remove(&mut self, name: &str) -> Option<ExtAttr> {
    let i = self.0.iter().position(|a| a.name == name)?;
    Some(self.0.remove(i))
  }

  /// Identifiers given to `[Name=X]` or `[Name=(X, Y)]`.
  pub fn identifiers(&self, name: &str) -> Vec<&str> {
    match self.get(name).map(|a| &a.args) {
      Some(ExtAttrArgs::Value(v)) => vec![v.as_str()],
      Some(ExtAttrArgs::List(vs)) => vs.iter().map(|v| v.as_str()).collect(),
      _ => Vec::new(),
    }
  }

  /// Adds attributes from another list whose names are not already present.
  pub fn merge(&mut self, other: ExtAttrs) {
    for attr in other.0 {
      if !self.has(&attr.name) {
        self.0.push(attr);
      };
    }
  }

  /// Removes the type annotations from this list and returns them.
  pub fn take_type_attrs(&mut self) -> TypeAttrs {
    let mut attrs = TypeAttrs::default();
    self.0.retain(|a| !attrs.set(&a.name));
    attrs
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Target {
  Interface,
  Mixin,
  Namespace,
  CallbackInterface,
  Dictionary,
  DictionaryMember,
  Enum,
  Typedef,
  Callback,
  Includes,
  Const,
  Attribute,
  Operation,
  Constructor,
  Argument,
  Declaration,
  Type,
}

impl Target {
  fn name(self) -> &'static str {
    match self {
      Target::Interface => "interface",
      Target::Mixin => "interface mixin",
      Target::Namespace => "namespace",
      Target::CallbackInterface => "callback interface",
      Target::Dictionary => "dictionary",
      Target::DictionaryMember => "dictionary member",
      Target::Enum => "enum",
      Target::Typedef => "typedef",
      Target::Callback => "callback",
      Target::Includes => "includes statement",
      Target::Const => "constant",
      Target::Attribute => "attribute",
      Target::Operation => "operation",
      Target::Constructor => "constructor",
      Target::Argument => "argument",
      Target::Declaration => "declaration",
      Target::Type => "type",
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Shape {
  Flag,
  Value,
  ValueOrList,
  FlagValueOrList,
  NamedArgs,
}

impl Shape {
  fn accepts(self, args: &ExtAttrArgs) -> bool {
    match self {
      Shape::Flag => matches!(args, ExtAttrArgs::None),
      Shape::Value => matches!(args, ExtAttrArgs::Value(_)),
      Shape::ValueOrList => matches!(args, ExtAttrArgs::Value(_) | ExtAttrArgs::List(_)),
      Shape::FlagValueOrList => matches!(
        args,
        ExtAttrArgs::None | ExtAttrArgs::Value(_) | ExtAttrArgs::List(_)
      ),
      Shape::NamedArgs => matches!(args, ExtAttrArgs::NamedArgs(..)),
    }
  }

  fn describe(self) -> &'static str {
    match self {
      Shape::Flag => "takes no value",
      Shape::Value => "takes a single value",
      Shape::ValueOrList => "takes an identifier or identifier list",
      Shape::FlagValueOrList => "takes no value, an identifier, or an identifier list",
      Shape::NamedArgs => "takes a name and an argument list",
    }
  }
}

struct Rule {
  targets: &'static [Target],
  shape: Shape,
  repeatable: bool,
}

/// Attributes that flow from a container onto each member declared in it.
pub const PROPAGATING: &[&str] = &["Exposed", "SecureContext", "Pref", "Func"];

const CONDITIONAL: &[Target] = &[
  Target::Interface,
  Target::Mixin,
  Target::Namespace,
  Target::CallbackInterface,
  Target::Const,
  Target::Attribute,
  Target::Operation,
  Target::DictionaryMember,
];

const EXCLUSIVE: &[(&str, &str)] = &[
  ("PutForwards", "Replaceable"),
  ("PutForwards", "LegacyLenientSetter"),
  ("Replaceable", "LegacyLenientSetter"),
  ("Clamp", "EnforceRange"),
  ("Global", "LegacyOverrideBuiltIns"),
  ("LegacyNoInterfaceObject", "LegacyFactoryFunction"),
  ("Pure", "Constant"),
  ("Cached", "StoreInSlot"),
];

#[rustfmt::skip]
static RULES: Lazy<HashMap<&'static str, Rule>> = Lazy::new(|| {
  let mut map = HashMap::<&'static str, Rule>::new();
  let mut rule = |name: &'static str, targets: &'static [Target], shape: Shape, repeatable: bool| {
    map.insert(name, Rule { targets, shape, repeatable });
  };
  use Target as T;
  rule("Exposed", &[T::Interface, T::Mixin, T::Namespace, T::CallbackInterface, T::Const, T::Attribute, T::Operation], Shape::ValueOrList, false);
  rule("SecureContext", &[T::Interface, T::Mixin, T::Namespace, T::CallbackInterface, T::Const, T::Attribute, T::Operation], Shape::Flag, false);
  rule("Pref", CONDITIONAL, Shape::Value, false);
  rule("Func", CONDITIONAL, Shape::Value, false);
  rule("ChromeOnly", CONDITIONAL, Shape::Flag, false);
  rule("Global", &[T::Interface], Shape::FlagValueOrList, false);
  rule("LegacyNoInterfaceObject", &[T::Interface, T::CallbackInterface], Shape::Flag, false);
  rule("LegacyFactoryFunction", &[T::Interface], Shape::NamedArgs, true);
  rule("LegacyOverrideBuiltIns", &[T::Interface], Shape::Flag, false);
  rule("LegacyUnenumerableNamedProperties", &[T::Interface], Shape::Flag, false);
  rule("LegacyWindowAlias", &[T::Interface], Shape::ValueOrList, false);
  rule("Serializable", &[T::Interface], Shape::Flag, false);
  rule("Transferable", &[T::Interface], Shape::Flag, false);
  rule("LegacyUnforgeable", &[T::Attribute, T::Operation], Shape::Flag, false);
  rule("Throws", &[T::Attribute, T::Operation, T::Constructor], Shape::Flag, false);
  rule("CEReactions", &[T::Attribute, T::Operation], Shape::Flag, false);
  rule("NewObject", &[T::Operation], Shape::Flag, false);
  rule("SameObject", &[T::Attribute], Shape::Flag, false);
  rule("PutForwards", &[T::Attribute], Shape::Value, false);
  rule("Replaceable", &[T::Attribute], Shape::Flag, false);
  rule("LegacyLenientSetter", &[T::Attribute], Shape::Flag, false);
  rule("LegacyLenientThis", &[T::Attribute], Shape::Flag, false);
  rule("LenientFloat", &[T::Attribute, T::Operation], Shape::Flag, false);
  rule("Default", &[T::Operation], Shape::Flag, false);
  rule("StoreInSlot", &[T::Attribute], Shape::Flag, false);
  rule("Cached", &[T::Attribute], Shape::Flag, false);
  rule("Pure", &[T::Attribute, T::Operation], Shape::Flag, false);
  rule("Constant", &[T::Attribute, T::Operation], Shape::Flag, false);
  rule("Affects", &[T::Attribute, T::Operation], Shape::Value, false);
  rule("DependsOn", &[T::Attribute, T::Operation], Shape::Value, false);
  rule("BinaryName", &[T::Attribute, T::Operation, T::Argument, T::DictionaryMember], Shape::Value, false);
  rule("GenerateInitFromJSON", &[T::Dictionary], Shape::Flag, false);
  rule("GenerateConversionToJS", &[T::Dictionary], Shape::Flag, false);
  rule("LegacyTreatNonObjectAsNull", &[T::Callback], Shape::Flag, false);
  rule("GenerateReturnMethod", &[T::Declaration], Shape::Flag, false);
  for name in TypeAttrs::NAMES {
    rule(name, &[T::Type, T::Argument, T::DictionaryMember], Shape::Flag, false);
  }
  map
});

fn check_values(attr: &ExtAttr) -> IdlResult<()> {
  let allowed: &[&str] = match attr.name.as_str() {
    "Affects" => &["Nothing", "Everything"],
    "DependsOn" => &["Nothing", "DOMState", "DeviceState", "Everything"],
    _ => return Ok(()),
  };
  match &attr.args {
    ExtAttrArgs::Value(v) if !allowed.contains(&v.as_str()) => Err(attr.error(format!(
      "Invalid [{}] value '{}'; expected one of {}",
      attr.name,
      v,
      allowed.join(", "),
    ))),
    _ => Ok(()),
  }
}

/// Validates every attribute in `attrs` against the table for `target`.
pub fn check(attrs: &ExtAttrs, target: Target, owner: &str) -> IdlResult<()> {
  for (i, attr) in attrs.iter().enumerate() {
    let rule = RULES
      .get(attr.name.as_str())
      .filter(|r| r.targets.contains(&target))
      .ok_or_else(|| {
        let site = if owner.is_empty() {
          target.name().to_string()
        } else {
          format!("{} '{}'", target.name(), owner)
        };
        attr.error(format!("Unknown extended attribute [{}] on {}", attr.name, site))
      })?;
    if !rule.shape.accepts(&attr.args) {
      return Err(attr.error(format!("[{}] {}", attr.name, rule.shape.describe())));
    };
    if !rule.repeatable {
      if let Some(dup) = attrs.iter().skip(i + 1).find(|a| a.name == attr.name) {
        return Err(
          dup
            .error(format!("[{}] specified more than once", attr.name))
            .with_location(&attr.loc),
        );
      };
    };
    check_values(attr)?;
  }
  for (a, b) in EXCLUSIVE {
    if let (Some(x), Some(y)) = (attrs.get(a), attrs.get(b)) {
      return Err(
        y.error(format!("[{}] and [{}] are mutually exclusive", a, b))
          .with_location(&x.loc),
      );
    };
  }
  Ok(())
}

/// Partial blocks may only carry attributes that propagate to their members.
pub fn check_partial(attrs: &ExtAttrs, target: Target, owner: &str) -> IdlResult<()> {
  if let Some(attr) = attrs.iter().find(|a| !PROPAGATING.contains(&a.name.as_str())) {
    return Err(attr.error(format!(
      "[{}] is not allowed on partial {} '{}'",
      attr.name,
      target.name(),
      owner
    )));
  };
  check(attrs, target, owner)
}

/// Copies the propagating attributes of a container onto one of its members.
pub fn propagate(from: &ExtAttrs, to: &mut ExtAttrs, container: &str) -> IdlResult<()> {
  for attr in from.iter().filter(|a| PROPAGATING.contains(&a.name.as_str())) {
    if let Some(own) = to.get(&attr.name) {
      return Err(
        own
          .error(format!(
            "[{}] specified on both {} and one of its members",
            attr.name, container
          ))
          .with_location(&attr.loc),
      );
    };
    to.push(attr.clone());
  }
  Ok(())
}

/// Rules for attributes that depend on how an attribute member is declared.
pub fn check_attribute(attrs: &ExtAttrs, attribute: &Attribute, ident: &Identifier) -> IdlResult<()> {
  if !attribute.readonly {
    for name in ["PutForwards", "Replaceable", "LegacyLenientSetter", "SameObject"] {
      if let Some(attr) = attrs.get(name) {
        return Err(attr.error(format!(
          "[{}] is only allowed on readonly attributes, but '{}' is writable",
          name, ident.name
        )));
      };
    }
  } else {
    for name in ["CEReactions", "LenientFloat"] {
      if let Some(attr) = attrs.get(name) {
        return Err(attr.error(format!(
          "[{}] is not allowed on readonly attribute '{}'",
          name, ident.name
        )));
      };
    }
  };
  if attribute.is_static {
    for name in ["LegacyUnforgeable", "StoreInSlot", "Cached", "PutForwards"] {
      if let Some(attr) = attrs.get(name) {
        return Err(attr.error(format!(
          "[{}] is not allowed on static attribute '{}'",
          name, ident.name
        )));
      };
    }
  };
  if let Some(attr) = attrs.get("StoreInSlot").or_else(|| attrs.get("Cached")) {
    if !attrs.has("Pure") && !attrs.has("Constant") {
      return Err(attr.error(format!(
        "[{}] attribute '{}' must also be [Pure] or [Constant]",
        attr.name, ident.name
      )));
    };
  };
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::loc::Loc;
  use crate::loc::SourceFile;

  fn attr(name: &str, args: ExtAttrArgs) -> ExtAttr {
    ExtAttr {
      name: name.into(),
      loc: Location::new(SourceFile::new("t", "[X]"), Loc(1, 2)),
      args,
    }
  }

  #[test]
  fn unknown_attribute_names_target() {
    let attrs = ExtAttrs::new(vec![attr("Bogus", ExtAttrArgs::None)]);
    let err = check(&attrs, Target::Interface, "A").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidExtendedAttribute);
    assert!(err.message.contains("interface 'A'"));
  }

  #[test]
  fn argument_shape_is_enforced() {
    let attrs = ExtAttrs::new(vec![attr("SecureContext", ExtAttrArgs::Value("x".into()))]);
    assert!(check(&attrs, Target::Interface, "A").is_err());
    let attrs = ExtAttrs::new(vec![attr(
      "Exposed",
      ExtAttrArgs::List(vec!["Window".into(), "Worker".into()]),
    )]);
    assert!(check(&attrs, Target::Interface, "A").is_ok());
    assert_eq!(attrs.identifiers("Exposed"), vec!["Window", "Worker"]);
  }

  #[test]
  fn exclusive_pairs() {
    let attrs = ExtAttrs::new(vec![
      attr("Replaceable", ExtAttrArgs::None),
      attr("PutForwards", ExtAttrArgs::Value("x".into())),
    ]);
    let err = check(&attrs, Target::Attribute, "a").unwrap_err();
    assert_eq!(err.locations.len(), 2);
  }

  #[test]
  fn affects_values() {
    let attrs = ExtAttrs::new(vec![attr("Affects", ExtAttrArgs::Value("Sometimes".into()))]);
    assert!(check(&attrs, Target::Operation, "f").is_err());
  }

  #[test]
  fn propagation_rejects_duplicates() {
    let from = ExtAttrs::new(vec![attr("SecureContext", ExtAttrArgs::None)]);
    let mut to = ExtAttrs::default();
    propagate(&from, &mut to, "partial interface 'A'").unwrap();
    assert!(to.has("SecureContext"));
    assert!(propagate(&from, &mut to, "partial interface 'A'").is_err());
  }

  #[test]
  fn type_attrs_are_taken_out() {
    let mut attrs = ExtAttrs::new(vec![
      attr("Clamp", ExtAttrArgs::None),
      attr("BinaryName", ExtAttrArgs::Value("x".into())),
    ]);
    let t = attrs.take_type_attrs();
    assert!(t.clamp);
    assert!(!attrs.has("Clamp"));
    assert!(attrs.has("BinaryName"));
  }
}
