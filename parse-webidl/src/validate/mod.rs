//! Whole-program checks over finished definitions.
//!
//! Everything here only reads the program. Members pulled forward from a parent are validated on
//! the interface that declared them, not on every descendant.
use crate::ast::member::Argument;
use crate::ast::member::Attribute;
use crate::ast::member::Member;
use crate::ast::member::MemberKind;
use crate::ast::member::MethodKind;
use crate::ast::member::Overload;
use crate::ast::member::Special;
use crate::ast::DefId;
use crate::ast::Definition;
use crate::ast::Interface;
use crate::ast::InterfaceKind;
use crate::ast::MemberId;
use crate::ast::Program;
use crate::builtins::BuiltinType;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::ext_attr::ExtAttrArgs;
use crate::loc::Location;
use crate::types::Type;
use crate::types::TypeSlot;
use ahash::HashMap;
use ahash::HashMapExt;
use tracing::debug_span;

mod overload;

/// A kind of special operation, of which an interface may have at most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Accessor {
  IndexedGetter,
  NamedGetter,
  IndexedSetter,
  NamedSetter,
  NamedDeleter,
  Stringifier,
  LegacyCaller,
}

impl Accessor {
  fn describe(self) -> &'static str {
    match self {
      Accessor::IndexedGetter => "indexed getter",
      Accessor::NamedGetter => "named getter",
      Accessor::IndexedSetter => "indexed setter",
      Accessor::NamedSetter => "named setter",
      Accessor::NamedDeleter => "named deleter",
      Accessor::Stringifier => "stringifier",
      Accessor::LegacyCaller => "legacycaller",
    }
  }

  fn of(special: Special, overload: &Overload) -> Accessor {
    let indexed = overload
      .args
      .first()
      .and_then(|a| a.ty.completed())
      .is_some_and(|t| t.is(BuiltinType::UnsignedLong));
    match (special, indexed) {
      (Special::Getter, true) => Accessor::IndexedGetter,
      (Special::Getter, false) => Accessor::NamedGetter,
      (Special::Setter, true) => Accessor::IndexedSetter,
      (Special::Setter, false) => Accessor::NamedSetter,
      (Special::Deleter, _) => Accessor::NamedDeleter,
      (Special::Stringifier, _) => Accessor::Stringifier,
      (Special::LegacyCaller, _) => Accessor::LegacyCaller,
    }
  }
}

/// Checks every finished definition.
pub fn validate(program: &Program) -> IdlResult<()> {
  let _span = debug_span!("validate").entered();
  let v = Validator { program };
  for (id, def) in program.definitions() {
    match def {
      Definition::Interface(i) => v.interface(id, i)?,
      Definition::Dictionary(d) => {
        for m in d.members.iter() {
          v.unions(&m.ty)?;
        }
      }
      Definition::Typedef(t) => v.unions(&t.ty)?,
      Definition::Callback(c) => {
        v.unions(&c.return_type)?;
        v.arguments(&c.args, &c.ident.name)?;
      }
      Definition::Enum(_) | Definition::Includes(_) | Definition::External(_) => {}
    };
  }
  Ok(())
}

struct Validator<'a> {
  program: &'a Program,
}

impl<'a> Validator<'a> {
  fn interface(&self, id: DefId, i: &Interface) -> IdlResult<()> {
    let own: Vec<&Member> = i
      .members
      .iter()
      .chain(i.legacy_factory_functions.iter())
      .map(|m| self.program.member(*m))
      .filter(|m| m.owner == id)
      .collect();
    for m in own.iter() {
      self.member(i, m)?;
      if i.kind != InterfaceKind::Mixin {
        self.member_exposure(i, m)?;
      };
    }
    if i.kind == InterfaceKind::Mixin {
      return Ok(());
    };
    let accessors = self.accessors(i, &own)?;
    if i.on_global_proto_chain {
      for a in [Accessor::NamedSetter, Accessor::NamedDeleter] {
        if let Some(loc) = accessors.get(&a) {
          return Err(loc.error(
            ErrorKind::InvalidGlobal,
            format!(
              "Interface '{}' is on the prototype chain of a [Global] interface and cannot have a {}",
              i.ident.name,
              a.describe()
            ),
          ));
        };
      }
    };
    self.declaration(id, i, &accessors)?;
    if i.kind == InterfaceKind::CallbackInterface {
      let operations = own
        .iter()
        .filter(|m| {
          m.as_method()
            .is_some_and(|o| o.kind == MethodKind::Regular && !o.is_static)
        })
        .count();
      if operations != 1 {
        return Err(i.ident.loc.error(
          ErrorKind::InvalidMember,
          format!(
            "Callback interface '{}' must have exactly one regular operation, not {}",
            i.ident.name, operations
          ),
        ));
      };
    };
    Ok(())
  }

  fn member(&self, i: &Interface, m: &Member) -> IdlResult<()> {
    for slot in m.type_slots() {
      self.unions(slot)?;
    }
    if let Some(attr) = m.ext_attrs.get("Default") {
      if m.ident.name != "toJSON" || m.as_method().is_none() {
        return Err(attr.error(format!(
          "[Default] is only allowed on toJSON operations, not '{}'",
          m.ident.name
        )));
      };
    };
    match &m.kind {
      MemberKind::Attribute(a) => self.attribute(m, a),
      MemberKind::Method(method) => {
        let name = if m.ident.name.is_empty() {
          i.ident.name.as_str()
        } else {
          m.ident.name.as_str()
        };
        for o in method.overloads.iter() {
          self.arguments(&o.args, name)?;
          for s in o.specials.iter() {
            special_signature(*s, o)?;
          }
        }
        if let Some(attr) = m.ext_attrs.get("LenientFloat") {
          let ok = method.overloads.iter().all(|o| {
            o.return_type.completed().is_some_and(|t| t.is_undefined())
              && o.args.iter().any(|a| is_restricted_float(&a.ty))
          });
          if !ok {
            return Err(attr.error(format!(
              "[LenientFloat] operation '{}' must return undefined and take a float or double argument",
              name
            )));
          };
        };
        overload::check(self.program, name, &method.overloads)
      }
      MemberKind::Declaration(d) => {
        if let Some(a) = d.args.iter().find(|a| !a.optional) {
          return Err(a.ident.loc.error(
            ErrorKind::InvalidSignature,
            format!(
              "Arguments of the async iterable declaration on '{}' must all be optional, but '{}' is not",
              i.ident.name, a.ident.name
            ),
          ));
        };
        Ok(())
      }
      MemberKind::Const(_) => Ok(()),
    }
  }

  fn attribute(&self, m: &Member, a: &Attribute) -> IdlResult<()> {
    let Some(ty) = a.ty.completed() else {
      return Ok(());
    };
    let name = &m.ident.name;
    let invalid = |msg: String| Err(a.ty.loc().error(ErrorKind::InvalidType, msg));
    if ty.is_undefined() {
      return invalid(format!("Attribute '{}' cannot be of type undefined", name));
    };
    let forbidden = |t: &Type| t.is_sequence_or_record() || matches!(t.inner(), Type::Dictionary(_));
    if forbidden(ty) || ty.flattened_members().into_iter().any(forbidden) {
      return invalid(format!(
        "Attribute '{}' cannot be of type {}, which is or contains a sequence, record or dictionary",
        name,
        ty.name(self.program)
      ));
    };
    if ty.is_promise() && !a.readonly {
      return Err(m.ident.loc.error(
        ErrorKind::InvalidMember,
        format!("Promise-typed attribute '{}' must be readonly", name),
      ));
    };
    if a.stringifier && !ty.is_string() {
      return Err(m.ident.loc.error(
        ErrorKind::InvalidMember,
        format!(
          "Stringifier attribute '{}' must be of a string type, not {}",
          name,
          ty.name(self.program)
        ),
      ));
    };
    if let Some(attr) = m.ext_attrs.get("LenientFloat") {
      if !is_restricted_float(&a.ty) {
        return Err(attr.error(format!(
          "[LenientFloat] attribute '{}' must be of type float or double",
          name
        )));
      };
    };
    if let Some(attr) = m.ext_attrs.get("PutForwards") {
      let target = match ty.inner() {
        Type::Interface(t) => self.program.interface(*t),
        _ => None,
      };
      let Some(target) = target.filter(|t| t.kind == InterfaceKind::Interface) else {
        return Err(attr.error(format!(
          "[PutForwards] attribute '{}' must be of an interface type",
          name
        )));
      };
      let forwarded = attr_value(&attr.args);
      let found = self.find_in_chain(target, |m| {
        m.ident.name == forwarded && m.as_attribute().is_some_and(|a| !a.is_static)
      });
      if found.is_none() {
        return Err(
          attr
            .error(format!(
              "[PutForwards] on '{}' names '{}', which is not an attribute of '{}'",
              name, forwarded, target.ident.name
            ))
            .with_location(&target.ident.loc),
        );
      };
    };
    Ok(())
  }

  /// Finds a member of an interface or one of its ancestors.
  fn find_in_chain(&self, i: &Interface, pred: impl Fn(&Member) -> bool) -> Option<MemberId> {
    let owners = self
      .program
      .find(&i.ident.name)
      .map(|id| {
        let mut owners = vec![id];
        owners.extend(self.program.ancestors(id));
        owners
      })
      .unwrap_or_default();
    owners
      .into_iter()
      .filter_map(|o| self.program.interface(o))
      .flat_map(|o| o.members.iter().copied())
      .find(|m| pred(self.program.member(*m)))
  }

  /// Argument lists of operations, constructors and callbacks.
  fn arguments(&self, args: &[Argument], owner: &str) -> IdlResult<()> {
    for (n, a) in args.iter().enumerate() {
      let Some(ty) = a.ty.completed() else {
        continue;
      };
      self.unions(&a.ty)?;
      if ty.is_undefined() {
        return Err(a.ty.loc().error(
          ErrorKind::InvalidType,
          format!("Argument '{}' of '{}' cannot be of type undefined", a.ident.name, owner),
        ));
      };
      let rest = &args[n + 1..];
      if a.optional {
        if let Some(required) = rest.iter().find(|r| !r.optional && !r.variadic) {
          return Err(
            required
              .ident
              .loc
              .error(
                ErrorKind::InvalidSignature,
                format!(
                  "Required argument '{}' of '{}' follows optional argument '{}'",
                  required.ident.name, owner, a.ident.name
                ),
              )
              .with_location(&a.ident.loc),
          );
        };
        continue;
      };
      if a.variadic || !ty.includes_dictionary() {
        continue;
      };
      let trailing_optional = rest.iter().all(|r| r.optional || r.variadic);
      if trailing_optional && !self.has_required_dictionary_member(ty) {
        return Err(a.ident.loc.error(
          ErrorKind::InvalidSignature,
          format!(
            "Dictionary argument '{}' of '{}' has no required members and must be optional",
            a.ident.name, owner
          ),
        ));
      };
    }
    Ok(())
  }

  fn has_required_dictionary_member(&self, ty: &Type) -> bool {
    let dicts: Vec<DefId> = std::iter::once(ty.inner())
      .chain(ty.flattened_members())
      .filter_map(|t| match t {
        Type::Dictionary(d) => Some(*d),
        _ => None,
      })
      .collect();
    dicts.into_iter().any(|d| {
      std::iter::once(d)
        .chain(self.program.ancestors(d))
        .filter_map(|a| self.program.dictionary(a))
        .any(|dict| dict.members.iter().any(|m| m.required))
    })
  }

  /// Every union inside a type must have pairwise distinguishable flattened members.
  fn unions(&self, slot: &TypeSlot) -> IdlResult<()> {
    let Some(ty) = slot.completed() else {
      return Ok(());
    };
    for union in ty.unions() {
      let members = union.flattened_members();
      for (n, a) in members.iter().enumerate() {
        for b in members[n + 1..].iter() {
          if !a.is_distinguishable_from(b, self.program) {
            return Err(slot.loc().error(
              ErrorKind::IndistinguishableUnion,
              format!(
                "Flat member types of a union should be distinguishable, but {} and {} are not",
                a.name(self.program),
                b.name(self.program)
              ),
            ));
          };
        }
      }
    }
    Ok(())
  }

  /// Interfaces a member refers to must be exposed wherever the member is.
  fn member_exposure(&self, i: &Interface, m: &Member) -> IdlResult<()> {
    let mut referenced = Vec::new();
    for slot in m.type_slots() {
      if let Some(t) = slot.completed() {
        t.referenced_defs(&mut referenced);
      };
    }
    for r in referenced {
      let Some(target) = self.program.interface(r) else {
        continue;
      };
      if target.kind != InterfaceKind::Interface {
        continue;
      };
      let missing: Vec<&str> = m
        .exposure
        .difference(&target.exposure)
        .map(|s| s.as_str())
        .collect();
      if !missing.is_empty() {
        return Err(
          m.ident
            .loc
            .error(
              ErrorKind::ExposureViolation,
              format!(
                "'{}' of '{}' is exposed in {} where its type '{}' is not",
                m.ident.name,
                i.ident.name,
                missing.join(", "),
                target.ident.name
              ),
            )
            .with_location(&target.ident.loc),
        );
      };
    }
    Ok(())
  }

  /// Records where each special operation is declared, rejecting duplicates and setters without
  /// getters.
  fn accessors(&self, i: &Interface, own: &[&Member]) -> IdlResult<HashMap<Accessor, Location>> {
    let mut seen: HashMap<Accessor, Location> = HashMap::new();
    let mut record = |a: Accessor, loc: &Location| -> IdlResult<()> {
      if let Some(prev) = seen.get(&a) {
        return Err(
          loc
            .error(
              ErrorKind::InvalidMember,
              format!("Interface '{}' has more than one {}", i.ident.name, a.describe()),
            )
            .with_location(prev),
        );
      };
      seen.insert(a, loc.clone());
      Ok(())
    };
    for m in own.iter() {
      match &m.kind {
        MemberKind::Attribute(a) if a.stringifier => record(Accessor::Stringifier, &m.ident.loc)?,
        MemberKind::Method(method) => {
          for o in method.overloads.iter() {
            for s in o.specials.iter() {
              record(Accessor::of(*s, o), &o.loc)?;
            }
          }
        }
        _ => {}
      };
    }
    for (setter, getter) in [
      (Accessor::IndexedSetter, Accessor::IndexedGetter),
      (Accessor::NamedSetter, Accessor::NamedGetter),
    ] {
      if let (Some(loc), false) = (seen.get(&setter), seen.contains_key(&getter)) {
        return Err(loc.error(
          ErrorKind::InvalidMember,
          format!(
            "Interface '{}' has an {} but no {}",
            i.ident.name,
            setter.describe(),
            getter.describe()
          ),
        ));
      };
    }
    Ok(seen)
  }

  /// Rules for the iterable, maplike and setlike declaration of an interface.
  fn declaration(&self, id: DefId, i: &Interface, accessors: &HashMap<Accessor, Location>) -> IdlResult<()> {
    let Some(decl_id) = i.declaration else {
      return Ok(());
    };
    let decl = self.program.member(decl_id);
    let Some(d) = decl.as_declaration() else {
      return Ok(());
    };
    let invalid = |msg: String| decl.ident.loc.error(ErrorKind::InvalidIterable, msg);
    for a in self.program.ancestors(id) {
      let Some(p) = self.program.interface(a) else {
        continue;
      };
      if let Some(pd) = p.declaration {
        return Err(
          invalid(format!(
            "Interface '{}' declares {} but its ancestor '{}' already declares {}",
            i.ident.name,
            d.kind.keyword(),
            p.ident.name,
            self.program.member(pd).kind_name()
          ))
          .with_location(&self.program.member(pd).ident.loc),
        );
      };
    }
    if d.is_pair_iterator() {
      if let Some(loc) = accessors.get(&Accessor::IndexedGetter) {
        return Err(
          invalid(format!(
            "Pair iterator interface '{}' must not have an indexed getter",
            i.ident.name
          ))
          .with_location(loc),
        );
      };
    };
    if d.is_value_iterator() {
      let getter = self.find_in_chain(i, |m| {
        m.as_method().is_some_and(|method| {
          method.overloads.iter().any(|o| {
            o.has_special(Special::Getter) && Accessor::of(Special::Getter, o) == Accessor::IndexedGetter
          })
        })
      });
      let Some(getter) = getter else {
        return Err(invalid(format!(
          "Value iterator interface '{}' must support indexed properties",
          i.ident.name
        )));
      };
      let length = self.find_in_chain(i, |m| {
        m.ident.name == "length"
          && m
            .as_attribute()
            .and_then(|a| a.ty.completed())
            .and_then(|t| t.builtin())
            .is_some_and(|b| b.is_integer())
      });
      if length.is_none() {
        return Err(invalid(format!(
          "Value iterator interface '{}' must have an integer-typed 'length' attribute",
          i.ident.name
        )));
      };
      let getter_type = self
        .program
        .member(getter)
        .as_method()
        .and_then(|method| method.overloads.iter().find(|o| o.has_special(Special::Getter)))
        .and_then(|o| o.return_type.completed());
      let value_type = d.value_type.completed();
      if let (Some(g), Some(v)) = (getter_type, value_type) {
        if g.unannotated() != v.unannotated() {
          return Err(
            invalid(format!(
              "Value iterator of '{}' iterates {} but its indexed getter returns {}",
              i.ident.name,
              v.name(self.program),
              g.name(self.program)
            ))
            .with_location(&self.program.member(getter).ident.loc),
          );
        };
      };
    };
    Ok(())
  }
}

fn attr_value(args: &ExtAttrArgs) -> &str {
  match args {
    ExtAttrArgs::Value(v) => v.as_str(),
    _ => "",
  }
}

fn is_restricted_float(slot: &TypeSlot) -> bool {
  slot
    .completed()
    .and_then(|t| t.builtin())
    .is_some_and(|b| b.is_restricted_float())
}

/// Argument counts and types of getters, setters, deleters and stringifiers.
fn special_signature(special: Special, o: &Overload) -> IdlResult<()> {
  let arg_type = |n: usize| o.args.get(n).and_then(|a| a.ty.completed());
  let is_key = |t: Option<&Type>| {
    t.is_some_and(|t| !t.is_nullable() && (t.is(BuiltinType::UnsignedLong) || t.is(BuiltinType::DomString)))
  };
  let plain = o.args.iter().all(|a| !a.optional && !a.variadic);
  let problem = match special {
    Special::Getter if o.args.len() != 1 || !is_key(arg_type(0)) => {
      Some("takes exactly one unsigned long or DOMString argument")
    }
    Special::Setter if o.args.len() != 2 || !is_key(arg_type(0)) => {
      Some("takes exactly two arguments, the first an unsigned long or DOMString")
    }
    Special::Deleter if o.args.len() != 1 || arg_type(0).map(|t| t.is(BuiltinType::DomString)) != Some(true) => {
      Some("takes exactly one DOMString argument")
    }
    Special::Getter | Special::Setter | Special::Deleter if !plain => {
      Some("cannot have optional or variadic arguments")
    }
    Special::Stringifier if !o.args.is_empty() => Some("takes no arguments"),
    Special::Stringifier if !o.return_type.completed().is_some_and(|t| t.is_string()) => {
      Some("must return a string type")
    }
    _ => None,
  };
  match problem {
    Some(p) => Err(o.loc.error(
      ErrorKind::InvalidSignature,
      format!("A {} {}", special.keyword(), p),
    )),
    None => Ok(()),
  }
}
