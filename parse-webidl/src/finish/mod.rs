//! The resolution pass.
//!
//! Runs once every file has been parsed. Definitions are finished in declaration order, but a
//! definition first finishes the ones it depends on (its parent and its included mixins), so
//! dependencies are always `Finished` before their dependents. Steps that need the whole program
//! (includes statements, iterator interfaces, dictionary containment, validation) run around that
//! loop.
use crate::ast::member::Argument;
use crate::ast::member::DeclarationKind;
use crate::ast::member::MemberKind;
use crate::ast::value::Value;
use crate::ast::DefId;
use crate::ast::Definition;
use crate::ast::FinishState;
use crate::ast::Identifier;
use crate::ast::InterfaceKind;
use crate::ast::MemberId;
use crate::ast::Program;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::error::WebIdlError;
use crate::ext_attr;
use crate::scope::Binding;
use crate::types::Type;
use crate::validate;
use std::collections::BTreeSet;
use tracing::debug;
use tracing::debug_span;
use tracing::trace;

mod exposure;
mod sugar;

impl Program {
  /// Resolves, expands and validates everything parsed so far. Returns every definition in
  /// declaration order, with synthesized iterator interfaces directly after their owners.
  pub fn finish(&mut self) -> IdlResult<Vec<DefId>> {
    let _span = debug_span!("finish", definitions = self.order.len()).entered();
    self.check_declared()?;
    self.resolve_includes()?;
    self.synthesize_iterators()?;
    for id in self.order.clone() {
      self.finish_def(id)?;
    }
    for id in self.order.clone() {
      if self.dictionary(id).is_some() {
        self.check_self_containment(id)?;
      };
    }
    validate::validate(self)?;
    Ok(self.order.clone())
  }

  fn check_declared(&self) -> IdlResult<()> {
    for (_, def) in self.definitions() {
      let (declared, partials): (bool, Vec<_>) = match def {
        Definition::Interface(i) => (i.declared, i.partials.iter().map(|f| f.loc.clone()).collect()),
        Definition::Dictionary(d) => (d.declared, d.partials.iter().map(|f| f.loc.clone()).collect()),
        _ => continue,
      };
      if !declared {
        return Err(WebIdlError::new(
          ErrorKind::MissingNonPartial,
          format!(
            "Partial {} '{}' does not have a non-partial declaration",
            def.kind_name(),
            def.ident().name
          ),
          partials,
        ));
      };
    }
    Ok(())
  }

  fn resolve_interface_of_kind(&self, ident: &Identifier, kind: InterfaceKind) -> IdlResult<DefId> {
    let id = self.find(&ident.name).ok_or_else(|| {
      ident.loc.error(
        ErrorKind::UnresolvedIdentifier,
        format!("Unresolved identifier '{}' in 'includes' statement", ident.name),
      )
    })?;
    match self.interface(id) {
      Some(i) if i.kind == kind => Ok(id),
      _ => Err(
        ident
          .loc
          .error(
            ErrorKind::InvalidInheritance,
            format!("'{}' in 'includes' statement is not an {}", ident.name, kind.name()),
          )
          .with_location(&self.def(id).ident().loc),
      ),
    }
  }

  fn resolve_includes(&mut self) -> IdlResult<()> {
    for id in self.order.clone() {
      let inc = match self.def(id) {
        Definition::Includes(inc) if inc.state != FinishState::Finished => inc.clone(),
        _ => continue,
      };
      let host = self.resolve_interface_of_kind(&inc.interface, InterfaceKind::Interface)?;
      let mixin = self.resolve_interface_of_kind(&inc.mixin, InterfaceKind::Mixin)?;
      if let Some(i) = self.interface_mut(host) {
        if !i.mixins.contains(&mixin) {
          i.mixins.push(mixin);
        };
      };
      debug!(
        interface = inc.interface.name.as_str(),
        mixin = inc.mixin.name.as_str(),
        "resolved includes statement"
      );
      self.def_mut(id).set_state(FinishState::Finished);
    }
    Ok(())
  }

  /// Finishes one definition, finishing its dependencies first. A no-op once finished.
  pub(crate) fn finish_def(&mut self, id: DefId) -> IdlResult<()> {
    match self.def(id).state() {
      FinishState::Finished => return Ok(()),
      FinishState::Finishing => {
        let ident = self.def(id).ident();
        return Err(ident.loc.error(
          ErrorKind::InheritanceCycle,
          format!("'{}' depends on itself", ident.name),
        ));
      }
      FinishState::Unfinished => {}
    };
    trace!(name = self.name_of(id), "finishing");
    self.def_mut(id).set_state(FinishState::Finishing);
    match self.def(id) {
      Definition::Interface(_) => self.finish_interface(id)?,
      Definition::Dictionary(_) => self.finish_dictionary(id)?,
      Definition::Typedef(t) => {
        let mut ty = t.ty.clone();
        ty.complete(self)?;
        if let Definition::Typedef(t) = self.def_mut(id) {
          t.ty = ty;
        };
      }
      Definition::Callback(c) => {
        let mut c = c.clone();
        c.return_type.complete(self)?;
        self.complete_arguments(&mut c.args)?;
        *self.def_mut(id) = Definition::Callback(c);
      }
      Definition::Enum(_) | Definition::Includes(_) | Definition::External(_) => {}
    };
    self.def_mut(id).set_state(FinishState::Finished);
    trace!(name = self.name_of(id), "finished");
    Ok(())
  }

  fn parent_name_of(&self, id: DefId) -> Option<&Identifier> {
    match self.def(id) {
      Definition::Interface(i) => i.parent_name.as_ref(),
      Definition::Dictionary(d) => d.parent_name.as_ref(),
      _ => None,
    }
  }

  /// Walks the chain of declared parents by name, since parents are only linked once finished.
  fn check_inheritance_cycle(&self, id: DefId) -> IdlResult<()> {
    let mut chain = vec![id];
    let mut cur = id;
    while let Some(next) = self.parent_name_of(cur).and_then(|n| self.find(&n.name)) {
      if next == id {
        let locations = chain
          .iter()
          .filter_map(|c| self.parent_name_of(*c).map(|n| n.loc.clone()))
          .collect();
        return Err(WebIdlError::new(
          ErrorKind::InheritanceCycle,
          format!("Inheritance cycle involving '{}'", self.name_of(id)),
          locations,
        ));
      };
      if chain.contains(&next) {
        break;
      };
      chain.push(next);
      cur = next;
    }
    Ok(())
  }

  /// Resolves and finishes the declared parent of an interface or dictionary.
  fn resolve_parent(&mut self, id: DefId) -> IdlResult<Option<DefId>> {
    let Some(parent_name) = self.parent_name_of(id).cloned() else {
      return Ok(None);
    };
    let def = self.def(id);
    let is_dictionary = matches!(def, Definition::Dictionary(_));
    let parent = self.find(&parent_name.name).ok_or_else(|| {
      parent_name.loc.error(
        ErrorKind::UnresolvedIdentifier,
        format!(
          "{} '{}' inherits from unknown '{}'",
          def.kind_name(),
          def.ident().name,
          parent_name.name
        ),
      )
    })?;
    let valid = match self.def(parent) {
      Definition::Interface(p) => !is_dictionary && p.kind == InterfaceKind::Interface,
      Definition::Dictionary(_) => is_dictionary,
      _ => false,
    };
    if !valid {
      return Err(
        parent_name
          .loc
          .error(
            ErrorKind::InvalidInheritance,
            format!(
              "{} '{}' cannot inherit from {} '{}'",
              def.kind_name(),
              def.ident().name,
              self.def(parent).kind_name(),
              parent_name.name
            ),
          )
          .with_location(&self.def(parent).ident().loc),
      );
    };
    if let Some(p) = self.interface(parent).filter(|p| p.is_global()) {
      return Err(
        parent_name
          .loc
          .error(
            ErrorKind::InvalidGlobal,
            format!(
              "[Global] interface '{}' cannot be inherited from by '{}'",
              p.ident.name,
              def.ident().name
            ),
          )
          .with_location(&p.ident.loc),
      );
    };
    self.check_inheritance_cycle(id)?;
    self.finish_def(parent)?;
    Ok(Some(parent))
  }

  fn finish_interface(&mut self, id: DefId) -> IdlResult<()> {
    let parent = self.resolve_parent(id)?;
    let Some(i) = self.interface_mut(id) else {
      return Ok(());
    };
    i.parent = parent;
    let kind = i.kind;
    self.merge_interface_partials(id)?;
    if kind == InterfaceKind::Mixin {
      self.propagate_mixin_attrs(id)?;
    };
    self.include_mixins(id)?;
    let members: Vec<MemberId> = self
      .interface(id)
      .map(|i| i.members.iter().chain(i.legacy_factory_functions.iter()).copied().collect())
      .unwrap_or_default();
    for m in members {
      self.complete_member(m)?;
    }
    if kind == InterfaceKind::Interface {
      self.expand_declaration(id)?;
    };
    if kind != InterfaceKind::Mixin {
      self.compute_exposure(id)?;
    };
    if kind == InterfaceKind::Interface {
      self.assign_slots(id, parent);
      self.pull_forward_unforgeables(id, parent)?;
      self.check_parent_consistency(id, parent)?;
      if self.interface(id).is_some_and(|i| i.is_global()) {
        for a in std::iter::once(id).chain(self.ancestors(id)) {
          if let Some(i) = self.interface_mut(a) {
            i.on_global_proto_chain = true;
          };
        }
      };
    };
    Ok(())
  }

  fn merge_interface_partials(&mut self, id: DefId) -> IdlResult<()> {
    let Some(i) = self.interface_mut(id) else {
      return Ok(());
    };
    let partials = std::mem::take(&mut i.partials);
    let container = format!("partial {} '{}'", i.kind.name(), i.ident.name);
    for fragment in partials {
      for m in fragment.members.iter() {
        ext_attr::propagate(&fragment.ext_attrs, &mut self.member_mut(*m).ext_attrs, &container)?;
      }
      debug!(
        name = self.name_of(id),
        members = fragment.members.len(),
        "merged partial"
      );
      if let Some(i) = self.interface_mut(id) {
        i.members.extend(fragment.members);
      };
    }
    Ok(())
  }

  fn propagate_mixin_attrs(&mut self, id: DefId) -> IdlResult<()> {
    let Some(i) = self.interface(id) else {
      return Ok(());
    };
    let attrs = i.ext_attrs.clone();
    let members = i.members.clone();
    let container = format!("interface mixin '{}'", i.ident.name);
    for m in members {
      ext_attr::propagate(&attrs, &mut self.member_mut(m).ext_attrs, &container)?;
    }
    Ok(())
  }

  /// Copies the members of every included mixin into the host.
  fn include_mixins(&mut self, host: DefId) -> IdlResult<()> {
    let Some(i) = self.interface(host) else {
      return Ok(());
    };
    let mixins = i.mixins.clone();
    let scope = i.scope;
    let host_name = i.ident.name.clone();
    for mixin in mixins {
      self.finish_def(mixin)?;
      let members = self.interface(mixin).map(|m| m.members.clone()).unwrap_or_default();
      let mut copied = Vec::new();
      for m in members {
        let mut member = self.member(m).clone();
        member.owner = host;
        member.from_mixin = Some(mixin);
        if member.ident.name.is_empty() {
          copied.push(self.add_member(member));
          continue;
        };
        if let Some(existing) = self.scopes.lookup(scope, &member.ident.name) {
          let mut err = member.ident.loc.error(
            ErrorKind::DuplicateIdentifier,
            format!(
              "Multiple definitions of '{}' on '{}' coming from 'includes' statements",
              member.ident.name, host_name
            ),
          );
          if let Binding::Member(e) = existing {
            err = err.with_location(&self.member(e).ident.loc);
          };
          return Err(err);
        };
        copied.push(self.bind_member(scope, member)?.id());
      }
      debug!(
        interface = host_name.as_str(),
        mixin = self.name_of(mixin),
        members = copied.len(),
        "included mixin"
      );
      if let Some(i) = self.interface_mut(host) {
        i.members.extend(copied);
      };
    }
    Ok(())
  }

  /// Completes argument types and coerces their default values. Optional dictionary arguments
  /// default to `{}`.
  pub(crate) fn complete_arguments(&self, args: &mut [Argument]) -> IdlResult<()> {
    for a in args.iter_mut() {
      a.ty.complete(self)?;
      let Some(ty) = a.ty.completed() else {
        continue;
      };
      a.default = match a.default.take() {
        Some(v) => Some(v.coerce(ty, self, &a.ident.loc)?),
        None if a.optional && !ty.is_nullable() && ty.includes_dictionary() => {
          Some(Value::EmptyDictionary)
        }
        None => None,
      };
    }
    Ok(())
  }

  fn complete_member(&mut self, id: MemberId) -> IdlResult<()> {
    let mut member = self.member(id).clone();
    match &mut member.kind {
      MemberKind::Const(c) => {
        c.ty.complete(self)?;
        if let Some(ty) = c.ty.completed() {
          if ty.is_nullable() || !ty.builtin().is_some_and(|b| b.is_primitive()) {
            return Err(c.ty.loc().error(
              ErrorKind::InvalidType,
              format!(
                "Constant '{}' must have a primitive type, not {}",
                member.ident.name,
                ty.name(self)
              ),
            ));
          };
          c.value = c.value.coerce(ty, self, &member.ident.loc)?;
        };
      }
      MemberKind::Attribute(a) => a.ty.complete(self)?,
      MemberKind::Method(m) => {
        for o in m.overloads.iter_mut() {
          o.return_type.complete(self)?;
          self.complete_arguments(&mut o.args)?;
        }
      }
      MemberKind::Declaration(d) => {
        if let Some(k) = d.key_type.as_mut() {
          k.complete(self)?;
        };
        d.value_type.complete(self)?;
        self.complete_arguments(&mut d.args)?;
      }
    };
    *self.member_mut(id) = member;
    Ok(())
  }

  fn assign_slots(&mut self, id: DefId, parent: Option<DefId>) {
    let start = parent.and_then(|p| self.interface(p)).map_or(0, |p| p.total_slots);
    let members = self.interface(id).map(|i| i.members.clone()).unwrap_or_default();
    let mut next = start;
    for m in members {
      let member = self.member_mut(m);
      if member.owner != id {
        continue;
      };
      let cached = member.ext_attrs.has("StoreInSlot") || member.ext_attrs.has("Cached");
      let slot = match &mut member.kind {
        MemberKind::Attribute(a) if cached => &mut a.slot_index,
        MemberKind::Declaration(d)
          if matches!(d.kind, DeclarationKind::Maplike | DeclarationKind::Setlike) =>
        {
          &mut d.slot_index
        }
        _ => continue,
      };
      *slot = Some(next);
      next += 1;
    }
    if next > start {
      debug!(
        interface = self.name_of(id),
        slots = next - start,
        total = next,
        "assigned slots"
      );
    };
    if let Some(i) = self.interface_mut(id) {
      i.total_slots = next;
    };
  }

  /// Makes the parent's `[LegacyUnforgeable]` members members of this interface too, rejecting any
  /// attempt to shadow them.
  fn pull_forward_unforgeables(&mut self, id: DefId, parent: Option<DefId>) -> IdlResult<()> {
    let Some(p) = parent.and_then(|p| self.interface(p)) else {
      return Ok(());
    };
    let parent_name = p.ident.name.clone();
    let inherited: Vec<MemberId> = p
      .members
      .iter()
      .copied()
      .filter(|m| self.member(*m).ext_attrs.has("LegacyUnforgeable"))
      .collect();
    let Some(i) = self.interface(id) else {
      return Ok(());
    };
    for m in inherited.iter() {
      let member = self.member(*m);
      if let Some(Binding::Member(own)) = self.scopes.lookup(i.scope, &member.ident.name) {
        return Err(
          self
            .member(own)
            .ident
            .loc
            .error(
              ErrorKind::InvalidMember,
              format!(
                "'{}' shadows [LegacyUnforgeable] member '{}' of '{}'",
                i.ident.name, member.ident.name, parent_name
              ),
            )
            .with_location(&member.ident.loc),
        );
      };
    }
    if let Some(i) = self.interface_mut(id) {
      i.members.extend(inherited);
    };
    Ok(())
  }

  fn check_parent_consistency(&self, id: DefId, parent: Option<DefId>) -> IdlResult<()> {
    let (Some(i), Some(p)) = (self.interface(id), parent.and_then(|p| self.interface(p))) else {
      return Ok(());
    };
    for attr in ["SecureContext", "LegacyNoInterfaceObject"] {
      if p.ext_attrs.has(attr) && !i.ext_attrs.has(attr) {
        return Err(
          i.ident
            .loc
            .error(
              ErrorKind::InvalidInheritance,
              format!(
                "Interface '{}' must be [{}] since it inherits from '{}', which is",
                i.ident.name, attr, p.ident.name
              ),
            )
            .with_location(&p.ident.loc),
        );
      };
    }
    Ok(())
  }

  fn finish_dictionary(&mut self, id: DefId) -> IdlResult<()> {
    let parent = self.resolve_parent(id)?;
    let Some(d) = self.dictionary_mut(id) else {
      return Ok(());
    };
    d.parent = parent;
    for fragment in std::mem::take(&mut d.partials) {
      debug!(
        name = d.ident.name.as_str(),
        members = fragment.members.len(),
        "merged partial"
      );
      d.members.extend(fragment.members);
    }
    let mut dict = d.clone();
    for (n, m) in dict.members.iter().enumerate() {
      if let Some(prev) = dict.members[..n].iter().find(|p| p.ident.name == m.ident.name) {
        return Err(
          m.ident
            .loc
            .error(
              ErrorKind::DuplicateIdentifier,
              format!(
                "Dictionary '{}' declares member '{}' more than once",
                dict.ident.name, m.ident.name
              ),
            )
            .with_location(&prev.ident.loc),
        );
      };
      for ancestor in self.ancestors(id) {
        let Some(a) = self.dictionary(ancestor) else {
          continue;
        };
        if let Some(prev) = a.members.iter().find(|p| p.ident.name == m.ident.name) {
          return Err(
            m.ident
              .loc
              .error(
                ErrorKind::DuplicateIdentifier,
                format!(
                  "Dictionary '{}' member '{}' is also declared by ancestor '{}'",
                  dict.ident.name, m.ident.name, a.ident.name
                ),
              )
              .with_location(&prev.ident.loc),
          );
        };
      }
    }
    for m in dict.members.iter_mut() {
      m.ty.complete(self)?;
      let Some(ty) = m.ty.completed() else {
        continue;
      };
      if ty.is_undefined() {
        return Err(m.ident.loc.error(
          ErrorKind::InvalidType,
          format!("Dictionary member '{}' cannot be of type undefined", m.ident.name),
        ));
      };
      if m.required && m.default.is_some() {
        return Err(m.ident.loc.error(
          ErrorKind::InvalidMember,
          format!("Required dictionary member '{}' cannot have a default value", m.ident.name),
        ));
      };
      if let Some(v) = m.default.take() {
        m.default = Some(v.coerce(ty, self, &m.ident.loc)?);
      };
    }
    if self.options.sort_dictionary_members {
      dict.members.sort_by(|a, b| a.ident.name.cmp(&b.ident.name));
    };
    *self.def_mut(id) = Definition::Dictionary(dict);
    Ok(())
  }

  fn check_self_containment(&self, id: DefId) -> IdlResult<()> {
    for owner in std::iter::once(id).chain(self.ancestors(id)) {
      let Some(d) = self.dictionary(owner) else {
        continue;
      };
      for m in d.members.iter() {
        let Some(ty) = m.ty.completed() else {
          continue;
        };
        if self.type_contains_dictionary(ty, id, &mut BTreeSet::new()) {
          let dict = self.def(id).ident();
          return Err(
            m.ident
              .loc
              .error(
                ErrorKind::SelfContainingDictionary,
                format!(
                  "Dictionary '{}' has member '{}' whose type contains the dictionary itself",
                  dict.name, m.ident.name
                ),
              )
              .with_location(&dict.loc),
          );
        };
      }
    }
    Ok(())
  }

  fn type_contains_dictionary(&self, ty: &Type, target: DefId, seen: &mut BTreeSet<DefId>) -> bool {
    match ty {
      Type::Annotated(t, _)
      | Type::Nullable(t)
      | Type::Sequence(t)
      | Type::FrozenArray(t)
      | Type::ObservableArray(t)
      | Type::Record(_, t) => self.type_contains_dictionary(t, target, seen),
      Type::Union(members) => members
        .iter()
        .any(|m| self.type_contains_dictionary(m, target, seen)),
      Type::Dictionary(d) => self.dictionary_contains(*d, target, seen),
      _ => false,
    }
  }

  fn dictionary_contains(&self, dict: DefId, target: DefId, seen: &mut BTreeSet<DefId>) -> bool {
    if dict == target {
      return true;
    };
    if !seen.insert(dict) {
      return false;
    };
    for owner in std::iter::once(dict).chain(self.ancestors(dict)) {
      if owner == target {
        return true;
      };
      let Some(d) = self.dictionary(owner) else {
        continue;
      };
      for m in d.members.iter() {
        if let Some(t) = m.ty.completed() {
          if self.type_contains_dictionary(t, target, seen) {
            return true;
          };
        };
      }
    }
    false
  }
}
