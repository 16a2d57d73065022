use crate::ast::DefId;
use crate::ast::MemberId;
use crate::ast::Program;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::ext_attr::ExtAttrArgs;
use crate::ext_attr::ExtAttrs;
use std::collections::BTreeSet;

fn describe(names: &BTreeSet<String>) -> String {
  names.iter().cloned().collect::<Vec<_>>().join(", ")
}

impl Program {
  /// Interfaces declaring any of the given global names. Exposure sets are compared in these
  /// terms, so two names declared by the same global interface are interchangeable.
  fn global_interfaces<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> BTreeSet<String> {
    names
      .into_iter()
      .filter_map(|n| self.scopes.global_name_owners(n))
      .flatten()
      .cloned()
      .collect()
  }

  /// The global interfaces named by `[Exposed]`, with `*` standing for every known global name.
  pub(crate) fn exposed_names(&self, attrs: &ExtAttrs) -> IdlResult<Option<BTreeSet<String>>> {
    let Some(attr) = attrs.get("Exposed") else {
      return Ok(None);
    };
    let listed = match &attr.args {
      ExtAttrArgs::Value(v) => vec![v.as_str()],
      ExtAttrArgs::List(vs) => vs.iter().map(|v| v.as_str()).collect(),
      _ => Vec::new(),
    };
    let mut names = BTreeSet::new();
    for name in listed {
      if name == "*" {
        names.extend(self.global_interfaces(self.scopes.global_names()));
      } else if self.scopes.is_global_name(name) {
        names.extend(self.global_interfaces([name]));
      } else {
        return Err(attr.error(format!("Unknown global name '{}' in [Exposed]", name)));
      };
    }
    Ok(Some(names))
  }

  /// Computes the exposure set of an interface-like definition and of each of its members.
  ///
  /// Without `[Exposed]`, an iterator interface takes its owner's exposure and anything else is
  /// exposed only in the primary global. Members copied from a mixin are limited to the host's
  /// exposure and must keep at least one global; other members may not exceed it.
  pub(super) fn compute_exposure(&mut self, id: DefId) -> IdlResult<()> {
    let Some(i) = self.interface(id) else {
      return Ok(());
    };
    let exposure = match (self.exposed_names(&i.ext_attrs)?, i.iterator_of) {
      (Some(names), _) => names,
      (None, Some(owner)) => self
        .interface(owner)
        .map(|o| o.exposure.clone())
        .unwrap_or_default(),
      (None, None) => self.global_interfaces([self.options.primary_global.as_str()]),
    };
    if let Some(p) = i.parent.and_then(|p| self.interface(p)) {
      let extra: BTreeSet<String> = exposure.difference(&p.exposure).cloned().collect();
      if !extra.is_empty() {
        return Err(
          i.ident
            .loc
            .error(
              ErrorKind::ExposureViolation,
              format!(
                "Interface '{}' is exposed in {} where its parent '{}' is not",
                i.ident.name,
                describe(&extra),
                p.ident.name
              ),
            )
            .with_location(&p.ident.loc),
        );
      };
    };
    let name = i.ident.name.clone();
    let i_loc = i.ident.loc.clone();
    let members: Vec<MemberId> = i
      .members
      .iter()
      .chain(i.legacy_factory_functions.iter())
      .copied()
      .collect();
    for m in members {
      let member = self.member(m);
      let own = self.exposed_names(&member.ext_attrs)?;
      let member_exposure = match own {
        None => exposure.clone(),
        Some(own) if member.from_mixin.is_some() => {
          let shared: BTreeSet<String> = own.intersection(&exposure).cloned().collect();
          if shared.is_empty() {
            let mixin = member.from_mixin.map_or("", |m| self.name_of(m));
            return Err(
              member
                .ident
                .loc
                .error(
                  ErrorKind::ExposureViolation,
                  format!(
                    "Member '{}' of mixin '{}' is exposed in {}, none of which '{}' is exposed in",
                    member.ident.name,
                    mixin,
                    describe(&own),
                    name
                  ),
                )
                .with_location(&i_loc),
            );
          };
          shared
        }
        Some(own) => {
          let extra: BTreeSet<String> = own.difference(&exposure).cloned().collect();
          if !extra.is_empty() {
            return Err(member.ident.loc.error(
              ErrorKind::ExposureViolation,
              format!(
                "Member '{}' is exposed in {} where its container '{}' is not",
                member.ident.name,
                describe(&extra),
                name
              ),
            ));
          };
          own
        }
      };
      self.member_mut(m).exposure = member_exposure;
    }
    if let Some(i) = self.interface_mut(id) {
      i.exposure = exposure;
    };
    Ok(())
  }
}
