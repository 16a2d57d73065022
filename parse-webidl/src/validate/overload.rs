//! The overload distinguishing-index algorithm.
//!
//! For every argument count a method can be called with, the overloads callable with that many
//! arguments must differ at some argument position in a way a caller's value can tell apart, and
//! must agree on the types of every argument before that position.
use crate::ast::member::Overload;
use crate::ast::Program;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::error::WebIdlError;
use crate::types::Type;

/// One overload as seen when called with a particular number of arguments.
struct Entry<'a> {
  overload: &'a Overload,
  types: Vec<Option<&'a Type>>,
}

/// Overloads callable with `count` arguments, with the argument types they would see. A variadic
/// final argument repeats as often as needed.
fn effective_set(overloads: &[Overload], count: usize) -> Vec<Entry<'_>> {
  let mut out = Vec::new();
  for o in overloads {
    let required = o.args.iter().filter(|a| !a.optional && !a.variadic).count();
    let variadic = o.args.last().is_some_and(|a| a.variadic);
    if count < required || (count > o.args.len() && !variadic) {
      continue;
    };
    let types = (0..count)
      .map(|n| o.args.get(n).or(o.args.last()).and_then(|a| a.ty.completed()))
      .collect();
    out.push(Entry { overload: o, types });
  }
  out
}

fn all_pairs<'a, F: Fn(&Entry<'a>, &Entry<'a>) -> bool>(set: &[Entry<'a>], pred: F) -> bool {
  set
    .iter()
    .enumerate()
    .all(|(n, a)| set[n + 1..].iter().all(|b| pred(a, b)))
}

fn error(name: &str, set: &[Entry<'_>], message: String) -> WebIdlError {
  WebIdlError::new(
    ErrorKind::IndistinguishableOverloads,
    format!("{} of '{}'", message, name),
    set.iter().map(|e| e.overload.loc.clone()).collect(),
  )
}

/// The smallest argument index at which every pair of overloads in the set is distinguishable.
fn distinguishing_index(program: &Program, set: &[Entry<'_>], count: usize) -> Option<usize> {
  (0..count).find(|n| {
    all_pairs(set, |a, b| match (a.types[*n], b.types[*n]) {
      (Some(x), Some(y)) => x.is_distinguishable_from(y, program),
      _ => true,
    })
  })
}

/// Checks the overloads of one method.
pub(super) fn check(program: &Program, name: &str, overloads: &[Overload]) -> IdlResult<()> {
  if overloads.len() < 2 {
    return Ok(());
  };
  let max = overloads.iter().map(|o| o.args.len()).max().unwrap_or(0);
  for count in 0..=max {
    let set = effective_set(overloads, count);
    if set.len() < 2 {
      continue;
    };
    let Some(index) = distinguishing_index(program, &set, count) else {
      return Err(error(
        name,
        &set,
        format!("Overloads are not distinguishable for {} arguments", count),
      ));
    };
    for n in 0..index {
      if !all_pairs(&set, |a, b| a.types[n] == b.types[n]) {
        return Err(error(
          name,
          &set,
          format!(
            "Overloads called with {} arguments must agree on the type of argument {} before the distinguishing index {}",
            count, n, index
          ),
        ));
      };
    }
  }
  Ok(())
}
