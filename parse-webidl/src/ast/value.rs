use super::Program;
use crate::builtins::BuiltinType;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::loc::Location;
use crate::num::IdlFloat;
use crate::types::Type;
use serde::Serialize;

/// A constant value or default value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Value {
  Integer(i128),
  Float(IdlFloat),
  Boolean(bool),
  String(String),
  Null,
  Undefined,
  EmptySequence,
  EmptyDictionary,
}

impl Value {
  pub fn describe(&self) -> String {
    match self {
      Value::Integer(v) => v.to_string(),
      Value::Float(v) => v.to_string(),
      Value::Boolean(v) => v.to_string(),
      Value::String(v) => format!("\"{}\"", v),
      Value::Null => "null".into(),
      Value::Undefined => "undefined".into(),
      Value::EmptySequence => "[]".into(),
      Value::EmptyDictionary => "{}".into(),
    }
  }

  /// Converts this value to one of type `ty`, failing if it is not a valid value of that type.
  /// Integers become floats when the target is a floating point type.
  pub fn coerce(&self, ty: &Type, program: &Program, loc: &Location) -> IdlResult<Value> {
    self.try_coerce(ty, program).ok_or_else(|| {
      loc.error(
        ErrorKind::InvalidValue,
        format!(
          "Value {} is not valid for type {}",
          self.describe(),
          ty.name(program)
        ),
      )
    })
  }

  fn try_coerce(&self, ty: &Type, program: &Program) -> Option<Value> {
    match ty {
      Type::Annotated(t, _) => return self.try_coerce(t, program),
      Type::Nullable(t) => {
        return match self {
          Value::Null => Some(Value::Null),
          v => v.try_coerce(t, program),
        }
      }
      Type::Union(_) => {
        if *self == Value::Null && ty.includes_nullable() {
          return Some(Value::Null);
        };
        return ty
          .flattened_members()
          .into_iter()
          .find_map(|m| self.try_coerce(m, program));
      }
      _ => {}
    };
    match (self, ty) {
      (v, Type::Builtin(BuiltinType::Any)) => Some(v.clone()),
      (Value::Undefined, Type::Builtin(BuiltinType::Undefined)) => Some(Value::Undefined),
      (Value::Integer(v), Type::Builtin(b)) if b.is_integer() => {
        let (min, max) = b.integer_range()?;
        (min..=max).contains(v).then(|| Value::Integer(*v))
      }
      (Value::Integer(v), Type::Builtin(BuiltinType::BigInt)) => Some(Value::Integer(*v)),
      (Value::Integer(v), Type::Builtin(b)) if b.is_float() => {
        let f = *v as f64;
        if matches!(b, BuiltinType::Float | BuiltinType::UnrestrictedFloat)
          && !(f as f32).is_finite()
        {
          return None;
        };
        Some(Value::Float(IdlFloat(f)))
      }
      (Value::Float(v), Type::Builtin(b)) if b.is_float() => {
        if b.is_restricted_float() && !v.0.is_finite() {
          return None;
        };
        if matches!(b, BuiltinType::Float | BuiltinType::UnrestrictedFloat)
          && v.0.is_finite()
          && !(v.0 as f32).is_finite()
        {
          return None;
        };
        Some(Value::Float(*v))
      }
      (Value::Boolean(v), Type::Builtin(BuiltinType::Boolean)) => Some(Value::Boolean(*v)),
      (Value::String(s), Type::Builtin(BuiltinType::ByteString)) => {
        s.chars().all(|c| (c as u32) < 256).then(|| Value::String(s.clone()))
      }
      (Value::String(s), Type::Builtin(b)) if b.is_string() => Some(Value::String(s.clone())),
      (Value::String(s), Type::Enum(id)) => program
        .enumeration(*id)
        .is_some_and(|e| e.values.contains(s))
        .then(|| Value::String(s.clone())),
      (Value::EmptySequence, Type::Sequence(_) | Type::FrozenArray(_)) => Some(Value::EmptySequence),
      (Value::EmptyDictionary, Type::Dictionary(_)) => Some(Value::EmptyDictionary),
      _ => None,
    }
  }
}
