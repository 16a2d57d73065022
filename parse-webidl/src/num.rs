use crate::error::ErrorKind;
use core::hash::Hash;
use core::hash::Hasher;
use serde::Serialize;
use serde::Serializer;
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

/// The smallest and largest integer literal any WebIDL integer type can hold.
pub const INTEGER_LITERAL_MIN: i128 = i64::MIN as i128;
pub const INTEGER_LITERAL_MAX: i128 = u64::MAX as i128;

// This provides Eq for f64.
#[derive(Copy, Clone, Debug)]
pub struct IdlFloat(pub f64);

impl Display for IdlFloat {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    if self.0.is_nan() {
      write!(f, "NaN")
    } else if self.0.is_infinite() {
      write!(f, "{}Infinity", if self.0 < 0.0 { "-" } else { "" })
    } else {
      write!(f, "{}", self.0)
    }
  }
}

impl PartialEq for IdlFloat {
  fn eq(&self, other: &Self) -> bool {
    if self.0.is_nan() {
      return other.0.is_nan();
    };
    self.0.eq(&other.0)
  }
}

impl Eq for IdlFloat {}

impl Ord for IdlFloat {
  fn cmp(&self, other: &Self) -> Ordering {
    // Only NaNs cannot be compared, and we treat them as equal.
    self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
  }
}

impl PartialOrd for IdlFloat {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Hash for IdlFloat {
  fn hash<H: Hasher>(&self, state: &mut H) {
    if !self.0.is_nan() {
      self.0.to_bits().hash(state);
    };
  }
}

impl Serialize for IdlFloat {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(self.0)
  }
}

/// Converts the text of an integer token: decimal, `0x` hexadecimal, or `0`-prefixed octal, with
/// an optional leading `-`.
pub fn parse_integer(raw: &str) -> Result<i128, ErrorKind> {
  let (negative, body) = match raw.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, raw),
  };
  let (radix, digits) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
    (16, hex)
  } else if body.len() > 1 && body.starts_with('0') {
    (8, &body[1..])
  } else {
    (10, body)
  };
  if digits.is_empty() {
    return Err(ErrorKind::MalformedNumber);
  };
  let mut value: i128 = 0;
  for c in digits.chars() {
    let d = c.to_digit(radix).ok_or(ErrorKind::MalformedNumber)?;
    value = value
      .checked_mul(radix as i128)
      .and_then(|v| v.checked_add(d as i128))
      .ok_or(ErrorKind::NumberOutOfRange)?;
  }
  if negative {
    value = -value;
  };
  if !(INTEGER_LITERAL_MIN..=INTEGER_LITERAL_MAX).contains(&value) {
    return Err(ErrorKind::NumberOutOfRange);
  };
  Ok(value)
}

/// Converts the text of a float token. Literals too large for a double are rejected rather than
/// silently becoming infinite; `Infinity` and `NaN` are spelled as keywords instead.
pub fn parse_float(raw: &str) -> Result<IdlFloat, ErrorKind> {
  let value: f64 = raw.parse().map_err(|_| ErrorKind::MalformedNumber)?;
  if !value.is_finite() {
    return Err(ErrorKind::NumberOutOfRange);
  };
  Ok(IdlFloat(value))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn integers_in_every_radix() {
    assert_eq!(parse_integer("0"), Ok(0));
    assert_eq!(parse_integer("42"), Ok(42));
    assert_eq!(parse_integer("-42"), Ok(-42));
    assert_eq!(parse_integer("0x1f"), Ok(31));
    assert_eq!(parse_integer("0X10"), Ok(16));
    assert_eq!(parse_integer("017"), Ok(15));
    assert_eq!(parse_integer("-0x8000000000000000"), Ok(i64::MIN as i128));
    assert_eq!(parse_integer("0xFFFFFFFFFFFFFFFF"), Ok(u64::MAX as i128));
  }

  #[test]
  fn malformed_and_overflowing_integers() {
    assert_eq!(parse_integer("09"), Err(ErrorKind::MalformedNumber));
    assert_eq!(parse_integer("0x"), Err(ErrorKind::MalformedNumber));
    assert_eq!(parse_integer("18446744073709551616"), Err(ErrorKind::NumberOutOfRange));
    assert_eq!(
      parse_integer("99999999999999999999999999999999999999999"),
      Err(ErrorKind::NumberOutOfRange),
    );
  }

  #[test]
  fn floats() {
    assert_eq!(parse_float("1.5"), Ok(IdlFloat(1.5)));
    assert_eq!(parse_float(".5"), Ok(IdlFloat(0.5)));
    assert_eq!(parse_float("-2e3"), Ok(IdlFloat(-2000.0)));
    assert_eq!(parse_float("1e400"), Err(ErrorKind::NumberOutOfRange));
  }

  #[test]
  fn nan_is_equal_to_itself() {
    assert_eq!(IdlFloat(f64::NAN), IdlFloat(f64::NAN));
    assert_eq!(IdlFloat(f64::NEG_INFINITY).to_string(), "-Infinity");
  }
}
