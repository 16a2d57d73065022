use ahash::HashMap;
use ahash::HashMapExt;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Types that exist without being declared: primitives, strings, `any`, `object`, `undefined`,
/// `symbol`, and the buffer source types.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum BuiltinType {
  Byte,
  Octet,
  Short,
  UnsignedShort,
  Long,
  UnsignedLong,
  LongLong,
  UnsignedLongLong,
  Boolean,
  UnrestrictedFloat,
  Float,
  UnrestrictedDouble,
  Double,
  BigInt,

  DomString,
  ByteString,
  UsvString,
  Utf8String,
  JsString,

  Any,
  Undefined,
  Object,
  Symbol,

  ArrayBuffer,
  SharedArrayBuffer,
  ArrayBufferView,
  DataView,
  Int8Array,
  Uint8Array,
  Uint8ClampedArray,
  Int16Array,
  Uint16Array,
  Int32Array,
  Uint32Array,
  Float32Array,
  Float64Array,
  BigInt64Array,
  BigUint64Array,
}

impl BuiltinType {
  pub fn name(self) -> &'static str {
    match self {
      BuiltinType::Byte => "byte",
      BuiltinType::Octet => "octet",
      BuiltinType::Short => "short",
      BuiltinType::UnsignedShort => "unsigned short",
      BuiltinType::Long => "long",
      BuiltinType::UnsignedLong => "unsigned long",
      BuiltinType::LongLong => "long long",
      BuiltinType::UnsignedLongLong => "unsigned long long",
      BuiltinType::Boolean => "boolean",
      BuiltinType::UnrestrictedFloat => "unrestricted float",
      BuiltinType::Float => "float",
      BuiltinType::UnrestrictedDouble => "unrestricted double",
      BuiltinType::Double => "double",
      BuiltinType::BigInt => "bigint",
      BuiltinType::DomString => "DOMString",
      BuiltinType::ByteString => "ByteString",
      BuiltinType::UsvString => "USVString",
      BuiltinType::Utf8String => "UTF8String",
      BuiltinType::JsString => "JSString",
      BuiltinType::Any => "any",
      BuiltinType::Undefined => "undefined",
      BuiltinType::Object => "object",
      BuiltinType::Symbol => "symbol",
      BuiltinType::ArrayBuffer => "ArrayBuffer",
      BuiltinType::SharedArrayBuffer => "SharedArrayBuffer",
      BuiltinType::ArrayBufferView => "ArrayBufferView",
      BuiltinType::DataView => "DataView",
      BuiltinType::Int8Array => "Int8Array",
      BuiltinType::Uint8Array => "Uint8Array",
      BuiltinType::Uint8ClampedArray => "Uint8ClampedArray",
      BuiltinType::Int16Array => "Int16Array",
      BuiltinType::Uint16Array => "Uint16Array",
      BuiltinType::Int32Array => "Int32Array",
      BuiltinType::Uint32Array => "Uint32Array",
      BuiltinType::Float32Array => "Float32Array",
      BuiltinType::Float64Array => "Float64Array",
      BuiltinType::BigInt64Array => "BigInt64Array",
      BuiltinType::BigUint64Array => "BigUint64Array",
    }
  }

  /// Inclusive value range of an integer type.
  pub fn integer_range(self) -> Option<(i128, i128)> {
    Some(match self {
      BuiltinType::Byte => (i8::MIN as i128, i8::MAX as i128),
      BuiltinType::Octet => (0, u8::MAX as i128),
      BuiltinType::Short => (i16::MIN as i128, i16::MAX as i128),
      BuiltinType::UnsignedShort => (0, u16::MAX as i128),
      BuiltinType::Long => (i32::MIN as i128, i32::MAX as i128),
      BuiltinType::UnsignedLong => (0, u32::MAX as i128),
      BuiltinType::LongLong => (i64::MIN as i128, i64::MAX as i128),
      BuiltinType::UnsignedLongLong => (0, u64::MAX as i128),
      _ => return None,
    })
  }

  pub fn is_integer(self) -> bool {
    self.integer_range().is_some()
  }

  pub fn is_float(self) -> bool {
    matches!(
      self,
      BuiltinType::UnrestrictedFloat
        | BuiltinType::Float
        | BuiltinType::UnrestrictedDouble
        | BuiltinType::Double
    )
  }

  pub fn is_restricted_float(self) -> bool {
    matches!(self, BuiltinType::Float | BuiltinType::Double)
  }

  pub fn is_numeric(self) -> bool {
    self.is_integer() || self.is_float()
  }

  /// Types a `const` may be declared with.
  pub fn is_primitive(self) -> bool {
    self.is_numeric() || matches!(self, BuiltinType::Boolean | BuiltinType::BigInt)
  }

  pub fn is_string(self) -> bool {
    matches!(
      self,
      BuiltinType::DomString
        | BuiltinType::ByteString
        | BuiltinType::UsvString
        | BuiltinType::Utf8String
        | BuiltinType::JsString
    )
  }

  pub fn is_buffer_source(self) -> bool {
    self.is_buffer_view() || matches!(self, BuiltinType::ArrayBuffer | BuiltinType::SharedArrayBuffer)
  }

  pub fn is_buffer_view(self) -> bool {
    matches!(self, BuiltinType::ArrayBufferView | BuiltinType::DataView) || self.is_typed_array()
  }

  pub fn is_typed_array(self) -> bool {
    matches!(
      self,
      BuiltinType::Int8Array
        | BuiltinType::Uint8Array
        | BuiltinType::Uint8ClampedArray
        | BuiltinType::Int16Array
        | BuiltinType::Uint16Array
        | BuiltinType::Int32Array
        | BuiltinType::Uint32Array
        | BuiltinType::Float32Array
        | BuiltinType::Float64Array
        | BuiltinType::BigInt64Array
        | BuiltinType::BigUint64Array
    )
  }

  /// Buffer types that are implemented by the same platform object as `other`. Only
  /// `ArrayBufferView` overlaps anything but itself.
  pub fn buffer_overlaps(self, other: BuiltinType) -> bool {
    self == other
      || (self == BuiltinType::ArrayBufferView && other.is_buffer_view())
      || (other == BuiltinType::ArrayBufferView && self.is_buffer_view())
  }
}

/// Built-in types referred to by identifier rather than keyword. These are bound in the global
/// scope of every parser and cannot be redeclared.
pub static BUILTIN_NAMES: Lazy<HashMap<&'static str, BuiltinType>> = Lazy::new(|| {
  let mut map = HashMap::<&'static str, BuiltinType>::new();
  for t in [
    BuiltinType::ArrayBuffer,
    BuiltinType::SharedArrayBuffer,
    BuiltinType::ArrayBufferView,
    BuiltinType::DataView,
    BuiltinType::Int8Array,
    BuiltinType::Uint8Array,
    BuiltinType::Uint8ClampedArray,
    BuiltinType::Int16Array,
    BuiltinType::Uint16Array,
    BuiltinType::Int32Array,
    BuiltinType::Uint32Array,
    BuiltinType::Float32Array,
    BuiltinType::Float64Array,
    BuiltinType::BigInt64Array,
    BuiltinType::BigUint64Array,
  ] {
    map.insert(t.name(), t);
  }
  map
});

/// Built-in typedefs, expanded to the union of buffer types they name.
pub static BUILTIN_TYPEDEFS: Lazy<HashMap<&'static str, &'static [BuiltinType]>> = Lazy::new(|| {
  let mut map = HashMap::<&'static str, &'static [BuiltinType]>::new();
  map.insert("BufferSource", &[BuiltinType::ArrayBufferView, BuiltinType::ArrayBuffer]);
  map.insert("AllowSharedBufferSource", &[
    BuiltinType::ArrayBuffer,
    BuiltinType::SharedArrayBuffer,
    BuiltinType::ArrayBufferView,
  ]);
  map
});

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn integer_ranges() {
    assert_eq!(BuiltinType::Octet.integer_range(), Some((0, 255)));
    assert_eq!(BuiltinType::Long.integer_range(), Some((-2147483648, 2147483647)));
    assert_eq!(BuiltinType::Double.integer_range(), None);
    assert!(BuiltinType::UnsignedLongLong.is_primitive());
    assert!(!BuiltinType::DomString.is_primitive());
  }

  #[test]
  fn named_builtins_cover_buffer_types_only() {
    assert_eq!(BUILTIN_NAMES.get("Uint8Array"), Some(&BuiltinType::Uint8Array));
    assert!(BUILTIN_NAMES.get("DOMString").is_none());
    assert!(BUILTIN_NAMES.values().all(|t| t.is_buffer_source()));
  }

  #[test]
  fn array_buffer_view_overlaps_every_view() {
    assert!(BuiltinType::ArrayBufferView.buffer_overlaps(BuiltinType::Float32Array));
    assert!(BuiltinType::DataView.buffer_overlaps(BuiltinType::ArrayBufferView));
    assert!(!BuiltinType::Int8Array.buffer_overlaps(BuiltinType::Uint8Array));
    assert!(!BuiltinType::ArrayBuffer.buffer_overlaps(BuiltinType::ArrayBufferView));
  }
}
