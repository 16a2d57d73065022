use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
  /// Global name a construct is exposed in when neither it nor its container declares `[Exposed]`.
  pub primary_global: String,
  /// Sort dictionary members by name once partial dictionaries are merged.
  pub sort_dictionary_members: bool,
}

impl Default for ParserOptions {
  fn default() -> Self {
    ParserOptions {
      primary_global: "Window".into(),
      sort_dictionary_members: true,
    }
  }
}

impl ParserOptions {
  pub fn with_primary_global(self, primary_global: impl Into<String>) -> Self {
    ParserOptions {
      primary_global: primary_global.into(),
      ..self
    }
  }

  pub fn with_sorted_dictionary_members(self, sort_dictionary_members: bool) -> Self {
    ParserOptions {
      sort_dictionary_members,
      ..self
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fields_take_defaults() {
    let options: ParserOptions = serde_json::from_str(r#"{"primary_global":"Worker"}"#).unwrap();
    assert_eq!(options.primary_global, "Worker");
    assert!(options.sort_dictionary_members);
  }
}
