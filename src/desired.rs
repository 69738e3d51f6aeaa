//! Desired-state mapping of rules-config keys to values.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Errors raised while building a desired-state mapping.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DesiredConfigError {
    /// Raised when the input is not valid JSON.
    #[error("failed to parse desired rules configs: {0}")]
    Parse(String),
    /// Raised when the top-level JSON value is not an object.
    #[error("desired rules configs must be a JSON object of key/value pairs")]
    NotAnObject,
    /// Raised when an entry's value is not a scalar.
    #[error("rules config '{key}' must have a scalar value (string, number, or boolean)")]
    UnsupportedValue {
        /// Key carrying the unsupported value.
        key: String,
    },
}

/// Immutable desired-state mapping for one reconciliation run.
///
/// Keys are unique; values are opaque scalars that fully overwrite the remote
/// entry on upsert.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DesiredRulesConfigs {
    entries: BTreeMap<String, String>,
}

impl DesiredRulesConfigs {
    /// Builds a mapping from key/value pairs. Later duplicates win.
    #[must_use]
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Parses a mapping from a JSON object.
    ///
    /// Scalar values are accepted; numbers and booleans are rendered to their
    /// JSON string form. Nulls, arrays, and nested objects are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`DesiredConfigError`] when the input is not valid JSON, is
    /// not an object, or carries a non-scalar value.
    pub fn from_json_str(input: &str) -> Result<Self, DesiredConfigError> {
        let parsed: Value =
            serde_json::from_str(input).map_err(|err| DesiredConfigError::Parse(err.to_string()))?;
        let Value::Object(object) = parsed else {
            return Err(DesiredConfigError::NotAnObject);
        };

        let mut entries = BTreeMap::new();
        for (key, value) in object {
            let rendered = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(DesiredConfigError::UnsupportedValue { key });
                }
            };
            entries.insert(key, rendered);
        }

        Ok(Self { entries })
    }

    /// Returns `true` when no entries are desired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of desired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when `key` is part of the desired state.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over desired entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a DesiredRulesConfigs {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_a_flat_object_of_strings() {
        let desired = DesiredRulesConfigs::from_json_str(r#"{"foo":"val","bar":"secret"}"#)
            .expect("object should parse");
        assert_eq!(desired.len(), 2);
        assert!(desired.contains_key("foo"));
        assert!(desired.contains_key("bar"));
        assert!(!desired.contains_key("baz"));
    }

    #[rstest]
    #[case::number(r#"{"limit":42}"#, "limit", "42")]
    #[case::boolean(r#"{"enabled":true}"#, "enabled", "true")]
    fn renders_scalar_values_to_strings(
        #[case] input: &str,
        #[case] key: &str,
        #[case] expected: &str,
    ) {
        let desired = DesiredRulesConfigs::from_json_str(input).expect("scalar should parse");
        let value = desired
            .iter()
            .find(|(entry_key, _)| entry_key.as_str() == key)
            .map(|(_, entry_value)| entry_value.clone());
        assert_eq!(value.as_deref(), Some(expected));
    }

    #[rstest]
    #[case::null(r#"{"foo":null}"#)]
    #[case::array(r#"{"foo":[1]}"#)]
    #[case::object(r#"{"foo":{"nested":1}}"#)]
    fn rejects_non_scalar_values(#[case] input: &str) {
        let err = DesiredRulesConfigs::from_json_str(input).expect_err("value should be rejected");
        assert_eq!(
            err,
            DesiredConfigError::UnsupportedValue {
                key: String::from("foo")
            }
        );
    }

    #[rstest]
    #[case::array("[1,2]")]
    #[case::scalar("\"foo\"")]
    fn rejects_non_object_roots(#[case] input: &str) {
        let err = DesiredRulesConfigs::from_json_str(input).expect_err("root should be rejected");
        assert_eq!(err, DesiredConfigError::NotAnObject);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = DesiredRulesConfigs::from_json_str("not-json").expect_err("should fail");
        assert!(matches!(err, DesiredConfigError::Parse(_)));
    }

    #[test]
    fn from_entries_keeps_the_last_duplicate() {
        let desired =
            DesiredRulesConfigs::from_entries([("foo", "first"), ("foo", "second")]);
        assert_eq!(desired.len(), 1);
        let value = desired.iter().next().map(|(_, entry_value)| entry_value.clone());
        assert_eq!(value.as_deref(), Some("second"));
    }
}
