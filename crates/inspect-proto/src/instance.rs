//! Dataset records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One dataset record describing a code-retrieval task.
///
/// Every field other than `instance_id` and `text` is kept verbatim as the
/// environment descriptor and handed to the test-spec provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInstance {
    /// Unique key of the record.
    pub instance_id: String,

    /// Raw retrieval prompt/result blob.
    pub text: String,

    /// Remaining record fields (repo, version, base_commit, ...).
    #[serde(flatten)]
    pub environment: Map<String, Value>,
}

impl DatasetInstance {
    /// Creates an instance with an empty environment descriptor.
    pub fn new(instance_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            text: text.into(),
            environment: Map::new(),
        }
    }

    /// Adds a field to the environment descriptor.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Returns a string-valued environment field.
    pub fn environment_str(&self, key: &str) -> Option<&str> {
        self.environment.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_extra_fields_as_environment() {
        let json = r#"{
            "instance_id": "sympy__sympy-20590",
            "text": "blob",
            "repo": "sympy/sympy",
            "version": "1.7"
        }"#;
        let instance: DatasetInstance = serde_json::from_str(json).unwrap();
        assert_eq!(instance.instance_id, "sympy__sympy-20590");
        assert_eq!(instance.text, "blob");
        assert_eq!(instance.environment_str("repo"), Some("sympy/sympy"));
        assert_eq!(instance.environment_str("version"), Some("1.7"));
        assert!(!instance.environment.contains_key("text"));
    }

    #[test]
    fn test_missing_text_is_rejected() {
        let json = r#"{"instance_id": "x"}"#;
        assert!(serde_json::from_str::<DatasetInstance>(json).is_err());
    }

    #[test]
    fn test_with_field() {
        let instance = DatasetInstance::new("a", "b").with_field("repo", "o/r");
        assert_eq!(instance.environment_str("repo"), Some("o/r"));
        assert_eq!(instance.environment_str("missing"), None);
    }
}
