//! Label Processing
//!
//! Labels are an unordered `key -> value` set attached to a workflow. Two
//! keys are reserved: the engine stamps `cromwell-workflow-id` onto every
//! workflow, and this tool stamps the submitting user's identity under
//! `username`. When a label set is carried from a finished workflow onto a
//! restarted one, both reserved keys are stripped and the identity key is
//! re-derived from the current caller, so the restart is attributed to
//! whoever actually issued it.

use std::collections::HashMap;

use log::debug;
use serde_json::{Map, Value};

/// Label key the engine stamps with the workflow's own id.
pub const WORKFLOW_ID_LABEL: &str = "cromwell-workflow-id";

/// Label key holding the submitting user's identity.
pub const USERNAME_LABEL: &str = "username";

/// An unordered set of workflow labels with unique keys.
pub type LabelSet = HashMap<String, String>;

/// Renders a JSON label value as its label string.
fn label_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Processes a source workflow's labels for reuse on a restarted workflow.
///
/// Copies `labels`, removes the reserved workflow-id and prior-identity
/// keys, and re-inserts the identity key with `current_user`. Absent
/// reserved keys are logged at debug level and are not an error; the source
/// workflow simply had no prior-identity label.
pub fn process_labels(labels: &Map<String, Value>, current_user: &str) -> LabelSet {
    let mut processed: LabelSet = labels
        .iter()
        .map(|(k, v)| (k.clone(), label_string(v)))
        .collect();

    if processed.remove(WORKFLOW_ID_LABEL).is_none() {
        debug!("no {} in source labels", WORKFLOW_ID_LABEL);
    }
    if processed.remove(USERNAME_LABEL).is_none() {
        debug!("no {} in source labels", USERNAME_LABEL);
    }
    processed.insert(USERNAME_LABEL.to_string(), current_user.to_string());

    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(value: Value) -> Map<String, Value> {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn test_reserved_keys_stripped_and_identity_rewritten() {
        let source = labels(json!({
            "cromwell-workflow-id": "cromwell-1234",
            "username": "alice",
            "other": "v"
        }));

        let processed = process_labels(&source, "bob");

        assert_eq!(processed.len(), 2);
        assert_eq!(processed.get("other"), Some(&"v".to_string()));
        assert_eq!(processed.get("username"), Some(&"bob".to_string()));
        assert!(!processed.contains_key("cromwell-workflow-id"));
    }

    #[test]
    fn test_missing_reserved_keys_is_not_fatal() {
        let source = labels(json!({"sample-id": "s001"}));

        let processed = process_labels(&source, "bob");

        assert_eq!(processed.get("sample-id"), Some(&"s001".to_string()));
        assert_eq!(processed.get("username"), Some(&"bob".to_string()));
    }

    #[test]
    fn test_empty_source_yields_identity_only() {
        let processed = process_labels(&Map::new(), "bob");
        assert_eq!(processed.len(), 1);
        assert_eq!(processed.get("username"), Some(&"bob".to_string()));
    }

    #[test]
    fn test_non_string_values_rendered() {
        let source = labels(json!({"attempt": 3}));
        let processed = process_labels(&source, "bob");
        assert_eq!(processed.get("attempt"), Some(&"3".to_string()));
    }
}
