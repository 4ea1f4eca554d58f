//! Workflow Submission Model
//!
//! Everything a submission carries before it becomes a multipart request:
//! the workflow source, JSON inputs, an optional dependency archive,
//! labels, and engine options. The JSON-shaping helpers live here so they
//! stay pure and testable; the multipart assembly itself is done by the
//! client, which knows the engine version.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::labels::LabelSet;

/// Key injected into every inputs document identifying the submitter.
pub const USER_INPUT_KEY: &str = "user";

/// The workflow definition to submit.
#[derive(Debug, Clone)]
pub enum WdlSource {
    /// Read the definition from a local file at submit time.
    Path(PathBuf),
    /// Submit an in-memory definition (restarts reuse the original source).
    Inline(String),
}

/// The dependency archive accompanying a submission, if any.
#[derive(Debug, Clone)]
pub enum DependenciesSource {
    /// Read the zip archive from a local file at submit time.
    Path(PathBuf),
    /// Submit in-memory archive bytes.
    Bytes(Vec<u8>),
}

/// The result of a successful submission; the sole identifier used in all
/// subsequent per-workflow calls. Its id, once issued, is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowHandle {
    /// Workflow UUID issued by the engine.
    pub id: String,
    /// Status string reported at submission time (normally `Submitted`).
    pub status: String,
}

/// A workflow submission under construction.
///
/// # Example
///
/// ```
/// use cromrun::workflow::submission::{namespace_inputs, WdlSource, WorkflowSubmission};
/// use serde_json::json;
///
/// let inputs = namespace_inputs("Hello", json!({"name": "world"}).as_object().unwrap());
/// let submission = WorkflowSubmission::new(WdlSource::Path("hello.wdl".into()), inputs)
///     .with_label("sample-id", "s001")
///     .disable_caching(true);
/// assert!(submission.options_blob().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowSubmission {
    /// Workflow definition.
    pub source: WdlSource,
    /// JSON inputs, already namespaced where the engine requires it.
    pub inputs: Map<String, Value>,
    /// Optional subworkflow zip archive.
    pub dependencies: Option<DependenciesSource>,
    /// Labels to attach at submission time.
    pub labels: LabelSet,
    /// Ask the engine not to reuse cached call results.
    pub disable_caching: bool,
    /// Additional engine options merged into the options blob.
    pub extra_options: Map<String, Value>,
}

impl WorkflowSubmission {
    /// Creates a submission from a definition and its inputs.
    pub fn new(source: WdlSource, inputs: Map<String, Value>) -> Self {
        Self {
            source,
            inputs,
            dependencies: None,
            labels: LabelSet::new(),
            disable_caching: false,
            extra_options: Map::new(),
        }
    }

    /// Attaches a dependency zip archive by path.
    pub fn with_dependencies(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependencies = Some(DependenciesSource::Path(path.into()));
        self
    }

    /// Attaches a dependency zip archive from memory.
    pub fn with_dependency_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.dependencies = Some(DependenciesSource::Bytes(bytes));
        self
    }

    /// Adds one label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Replaces the label set.
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    /// Enables or disables engine call caching for this run.
    pub fn disable_caching(mut self, disable: bool) -> Self {
        self.disable_caching = disable;
        self
    }

    /// Adds an extra engine option.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_options.insert(key.into(), value);
        self
    }

    /// The inputs document actually submitted: the caller's inputs plus the
    /// injected submitter identity.
    pub fn final_inputs(&self, user: &str) -> Map<String, Value> {
        let mut inputs = self.inputs.clone();
        inputs.insert(USER_INPUT_KEY.to_string(), Value::String(user.to_string()));
        inputs
    }

    /// The engine options blob, present only when caching is disabled or
    /// extra options were supplied.
    pub fn options_blob(&self) -> Option<Map<String, Value>> {
        if !self.disable_caching && self.extra_options.is_empty() {
            return None;
        }
        let mut options = Map::new();
        if self.disable_caching {
            options.insert("read_from_cache".to_string(), Value::Bool(false));
        }
        for (key, value) in &self.extra_options {
            options.insert(key.clone(), value.clone());
        }
        Some(options)
    }
}

/// Namespaces each input key by the workflow name, as the engine expects:
/// `{"a": 1}` for workflow `W` becomes `{"W.a": 1}`.
pub fn namespace_inputs(workflow_name: &str, args: &Map<String, Value>) -> Map<String, Value> {
    args.iter()
        .map(|(key, value)| (format!("{}.{}", workflow_name, key), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn test_namespace_inputs() {
        let namespaced = namespace_inputs("W", &object(json!({"a": 1, "b": "x"})));
        assert_eq!(namespaced.get("W.a"), Some(&json!(1)));
        assert_eq!(namespaced.get("W.b"), Some(&json!("x")));
        assert!(!namespaced.contains_key("a"));
    }

    #[test]
    fn test_final_inputs_injects_user() {
        let submission = WorkflowSubmission::new(
            WdlSource::Inline("workflow W {}".to_string()),
            namespace_inputs("W", &object(json!({"a": 1}))),
        );

        let inputs = submission.final_inputs("amr");
        assert_eq!(inputs.get("W.a"), Some(&json!(1)));
        assert_eq!(inputs.get("user"), Some(&json!("amr")));
    }

    #[test]
    fn test_options_blob_absent_by_default() {
        let submission =
            WorkflowSubmission::new(WdlSource::Inline(String::new()), Map::new());
        assert!(submission.options_blob().is_none());
    }

    #[test]
    fn test_options_blob_when_caching_disabled() {
        let submission = WorkflowSubmission::new(WdlSource::Inline(String::new()), Map::new())
            .disable_caching(true);

        let blob = submission.options_blob().expect("options blob");
        assert_eq!(blob.get("read_from_cache"), Some(&json!(false)));
    }

    #[test]
    fn test_options_blob_with_extra_options() {
        let submission = WorkflowSubmission::new(WdlSource::Inline(String::new()), Map::new())
            .with_option("final_workflow_log_dir", json!("/logs"));

        let blob = submission.options_blob().expect("options blob");
        assert_eq!(blob.get("final_workflow_log_dir"), Some(&json!("/logs")));
        assert!(!blob.contains_key("read_from_cache"));
    }

    #[test]
    fn test_options_blob_merges_both() {
        let submission = WorkflowSubmission::new(WdlSource::Inline(String::new()), Map::new())
            .disable_caching(true)
            .with_option("final_workflow_log_dir", json!("/logs"));

        let blob = submission.options_blob().expect("options blob");
        assert_eq!(blob.len(), 2);
    }

    #[test]
    fn test_labels_builder() {
        let submission = WorkflowSubmission::new(WdlSource::Inline(String::new()), Map::new())
            .with_label("sample-id", "s001")
            .with_label("project", "vesper");

        assert_eq!(submission.labels.len(), 2);
        assert_eq!(submission.labels.get("sample-id"), Some(&"s001".to_string()));
    }

    #[test]
    fn test_handle_deserializes_from_engine_response() {
        let handle: WorkflowHandle = serde_json::from_value(json!({
            "id": "8bb58566-27e6-4f51-9ada-b2a2e35a9476",
            "status": "Submitted"
        }))
        .expect("handle");

        assert_eq!(handle.id.len(), 36);
        assert_eq!(handle.status, "Submitted");
    }
}
