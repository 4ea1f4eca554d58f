//! Workflow Metadata Snapshots and Caching
//!
//! Metadata is the engine's full per-workflow record: status, call
//! attempts, inputs, outputs, labels and the originally submitted files.
//! Fetching it is the client's highest-volume call, so snapshots are
//! memoized per workflow id with a fixed freshness window.
//!
//! The cache is an in-process map, unbounded for the lifetime of one
//! client instance; stale entries are replaced wholesale, never merged.
//! That is an accepted simplicity trade-off for a short-lived CLI process,
//! not a production cache.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Default freshness window for cached metadata, in seconds.
pub const METADATA_TTL_SECS: i64 = 15;

/// A value extracted from a JSON document that may be absent.
///
/// Permissive read paths substitute `Missing` in place of an absent
/// expected field instead of failing the whole read; callers must check
/// for it rather than assume presence.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Present(Value),
    Missing(String),
}

impl Field {
    /// Extracts `key` from a JSON object, tagging its absence.
    pub fn get(source: &Value, key: &str) -> Self {
        match source.get(key) {
            Some(value) => Self::Present(value.clone()),
            None => Self::Missing(key.to_string()),
        }
    }

    /// The contained value's string form, when present and a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Present(value) => value.as_str(),
            Self::Missing(_) => None,
        }
    }

    /// True when the field was absent from the source document.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

impl Serialize for Field {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Present(value) => value.serialize(serializer),
            Self::Missing(key) => format!("<missing field: {}>", key).serialize(serializer),
        }
    }
}

/// One fetch of a workflow's metadata, stamped with its fetch time.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataSnapshot {
    /// Id of the workflow this snapshot belongs to.
    pub workflow_id: String,
    /// When this snapshot was fetched from the engine.
    pub fetched_at: DateTime<Utc>,
    /// The engine's metadata document.
    pub value: Value,
}

impl MetadataSnapshot {
    /// Stamps `value` with the current time.
    pub fn new(workflow_id: impl Into<String>, value: Value) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            fetched_at: Utc::now(),
            value,
        }
    }

    /// True while the snapshot is within the freshness window.
    pub fn is_fresh(&self, ttl_secs: i64) -> bool {
        Utc::now() - self.fetched_at < Duration::seconds(ttl_secs)
    }

    /// The workflow's execution status string, if reported.
    pub fn status(&self) -> Option<&str> {
        self.value.get("status").and_then(Value::as_str)
    }

    /// The workflow's label object, if reported.
    pub fn labels(&self) -> Option<&Map<String, Value>> {
        self.value.get("labels").and_then(Value::as_object)
    }

    /// The workflow's call map (task name -> attempts), if reported.
    pub fn calls(&self) -> Option<&Map<String, Value>> {
        self.value.get("calls").and_then(Value::as_object)
    }

    /// The originally submitted workflow source and inputs, when present.
    ///
    /// `None` here is the "nothing to restart" condition: without the
    /// `submittedFiles` section a workflow cannot be resubmitted.
    pub fn submitted_files(&self) -> Option<(&str, &str)> {
        let files = self.value.get("submittedFiles")?;
        let workflow = files.get("workflow")?.as_str()?;
        let inputs = files.get("inputs")?.as_str()?;
        Some((workflow, inputs))
    }
}

/// Time-boxed memoization of per-workflow metadata fetches.
///
/// Entries are keyed by workflow id and monotonically replaced by fetch
/// time; a read never observes a snapshot older than the caller's TTL.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<String, MetadataSnapshot>>,
}

impl MetadataCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored snapshot for `workflow_id` while it is fresh.
    pub fn fresh(&self, workflow_id: &str, ttl_secs: i64) -> Option<MetadataSnapshot> {
        let entries = self.entries.lock().expect("metadata cache lock poisoned");
        entries
            .get(workflow_id)
            .filter(|snapshot| snapshot.is_fresh(ttl_secs))
            .cloned()
    }

    /// Stamps and stores a fresh fetch, replacing any prior entry.
    pub fn store(&self, workflow_id: &str, value: Value) -> MetadataSnapshot {
        let snapshot = MetadataSnapshot::new(workflow_id, value);
        let mut entries = self.entries.lock().expect("metadata cache lock poisoned");
        entries.insert(workflow_id.to_string(), snapshot.clone());
        snapshot
    }

    /// Number of cached workflows.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("metadata cache lock poisoned").len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WF_ID: &str = "8bb58566-27e6-4f51-9ada-b2a2e35a9476";

    #[test]
    fn test_field_present_and_missing() {
        let doc = json!({"status": "Running"});
        assert_eq!(
            Field::get(&doc, "status"),
            Field::Present(json!("Running"))
        );
        assert_eq!(Field::get(&doc, "id"), Field::Missing("id".to_string()));
        assert!(Field::get(&doc, "id").is_missing());
    }

    #[test]
    fn test_field_serializes_missing_as_marker() {
        let rendered = serde_json::to_string(&Field::Missing("workflowRoot".to_string()))
            .expect("serialize");
        assert_eq!(rendered, "\"<missing field: workflowRoot>\"");
    }

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = MetadataSnapshot::new(
            WF_ID,
            json!({
                "status": "Succeeded",
                "labels": {"username": "amr"},
                "calls": {"wf.hello": []},
                "submittedFiles": {"workflow": "workflow x {}", "inputs": "{}"}
            }),
        );

        assert_eq!(snapshot.status(), Some("Succeeded"));
        assert!(snapshot.labels().expect("labels").contains_key("username"));
        assert!(snapshot.calls().expect("calls").contains_key("wf.hello"));
        assert_eq!(
            snapshot.submitted_files(),
            Some(("workflow x {}", "{}"))
        );
    }

    #[test]
    fn test_snapshot_without_submitted_files() {
        let snapshot = MetadataSnapshot::new(WF_ID, json!({"status": "Failed"}));
        assert!(snapshot.submitted_files().is_none());
    }

    #[test]
    fn test_snapshot_freshness_window() {
        let mut snapshot = MetadataSnapshot::new(WF_ID, json!({}));
        assert!(snapshot.is_fresh(METADATA_TTL_SECS));

        snapshot.fetched_at = Utc::now() - Duration::seconds(METADATA_TTL_SECS + 5);
        assert!(!snapshot.is_fresh(METADATA_TTL_SECS));
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = MetadataCache::new();
        cache.store(WF_ID, json!({"status": "Running"}));

        let hit = cache.fresh(WF_ID, METADATA_TTL_SECS).expect("fresh hit");
        assert_eq!(hit.status(), Some("Running"));
    }

    #[test]
    fn test_cache_miss_for_unknown_id() {
        let cache = MetadataCache::new();
        assert!(cache.fresh(WF_ID, METADATA_TTL_SECS).is_none());
    }

    #[test]
    fn test_stale_entry_not_returned() {
        let cache = MetadataCache::new();
        let snapshot = cache.store(WF_ID, json!({"status": "Running"}));

        // Backdate the stored entry past the freshness window.
        {
            let mut entries = cache.entries.lock().unwrap();
            let entry = entries.get_mut(WF_ID).unwrap();
            entry.fetched_at = snapshot.fetched_at - Duration::seconds(METADATA_TTL_SECS + 1);
        }

        assert!(cache.fresh(WF_ID, METADATA_TTL_SECS).is_none());
    }

    #[test]
    fn test_store_replaces_and_restamps() {
        let cache = MetadataCache::new();
        let first = cache.store(WF_ID, json!({"status": "Running"}));
        let second = cache.store(WF_ID, json!({"status": "Succeeded"}));

        assert!(second.fetched_at >= first.fetched_at);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache
                .fresh(WF_ID, METADATA_TTL_SECS)
                .expect("hit")
                .status(),
            Some("Succeeded")
        );
    }

    #[test]
    fn test_single_fetch_within_ttl_window() {
        // Two reads inside the TTL window must issue exactly one fetch.
        let cache = MetadataCache::new();
        let mut fetches = 0;

        for _ in 0..2 {
            if cache.fresh(WF_ID, METADATA_TTL_SECS).is_none() {
                fetches += 1;
                cache.store(WF_ID, json!({"status": "Running"}));
            }
        }

        assert_eq!(fetches, 1);
    }
}
