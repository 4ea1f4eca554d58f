//! Workflow Explanation
//!
//! Extraction of a human-oriented view from a workflow's metadata: the
//! headline fields, plus the most interesting call attempts (failed calls
//! with their logs, or currently running calls).
//!
//! All extraction follows the permissive error-as-value convention: an
//! absent key or an unreadable log file becomes a tagged value inside the
//! result instead of failing the whole read.

use std::fs;

use serde::Serialize;
use serde_json::{Map, Value};

use super::metadata::Field;
use super::status::WorkflowStatus;

/// Maximum number of calls reported per explanation.
pub const DEFAULT_CALL_LIMIT: usize = 3;

/// A reference to one output stream of a call attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamLog {
    /// The stream's file path and display label, with contents inlined
    /// when full logs were requested.
    Available {
        name: String,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        log: Option<LogRead>,
    },
    /// The metadata lacked a field needed to locate this stream.
    Missing(String),
}

/// The result of inlining a log file's contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogRead {
    /// The file's text.
    Text(String),
    /// The read failed; the error stands in for the content.
    Error(String),
}

/// One call attempt selected by [`get_calls`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLog {
    /// Task name as it appears in the call map.
    pub task: String,
    pub stdout: StreamLog,
    pub stderr: StreamLog,
}

/// Headline fields of a workflow explanation.
///
/// Fields may be [`Field::Missing`] when the remote response lacked them;
/// callers must check, not assume presence.
#[derive(Debug, Serialize)]
pub struct ExplainSummary {
    pub status: Field,
    pub id: Field,
    pub workflow_root: Field,
    /// Running call summaries, populated only for running workflows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_jobs: Option<Vec<TaskLog>>,
}

/// Optional extras of a workflow explanation.
#[derive(Debug, Serialize)]
pub struct ExplainExtras {
    /// The workflow's inputs, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Field>,
}

/// Collected log references of a workflow explanation.
#[derive(Debug, Serialize)]
pub struct ExplainLogs {
    /// Failed call logs with contents, populated only for failed workflows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_jobs: Option<Vec<TaskLog>>,
}

/// Builds the stream reference for one side (`stdout`/`stderr`) of a call.
fn stream_log(attempt: &Value, task: &str, stream: &str, full_logs: bool) -> StreamLog {
    let name = match attempt.get(stream).and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => return StreamLog::Missing(format!("<missing field: {}>", stream)),
    };
    let shard = match attempt.get("shardIndex").and_then(Value::as_i64) {
        Some(shard) => shard,
        None => return StreamLog::Missing("<missing field: shardIndex>".to_string()),
    };

    let label = format!("{}.{}.{}", task, shard, stream);
    let log = if full_logs {
        Some(match fs::read_to_string(&name) {
            Ok(text) => LogRead::Text(text),
            Err(e) => LogRead::Error(e.to_string()),
        })
    } else {
        None
    };

    StreamLog::Available { name, label, log }
}

/// Filters a call map to attempts matching `status`.
///
/// A task matches when its most recent attempt reports `status`. Call-map
/// iteration order is preserved and the result is truncated to `limit`.
/// With `full_logs`, stdout/stderr file contents are inlined, substituting
/// the read error as the content on I/O failure.
pub fn get_calls(
    status: WorkflowStatus,
    calls: &Map<String, Value>,
    full_logs: bool,
    limit: usize,
) -> Vec<TaskLog> {
    calls
        .iter()
        .filter_map(|(task, attempts)| {
            let latest = attempts.as_array()?.last()?;
            let matches = latest.get("executionStatus").and_then(Value::as_str)
                == Some(status.as_str());
            matches.then(|| TaskLog {
                task: task.clone(),
                stdout: stream_log(latest, task, "stdout", full_logs),
                stderr: stream_log(latest, task, "stderr", full_logs),
            })
        })
        .take(limit)
        .collect()
}

/// Extracts the explanation triple from a workflow's metadata document.
///
/// Status, id and workflow root are extracted unconditionally as tagged
/// fields. Failed workflows additionally contribute up to
/// [`DEFAULT_CALL_LIMIT`] failed-call logs with contents; running
/// workflows contribute running-call summaries.
pub fn explain_metadata(
    metadata: &Value,
    include_inputs: bool,
) -> (ExplainSummary, ExplainExtras, ExplainLogs) {
    let status = Field::get(metadata, "status");
    let empty = Map::new();
    let calls = metadata
        .get("calls")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut running_jobs = None;
    let mut failed_jobs = None;
    match status.as_str() {
        Some("Failed") => {
            failed_jobs = Some(get_calls(
                WorkflowStatus::Failed,
                calls,
                true,
                DEFAULT_CALL_LIMIT,
            ));
        }
        Some("Running") => {
            running_jobs = Some(get_calls(
                WorkflowStatus::Running,
                calls,
                false,
                DEFAULT_CALL_LIMIT,
            ));
        }
        _ => {}
    }

    let summary = ExplainSummary {
        status,
        id: Field::get(metadata, "id"),
        workflow_root: Field::get(metadata, "workflowRoot"),
        running_jobs,
    };
    let extras = ExplainExtras {
        inputs: include_inputs.then(|| Field::get(metadata, "inputs")),
    };
    let logs = ExplainLogs { failed_jobs };

    (summary, extras, logs)
}
