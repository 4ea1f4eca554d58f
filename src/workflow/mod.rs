//! Workflow Domain Module
//!
//! Provides the data model for workflows as the remote engine reports
//! them: submissions, status classification, labels, metadata snapshots
//! and human-oriented explanations.
//!
//! # Structure
//!
//! - [`submission`]: Submission payloads and input shaping
//! - [`status`]: Status string classification
//! - [`labels`]: Label sets and restart-time label processing
//! - [`metadata`]: Metadata snapshots and the freshness cache
//! - [`explain`]: Failed/running call extraction from metadata

pub mod explain;
pub mod labels;
pub mod metadata;
pub mod status;
pub mod submission;

pub use explain::{explain_metadata, ExplainExtras, ExplainLogs, ExplainSummary, TaskLog};
pub use labels::{process_labels, LabelSet};
pub use metadata::{Field, MetadataCache, MetadataSnapshot};
pub use status::WorkflowStatus;
pub use submission::{
    namespace_inputs,
    WdlSource,
    WorkflowHandle,
    WorkflowSubmission
};
