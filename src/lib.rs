//! Cromrun - Cromwell Workflow Engine Client
//!
//! A client library and command-line tool for driving a remote Cromwell
//! workflow-execution engine over HTTP: submitting WDL workflows, tracking
//! and explaining their progress, and managing their labels. Designed for
//! bioinformatics pipelines running against a shared Cromwell server.
//!
//! # Architecture
//!
//! The library is organized into two main modules:
//!
//! - [`client`]: Connection handling, rate-limited HTTP transport, query
//!   construction and the [`Cromwell`] facade
//! - [`workflow`]: Submissions, status classification, labels, metadata
//!   snapshots and explanations
//!
//! # Example
//!
//! ```rust,no_run
//! use cromrun::{namespace_inputs, Connection, Cromwell, WdlSource, WorkflowSubmission};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> cromrun::Result<()> {
//!     // Connect once; the engine version is probed here.
//!     let connection = Connection::new("btl-cromwell", 9000);
//!     let cromwell = Cromwell::try_connect(connection, "amr").await?;
//!
//!     // Submit a workflow with namespaced inputs
//!     let inputs = namespace_inputs(
//!         "Hello",
//!         json!({"name": "world"}).as_object().unwrap(),
//!     );
//!     let submission = WorkflowSubmission::new(WdlSource::Path("hello.wdl".into()), inputs)
//!         .with_label("sample-id", "s001");
//!     let handle = cromwell.submit(&submission).await?;
//!
//!     println!("{} is {}", handle.id, handle.status);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod workflow;

// Re-export commonly used types
pub use client::connection::{Connection, Credential};
pub use client::cromwell::Cromwell;
pub use client::error::{ClientError, Result};
pub use client::query::{build_query_url, QueryValue};
pub use workflow::labels::{process_labels, LabelSet};
pub use workflow::metadata::MetadataSnapshot;
pub use workflow::status::WorkflowStatus;
pub use workflow::submission::{namespace_inputs, WdlSource, WorkflowHandle, WorkflowSubmission};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Cromrun";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Cromrun");
    }

    #[test]
    fn test_module_exports_connection() {
        let connection = Connection::new("localhost", 8000);
        assert_eq!(connection.host, "localhost");
        assert_eq!(connection.port, 8000);
    }

    #[test]
    fn test_module_exports_submission() {
        let inputs = namespace_inputs("W", json!({"a": 1}).as_object().unwrap());
        let submission = WorkflowSubmission::new(WdlSource::Inline(String::new()), inputs);
        assert!(submission.inputs.contains_key("W.a"));
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
