//! Client Error Types
//!
//! Typed errors for everything the Cromwell client can surface to callers.
//!
//! Two failure modes deliberately do NOT appear here:
//!
//! - A restart against a workflow without `submittedFiles` is not a fault;
//!   [`Cromwell::restart`](crate::client::Cromwell::restart) returns
//!   `Ok(None)` for it.
//! - A missing key in an otherwise valid metadata response is reported as a
//!   [`Field::Missing`](crate::workflow::Field) value inside the result, so
//!   partial reads stay usable.

use thiserror::Error;

/// Convenience alias used throughout the client.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the Cromwell client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached, or the transfer failed mid-flight.
    #[error("unable to connect to {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but the body was not the JSON we expected.
    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The version probe answered with a string we cannot classify.
    #[error("unrecognized engine version from {url}: {raw:?}")]
    Version { url: String, raw: String },

    /// Workflow creation was rejected; carries the raw response body.
    #[error("workflow submission failed with status {status}: {body}")]
    Submission { status: u16, body: String },

    /// A request could not even be built (bad mime type, bad header value).
    #[error("failed to build request: {0}")]
    Request(#[from] reqwest::Error),

    /// Local file access failed (workflow source, dependency archive).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller handed us something unusable before any request was made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Wraps a transport-level failure for `url`.
    pub(crate) fn connection(url: &str, source: reqwest::Error) -> Self {
        Self::Connection {
            url: url.to_string(),
            source,
        }
    }

    /// Wraps a JSON decode failure for the body returned by `url`.
    pub(crate) fn decode(url: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_error_carries_body() {
        let err = ClientError::Submission {
            status: 400,
            body: "bad workflow".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("bad workflow"));
    }

    #[test]
    fn test_invalid_request_display() {
        let err = ClientError::InvalidRequest("workflow id can not be empty".to_string());
        assert!(err.to_string().contains("workflow id can not be empty"));
    }

    #[test]
    fn test_decode_error_names_url() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = ClientError::decode("http://localhost:8000/api", source);
        assert!(err.to_string().contains("http://localhost:8000/api"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.wdl");
        let err: ClientError = io.into();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
