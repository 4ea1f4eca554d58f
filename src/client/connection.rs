//! Server Connection Parameters
//!
//! A [`Connection`] is the resolved `(host, port, credential)` triple the
//! surrounding tool hands to the client. It is immutable for the lifetime of
//! a client instance; URL construction for the engine's HTTP surface lives
//! here so the rest of the client never concatenates strings ad hoc.

use std::fmt;

/// HTTP basic-auth credential sent on every request when configured.
#[derive(Clone)]
pub struct Credential {
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth secret.
    pub secret: String,
}

impl fmt::Debug for Credential {
    // Never leak the secret through Debug output or logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

/// Workflow API version prefix selector.
///
/// Most operations go through `v1`; cached metadata fetches and restarted
/// submissions use `v2`, matching the engine's evolving surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

/// Resolved connection parameters for one Cromwell server.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Server hostname (no scheme).
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Optional basic-auth credential.
    pub credential: Option<Credential>,
}

impl Connection {
    /// Creates a connection without authentication.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credential: None,
        }
    }

    /// Attaches a basic-auth credential.
    pub fn with_credential(
        mut self,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.credential = Some(Credential {
            username: username.into(),
            secret: secret.into(),
        });
        self
    }

    /// Base URL of the workflow API, e.g. `http://host:port/api/workflows/v1`.
    pub fn api_url(&self, version: ApiVersion) -> String {
        let suffix = match version {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
        };
        format!("http://{}:{}/api/workflows/{}", self.host, self.port, suffix)
    }

    /// URL of the engine version endpoint, probed once at construction.
    pub fn version_url(&self) -> String {
        format!("http://{}:{}/engine/v1/version", self.host, self.port)
    }
}

/// Engine version derived from the version probe at client construction.
///
/// Only the major component matters to this client: it selects the label
/// field name used in multipart submissions. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineVersion {
    /// Major version number, e.g. `36` from `"36-c2fecac"`.
    pub major: u32,
}

impl EngineVersion {
    /// Parses the engine's long version string (`"36-c2fecac"`, `"85"`).
    ///
    /// Returns `None` when the leading component is not an integer.
    pub fn parse(long_version: &str) -> Option<Self> {
        let major = long_version.split('-').next()?.trim().parse().ok()?;
        Some(Self { major })
    }

    /// The multipart field name for submission labels.
    ///
    /// Engines at version 30 or newer accept `labels`; older engines expect
    /// `customLabels`. Fixed for the client's lifetime.
    pub fn label_field(&self) -> &'static str {
        if self.major >= 30 {
            "labels"
        } else {
            "customLabels"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_v1_and_v2() {
        let conn = Connection::new("btl-cromwell", 9000);
        assert_eq!(
            conn.api_url(ApiVersion::V1),
            "http://btl-cromwell:9000/api/workflows/v1"
        );
        assert_eq!(
            conn.api_url(ApiVersion::V2),
            "http://btl-cromwell:9000/api/workflows/v2"
        );
    }

    #[test]
    fn test_version_url() {
        let conn = Connection::new("localhost", 8000);
        assert_eq!(conn.version_url(), "http://localhost:8000/engine/v1/version");
    }

    #[test]
    fn test_credential_attached() {
        let conn = Connection::new("localhost", 8000).with_credential("amr", "hunter2");
        let cred = conn.credential.expect("credential");
        assert_eq!(cred.username, "amr");
        assert_eq!(cred.secret, "hunter2");
    }

    #[test]
    fn test_credential_debug_hides_secret() {
        let cred = Credential {
            username: "amr".to_string(),
            secret: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("amr"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_engine_version_parse() {
        assert_eq!(EngineVersion::parse("36-c2fecac"), Some(EngineVersion { major: 36 }));
        assert_eq!(EngineVersion::parse("85"), Some(EngineVersion { major: 85 }));
        assert_eq!(EngineVersion::parse("not-a-version"), None);
        assert_eq!(EngineVersion::parse(""), None);
    }

    #[test]
    fn test_label_field_selection() {
        assert_eq!(EngineVersion { major: 30 }.label_field(), "labels");
        assert_eq!(EngineVersion { major: 36 }.label_field(), "labels");
        assert_eq!(EngineVersion { major: 29 }.label_field(), "customLabels");
    }
}
