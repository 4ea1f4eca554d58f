//! Engine Client Module
//!
//! Provides the HTTP client for a remote Cromwell engine: connection
//! parameters, the rate-limited transport, query-string construction and
//! the caller-facing [`Cromwell`] facade.
//!
//! # Structure
//!
//! - [`connection`]: Host, port, credential and engine version
//! - [`transport`]: HTTP plumbing and the sliding-window rate limiter
//! - [`query`]: Query URL construction
//! - [`cromwell`]: The client facade tying it all together
//! - [`error`]: Typed client errors

pub mod connection;
pub mod cromwell;
pub mod error;
pub mod query;
pub mod transport;

pub use connection::{ApiVersion, Connection, Credential, EngineVersion};
pub use cromwell::Cromwell;
pub use error::{ClientError, Result};
pub use query::{build_query_url, QueryValue};
pub use transport::{ApiResponse, RateLimiter};
