//! Workflow Status Classification
//!
//! The remote engine owns workflow state; this client only classifies the
//! status strings it reports, it never transitions them. `Submitted`,
//! `QueuedInCromwell` and `Running` are expected to change between polls;
//! the terminal states are expected to be stable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-visible workflow states reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Submitted,
    QueuedInCromwell,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl WorkflowStatus {
    /// Classifies an engine status string. Unknown strings yield `None`.
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "Submitted" => Some(Self::Submitted),
            "QueuedInCromwell" => Some(Self::QueuedInCromwell),
            "Running" => Some(Self::Running),
            "Succeeded" => Some(Self::Succeeded),
            "Failed" => Some(Self::Failed),
            "Aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    /// The engine's string form of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::QueuedInCromwell => "QueuedInCromwell",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Aborted => "Aborted",
        }
    }

    /// True for states that no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
