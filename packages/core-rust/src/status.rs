//! Backend processing lifecycle for knowledge-base records.
//!
//! Documents and segments move through an ingestion pipeline on the server:
//!
//! ```text
//! pending -> converting -> chunking -> extracting -> embedding -> storing
//!                                                   -> { completed | error }
//! ```
//!
//! plus the out-of-band states `maintenance` and `restoring`. Everything
//! except `completed` and `error` is *transient*: it is expected to change
//! without user action, so a list showing such a record must poll until it
//! settles. `maintenance` and `restoring` keep polling but should not raise
//! an alert in the presentation layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Processing state of a record as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Converting,
    Chunking,
    Extracting,
    Embedding,
    Storing,
    Completed,
    Error,
    Maintenance,
    Restoring,
}

impl ProcessingStatus {
    /// Whether no further server-side change is expected.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Error)
    }

    /// Whether this state is expected to change without user action.
    #[must_use]
    pub fn is_transient(self) -> bool {
        !self.is_terminal()
    }

    /// Transient states that poll quietly, without alerting the user.
    #[must_use]
    pub fn is_quiet(self) -> bool {
        matches!(self, ProcessingStatus::Maintenance | ProcessingStatus::Restoring)
    }

    /// Lowercase wire name of this state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Converting => "converting",
            ProcessingStatus::Chunking => "chunking",
            ProcessingStatus::Extracting => "extracting",
            ProcessingStatus::Embedding => "embedding",
            ProcessingStatus::Storing => "storing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Error => "error",
            ProcessingStatus::Maintenance => "maintenance",
            ProcessingStatus::Restoring => "restoring",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown processing status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ProcessingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "converting" => Ok(ProcessingStatus::Converting),
            "chunking" => Ok(ProcessingStatus::Chunking),
            "extracting" => Ok(ProcessingStatus::Extracting),
            "embedding" => Ok(ProcessingStatus::Embedding),
            "storing" => Ok(ProcessingStatus::Storing),
            "completed" => Ok(ProcessingStatus::Completed),
            "error" => Ok(ProcessingStatus::Error),
            "maintenance" => Ok(ProcessingStatus::Maintenance),
            "restoring" => Ok(ProcessingStatus::Restoring),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
