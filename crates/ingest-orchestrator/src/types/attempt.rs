//! Ingestion attempts and their lifecycle
//!
//! One [`IngestionAttempt`] exists per ingestion lifecycle instance. Status
//! only moves forward:
//!
//! ```text
//! PENDING ──dispatch ok──▶ PROCESSING ──▶ COMPLETED
//!    │                         │
//!    └──dispatch failed────────┴────────▶ FAILED
//! ```
//!
//! Once an attempt reaches COMPLETED or FAILED every further event is a
//! no-op for status, but metadata updates are still merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Open key/value metadata attached to an attempt (e.g. chunk counts)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Error message recorded when a user cancels an attempt
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Ingestion status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    #[serde(alias = "PENDING")]
    Pending,
    #[serde(alias = "PROCESSING")]
    Processing,
    #[serde(alias = "COMPLETED")]
    Completed,
    #[serde(alias = "FAILED")]
    Failed,
}

impl IngestionStatus {
    /// COMPLETED and FAILED accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, IngestionStatus::Completed | IngestionStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IngestionStatus::Pending => "pending",
            IngestionStatus::Processing => "processing",
            IngestionStatus::Completed => "completed",
            IngestionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(IngestionStatus::Pending),
            "processing" => Ok(IngestionStatus::Processing),
            "completed" => Ok(IngestionStatus::Completed),
            "failed" => Ok(IngestionStatus::Failed),
            other => Err(Error::internal(format!("unknown ingestion status '{}'", other))),
        }
    }
}

/// Something that happened to an attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionEvent {
    /// The worker accepted the dispatch request
    DispatchSucceeded,
    /// The dispatch request failed, timed out, or was rejected
    DispatchFailed { message: String },
    /// Status reported by the worker through the webhook
    WorkerReported {
        status: IngestionStatus,
        error_message: Option<String>,
    },
    /// A user cancelled the attempt
    Cancelled,
}

/// One ingestion lifecycle instance for a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestionAttempt {
    /// Attempt ID
    pub id: Uuid,
    /// Document being ingested
    pub document_id: Uuid,
    pub status: IngestionStatus,
    pub started_at: DateTime<Utc>,
    /// Set exactly once, on the transition into COMPLETED
    pub completed_at: Option<DateTime<Utc>>,
    /// Set on the transition into FAILED
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl IngestionAttempt {
    /// Create a new attempt in PENDING
    pub fn pending(document_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            status: IngestionStatus::Pending,
            started_at: now,
            completed_at: None,
            error_message: None,
            metadata: Metadata::new(),
        }
    }

    /// PENDING or PROCESSING
    pub fn is_in_flight(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Apply an event, returning whether the status changed.
    ///
    /// Events that would leave a terminal state, or move status backwards,
    /// are accepted and ignored.
    pub fn apply(&mut self, event: &IngestionEvent, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match event {
            IngestionEvent::DispatchSucceeded => self.advance_to_processing(),
            IngestionEvent::DispatchFailed { message } => {
                // A worker that already reported in is authoritative
                if self.status != IngestionStatus::Pending {
                    return false;
                }
                self.fail(Some(message.as_str()));
                true
            }
            IngestionEvent::WorkerReported {
                status,
                error_message,
            } => match status {
                IngestionStatus::Pending => false,
                IngestionStatus::Processing => self.advance_to_processing(),
                IngestionStatus::Completed => {
                    self.status = IngestionStatus::Completed;
                    self.completed_at = Some(now);
                    true
                }
                IngestionStatus::Failed => {
                    self.fail(error_message.as_deref());
                    true
                }
            },
            IngestionEvent::Cancelled => {
                self.fail(Some(CANCELLED_MESSAGE));
                true
            }
        }
    }

    /// Merge keys into metadata without touching unrelated keys
    pub fn merge_metadata(&mut self, updates: &Metadata) {
        for (key, value) in updates {
            self.metadata.insert(key.clone(), value.clone());
        }
    }

    fn advance_to_processing(&mut self) -> bool {
        if self.status == IngestionStatus::Pending {
            self.status = IngestionStatus::Processing;
            true
        } else {
            false
        }
    }

    fn fail(&mut self, message: Option<&str>) {
        self.status = IngestionStatus::Failed;
        // Keep an existing message when the report carries none
        if let Some(message) = message {
            self.error_message = Some(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attempt() -> IngestionAttempt {
        IngestionAttempt::pending(Uuid::new_v4(), Utc::now())
    }

    fn reported(status: IngestionStatus, error: Option<&str>) -> IngestionEvent {
        IngestionEvent::WorkerReported {
            status,
            error_message: error.map(String::from),
        }
    }

    #[test]
    fn test_dispatch_success_moves_to_processing() {
        let mut a = attempt();
        assert!(a.apply(&IngestionEvent::DispatchSucceeded, Utc::now()));
        assert_eq!(a.status, IngestionStatus::Processing);
        assert!(a.completed_at.is_none());
    }

    #[test]
    fn test_dispatch_failure_from_pending() {
        let mut a = attempt();
        let event = IngestionEvent::DispatchFailed {
            message: "connection refused".into(),
        };
        assert!(a.apply(&event, Utc::now()));
        assert_eq!(a.status, IngestionStatus::Failed);
        assert_eq!(a.error_message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_dispatch_outcome_ignored_after_worker_report() {
        let mut a = attempt();
        a.apply(&reported(IngestionStatus::Processing, None), Utc::now());

        let event = IngestionEvent::DispatchFailed {
            message: "late timeout".into(),
        };
        assert!(!a.apply(&event, Utc::now()));
        assert_eq!(a.status, IngestionStatus::Processing);
        assert!(a.error_message.is_none());
    }

    #[test]
    fn test_completed_sets_completed_at_once() {
        let mut a = attempt();
        let first = Utc::now();
        assert!(a.apply(&reported(IngestionStatus::Completed, None), first));
        assert_eq!(a.completed_at, Some(first));

        let later = first + chrono::Duration::seconds(30);
        assert!(!a.apply(&reported(IngestionStatus::Completed, None), later));
        assert_eq!(a.completed_at, Some(first));
    }

    #[test]
    fn test_failed_report_keeps_existing_message_when_absent() {
        let mut a = attempt();
        a.error_message = Some("earlier".into());
        assert!(a.apply(&reported(IngestionStatus::Failed, None), Utc::now()));
        assert_eq!(a.status, IngestionStatus::Failed);
        assert_eq!(a.error_message.as_deref(), Some("earlier"));
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut a = attempt();
        a.apply(&IngestionEvent::Cancelled, Utc::now());
        assert_eq!(a.error_message.as_deref(), Some(CANCELLED_MESSAGE));

        for event in [
            IngestionEvent::DispatchSucceeded,
            reported(IngestionStatus::Completed, None),
            reported(IngestionStatus::Failed, Some("other")),
            IngestionEvent::Cancelled,
        ] {
            assert!(!a.apply(&event, Utc::now()));
        }
        assert_eq!(a.status, IngestionStatus::Failed);
        assert_eq!(a.error_message.as_deref(), Some(CANCELLED_MESSAGE));
        assert!(a.completed_at.is_none());
    }

    #[test]
    fn test_pending_report_never_moves_status() {
        let mut a = attempt();
        a.apply(&IngestionEvent::DispatchSucceeded, Utc::now());
        assert!(!a.apply(&reported(IngestionStatus::Pending, None), Utc::now()));
        assert_eq!(a.status, IngestionStatus::Processing);
    }

    #[test]
    fn test_metadata_merge_is_additive() {
        let mut a = attempt();
        a.metadata.insert("source".into(), json!("upload"));

        let mut update = Metadata::new();
        update.insert("chunksProcessed".into(), json!(4));
        a.merge_metadata(&update);

        let mut update = Metadata::new();
        update.insert("chunksProcessed".into(), json!(10));
        update.insert("totalChunks".into(), json!(10));
        a.merge_metadata(&update);

        assert_eq!(
            serde_json::Value::Object(a.metadata.clone()),
            json!({"source": "upload", "chunksProcessed": 10, "totalChunks": 10})
        );
    }

    #[test]
    fn test_serializes_camel_case() {
        let a = attempt();
        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["status"], "pending");
        assert!(value.get("documentId").is_some());
        assert!(value.get("startedAt").is_some());
    }

    #[test]
    fn test_status_accepts_uppercase() {
        let status: IngestionStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(status, IngestionStatus::Completed);
        assert_eq!("FAILED".parse::<IngestionStatus>().unwrap(), IngestionStatus::Failed);
    }
}
