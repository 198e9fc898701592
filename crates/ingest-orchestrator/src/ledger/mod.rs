//! Ingestion ledger: the authoritative record of every ingestion attempt
//!
//! Implementations:
//! - `MemoryLedger`: process-local, for tests and ephemeral deployments
//! - `SqliteLedger`: durable, single-flight enforced by a partial unique index

mod memory;
mod sqlite;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::IngestionAttempt;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

/// Storage contract for ingestion attempts
///
/// Attempts are never deleted. Every method is atomic with respect to
/// concurrent callers.
pub trait IngestionLedger: Send + Sync {
    /// Insert a new PENDING attempt for `document_id`.
    ///
    /// Fails with `Error::Conflict` if the document already has a PENDING or
    /// PROCESSING attempt. The check and the insert happen as one step.
    fn insert_pending(&self, document_id: Uuid, now: DateTime<Utc>) -> Result<IngestionAttempt>;

    /// Get an attempt by ID
    fn get(&self, id: Uuid) -> Result<Option<IngestionAttempt>>;

    /// All attempts, newest first
    fn list_all(&self) -> Result<Vec<IngestionAttempt>>;

    /// Attempts for one document, newest first by start time.
    ///
    /// Ties on start time are broken by insertion order, latest insert first.
    fn list_by_document(&self, document_id: Uuid) -> Result<Vec<IngestionAttempt>>;

    /// The document's PENDING or PROCESSING attempt, if any
    fn in_flight_for(&self, document_id: Uuid) -> Result<Option<IngestionAttempt>>;

    /// Read-modify-write a single attempt.
    ///
    /// `mutate` runs while the attempt is exclusively held, so the whole
    /// change lands or none of it does. Fails with `Error::IngestionNotFound`.
    fn update(
        &self,
        id: Uuid,
        mutate: &mut dyn FnMut(&mut IngestionAttempt),
    ) -> Result<IngestionAttempt>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every ledger backend must share

    use super::*;
    use crate::error::Error;
    use crate::types::{IngestionEvent, IngestionStatus};
    use std::sync::Arc;

    pub fn single_flight(ledger: &dyn IngestionLedger) {
        let doc = Uuid::new_v4();
        let first = ledger.insert_pending(doc, Utc::now()).unwrap();

        let second = ledger.insert_pending(doc, Utc::now());
        assert!(matches!(second, Err(Error::Conflict(d)) if d == doc));

        ledger
            .update(first.id, &mut |a| {
                a.apply(&IngestionEvent::DispatchSucceeded, Utc::now());
            })
            .unwrap();
        assert!(matches!(
            ledger.insert_pending(doc, Utc::now()),
            Err(Error::Conflict(_))
        ));

        // Other documents are unaffected
        assert!(ledger.insert_pending(Uuid::new_v4(), Utc::now()).is_ok());

        ledger
            .update(first.id, &mut |a| {
                a.apply(&IngestionEvent::Cancelled, Utc::now());
            })
            .unwrap();
        let retry = ledger.insert_pending(doc, Utc::now()).unwrap();
        assert_eq!(ledger.in_flight_for(doc).unwrap().map(|a| a.id), Some(retry.id));
    }

    pub fn newest_first(ledger: &dyn IngestionLedger) {
        let doc = Uuid::new_v4();
        let now = Utc::now();
        let mut ids = Vec::new();
        for offset in 0..3 {
            let attempt = ledger
                .insert_pending(doc, now + chrono::Duration::seconds(offset))
                .unwrap();
            ids.push(attempt.id);
            ledger
                .update(attempt.id, &mut |a| {
                    a.apply(&IngestionEvent::Cancelled, Utc::now());
                })
                .unwrap();
        }

        let listed: Vec<Uuid> = ledger
            .list_by_document(doc)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);
        assert!(ledger.list_by_document(Uuid::new_v4()).unwrap().is_empty());
    }

    pub fn ties_prefer_latest_insert(ledger: &dyn IngestionLedger) {
        let doc = Uuid::new_v4();
        let now = Utc::now();
        let older = ledger.insert_pending(doc, now).unwrap();
        ledger
            .update(older.id, &mut |a| {
                a.status = IngestionStatus::Failed;
            })
            .unwrap();
        let newer = ledger.insert_pending(doc, now).unwrap();

        let listed = ledger.list_by_document(doc).unwrap();
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
    }

    pub fn returns_what_it_stores(ledger: &dyn IngestionLedger) {
        let doc = Uuid::new_v4();
        let inserted = ledger.insert_pending(doc, Utc::now()).unwrap();
        assert_eq!(ledger.get(inserted.id).unwrap().as_ref(), Some(&inserted));
        assert_eq!(ledger.list_by_document(doc).unwrap(), vec![inserted.clone()]);

        let updated = ledger
            .update(inserted.id, &mut |a| {
                a.apply(&IngestionEvent::Cancelled, Utc::now());
            })
            .unwrap();
        assert_eq!(ledger.get(inserted.id).unwrap().as_ref(), Some(&updated));
        assert_eq!(ledger.list_all().unwrap(), vec![updated]);
    }

    pub fn update_roundtrip(ledger: &dyn IngestionLedger) {
        let attempt = ledger.insert_pending(Uuid::new_v4(), Utc::now()).unwrap();
        let updated = ledger
            .update(attempt.id, &mut |a| {
                a.apply(
                    &IngestionEvent::WorkerReported {
                        status: IngestionStatus::Completed,
                        error_message: None,
                    },
                    Utc::now(),
                );
                a.metadata.insert("totalChunks".into(), serde_json::json!(7));
            })
            .unwrap();

        let stored = ledger.get(attempt.id).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.status, IngestionStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.metadata["totalChunks"], serde_json::json!(7));

        let missing = Uuid::new_v4();
        assert!(matches!(
            ledger.update(missing, &mut |_| {}),
            Err(Error::IngestionNotFound(id)) if id == missing.to_string()
        ));
        assert!(ledger.get(missing).unwrap().is_none());
    }

    pub fn concurrent_inserts(ledger: Arc<dyn IngestionLedger>) {
        let doc = Uuid::new_v4();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.insert_pending(doc, Utc::now()).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(ledger.list_by_document(doc).unwrap().len(), 1);
    }
}
