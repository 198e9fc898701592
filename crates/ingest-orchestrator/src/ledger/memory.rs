use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::IngestionLedger;
use crate::error::{Error, Result};
use crate::types::IngestionAttempt;

/// In-memory ledger
///
/// A single mutex guards all attempts, which makes check-then-insert and
/// read-modify-write trivially atomic.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Attempts in insertion order
    attempts: Vec<IngestionAttempt>,
    /// Attempt ID -> position in `attempts`
    index: HashMap<Uuid, usize>,
}

impl Inner {
    fn newest_first(&self, filter: impl Fn(&IngestionAttempt) -> bool) -> Vec<IngestionAttempt> {
        let mut attempts: Vec<IngestionAttempt> = self
            .attempts
            .iter()
            .rev()
            .filter(|a| filter(*a))
            .cloned()
            .collect();
        // Stable sort keeps latest-insert-first among equal start times
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        attempts
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IngestionLedger for MemoryLedger {
    fn insert_pending(&self, document_id: Uuid, now: DateTime<Utc>) -> Result<IngestionAttempt> {
        let mut inner = self.inner.lock();

        if inner
            .attempts
            .iter()
            .any(|a| a.document_id == document_id && a.is_in_flight())
        {
            return Err(Error::Conflict(document_id));
        }

        let attempt = IngestionAttempt::pending(document_id, now);
        let position = inner.attempts.len();
        inner.index.insert(attempt.id, position);
        inner.attempts.push(attempt.clone());
        Ok(attempt)
    }

    fn get(&self, id: Uuid) -> Result<Option<IngestionAttempt>> {
        let inner = self.inner.lock();
        Ok(inner.index.get(&id).map(|&i| inner.attempts[i].clone()))
    }

    fn list_all(&self) -> Result<Vec<IngestionAttempt>> {
        Ok(self.inner.lock().newest_first(|_| true))
    }

    fn list_by_document(&self, document_id: Uuid) -> Result<Vec<IngestionAttempt>> {
        Ok(self
            .inner
            .lock()
            .newest_first(move |a| a.document_id == document_id))
    }

    fn in_flight_for(&self, document_id: Uuid) -> Result<Option<IngestionAttempt>> {
        Ok(self
            .inner
            .lock()
            .attempts
            .iter()
            .find(|a| a.document_id == document_id && a.is_in_flight())
            .cloned())
    }

    fn update(
        &self,
        id: Uuid,
        mutate: &mut dyn FnMut(&mut IngestionAttempt),
    ) -> Result<IngestionAttempt> {
        let mut inner = self.inner.lock();
        let position = *inner
            .index
            .get(&id)
            .ok_or_else(|| Error::IngestionNotFound(id.to_string()))?;

        // Written back only after `mutate` returns
        let mut attempt = inner.attempts[position].clone();
        mutate(&mut attempt);
        inner.attempts[position] = attempt.clone();
        Ok(attempt)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
