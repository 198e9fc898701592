//! SQLite-backed ingestion ledger
//!
//! Single-flight is enforced by the storage layer: a partial unique index
//! admits at most one `pending`/`processing` row per document, and the
//! resulting constraint violation is reported as `Error::Conflict`.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::IngestionLedger;
use crate::error::{Error, Result};
use crate::types::{IngestionAttempt, IngestionStatus, Metadata};

const SELECT_ATTEMPT: &str = "SELECT id, document_id, status, started_at, completed_at, \
                              error_message, metadata FROM ingestions";

/// SQLite ingestion ledger
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::database(format!("Failed to open database: {}", e)))?;

        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        ledger.migrate()?;
        Ok(ledger)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::database(format!("Failed to open in-memory database: {}", e)))?;

        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        ledger.migrate()?;
        Ok(ledger)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
        )
        .map_err(|e| Error::database(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ingestions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                document_id TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error_message TEXT,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            CREATE INDEX IF NOT EXISTS idx_ingestions_document_id
                ON ingestions(document_id, started_at);

            -- At most one non-terminal attempt per document
            CREATE UNIQUE INDEX IF NOT EXISTS idx_ingestions_in_flight
                ON ingestions(document_id)
                WHERE status IN ('pending', 'processing');
        "#,
        )
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

        Ok(())
    }

    fn query_attempts(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<IngestionAttempt>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::database(format!("Failed to prepare query: {}", e)))?;

        let attempts = stmt
            .query_map(params, row_to_attempt)
            .map_err(|e| Error::database(format!("Failed to list ingestions: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::database(format!("Failed to read ingestion row: {}", e)))?;

        Ok(attempts)
    }
}

impl IngestionLedger for SqliteLedger {
    fn insert_pending(&self, document_id: Uuid, now: DateTime<Utc>) -> Result<IngestionAttempt> {
        let attempt = IngestionAttempt::pending(document_id, now);
        let conn = self.conn.lock();

        let inserted = conn.execute(
            r#"
            INSERT INTO ingestions (id, document_id, status, started_at, completed_at, error_message, metadata)
            VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5)
            "#,
            params![
                attempt.id.to_string(),
                document_id.to_string(),
                attempt.status.as_str(),
                timestamp(&attempt.started_at),
                serde_json::to_string(&attempt.metadata)?,
            ],
        );

        match inserted {
            Ok(_) => Ok(attempt),
            Err(e) if is_constraint_violation(&e) => Err(Error::Conflict(document_id)),
            Err(e) => Err(Error::database(format!("Failed to create ingestion: {}", e))),
        }
    }

    fn get(&self, id: Uuid) -> Result<Option<IngestionAttempt>> {
        let conn = self.conn.lock();

        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_ATTEMPT),
            params![id.to_string()],
            row_to_attempt,
        )
        .optional()
        .map_err(|e| Error::database(format!("Failed to get ingestion: {}", e)))
    }

    fn list_all(&self) -> Result<Vec<IngestionAttempt>> {
        self.query_attempts(
            &format!("{} ORDER BY started_at DESC, seq DESC", SELECT_ATTEMPT),
            params![],
        )
    }

    fn list_by_document(&self, document_id: Uuid) -> Result<Vec<IngestionAttempt>> {
        self.query_attempts(
            &format!(
                "{} WHERE document_id = ?1 ORDER BY started_at DESC, seq DESC",
                SELECT_ATTEMPT
            ),
            params![document_id.to_string()],
        )
    }

    fn in_flight_for(&self, document_id: Uuid) -> Result<Option<IngestionAttempt>> {
        Ok(self
            .query_attempts(
                &format!(
                    "{} WHERE document_id = ?1 AND status IN ('pending', 'processing')",
                    SELECT_ATTEMPT
                ),
                params![document_id.to_string()],
            )?
            .into_iter()
            .next())
    }

    fn update(
        &self,
        id: Uuid,
        mutate: &mut dyn FnMut(&mut IngestionAttempt),
    ) -> Result<IngestionAttempt> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::database(format!("Failed to begin transaction: {}", e)))?;

        let mut attempt = tx
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_ATTEMPT),
                params![id.to_string()],
                row_to_attempt,
            )
            .optional()
            .map_err(|e| Error::database(format!("Failed to get ingestion: {}", e)))?
            .ok_or_else(|| Error::IngestionNotFound(id.to_string()))?;

        mutate(&mut attempt);

        let updated = tx.execute(
            r#"
            UPDATE ingestions SET
                status = ?2,
                completed_at = ?3,
                error_message = ?4,
                metadata = ?5
            WHERE id = ?1
            "#,
            params![
                id.to_string(),
                attempt.status.as_str(),
                attempt.completed_at.as_ref().map(timestamp),
                attempt.error_message,
                serde_json::to_string(&attempt.metadata)?,
            ],
        );

        match updated {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(Error::Conflict(attempt.document_id))
            }
            Err(e) => return Err(Error::database(format!("Failed to update ingestion: {}", e))),
        }

        tx.commit()
            .map_err(|e| Error::database(format!("Failed to commit ingestion update: {}", e)))?;

        Ok(attempt)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

// Fixed-width UTC timestamps sort lexically in time order. Full nanosecond
// precision so a row reads back equal to the attempt that was written.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn row_to_attempt(row: &rusqlite::Row) -> rusqlite::Result<IngestionAttempt> {
    let id: String = row.get(0)?;
    let document_id: String = row.get(1)?;
    let status: String = row.get(2)?;
    let started_at: String = row.get(3)?;
    let completed_at: Option<String> = row.get(4)?;
    let metadata: String = row.get(6)?;

    Ok(IngestionAttempt {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
        document_id: Uuid::parse_str(&document_id).map_err(|e| conversion_error(1, e))?,
        status: status
            .parse::<IngestionStatus>()
            .map_err(|e| conversion_error(2, e))?,
        started_at: parse_timestamp(3, &started_at)?,
        completed_at: completed_at
            .as_deref()
            .map(|raw| parse_timestamp(4, raw))
            .transpose()?,
        error_message: row.get(5)?,
        metadata: serde_json::from_str::<Metadata>(&metadata)
            .map_err(|e| conversion_error(6, e))?,
    })
}
