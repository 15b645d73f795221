//! Named counter store backed by SQLite.
//!
//! # Responsibility
//! - Keep one running total per entity kind in the `counters` table.
//! - Serialize read-modify-write increments so none is lost.
//!
//! # Invariants
//! - Increments run in `BEGIN IMMEDIATE` transactions: the write lock is held
//!   from the read until commit, so N concurrent increments add exactly N.
//! - Only lock contention is retried, at most `COUNTER_MAX_ATTEMPTS` times.
//! - Counters are never decremented or deleted here.

use super::error::{RepoError, RepoResult};
use super::schema::ensure_connection_ready;
use crate::model::counter::{Counter, COUNTER_KIND};
use log::{debug, error, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::thread;
use std::time::{Duration, Instant};

/// Attempts made before an increment gives up on lock contention.
pub const COUNTER_MAX_ATTEMPTS: u32 = 5;
const COUNTER_RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// Atomic named-counter operations.
pub trait CounterStore {
    /// Adds one to `name`, creating it at 1 when absent. Returns the new value.
    fn increment(&self, name: &str) -> RepoResult<i64>;
    /// Reads `name`; `CounterNotFound` when it was never incremented.
    fn get(&self, name: &str) -> RepoResult<i64>;
}

impl<T: CounterStore + ?Sized> CounterStore for &T {
    fn increment(&self, name: &str) -> RepoResult<i64> {
        (**self).increment(name)
    }

    fn get(&self, name: &str) -> RepoResult<i64> {
        (**self).get(name)
    }
}

/// SQLite-backed counter store.
pub struct SqliteCounterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCounterRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "counters", &["name", "count", "updated_at"])?;
        Ok(Self { conn })
    }

    /// Reads `name` as a full record.
    pub fn load(&self, name: &str) -> RepoResult<Counter> {
        Ok(Counter {
            name: name.to_string(),
            count: self.get(name)?,
        })
    }
}

impl CounterStore for SqliteCounterRepository<'_> {
    fn increment(&self, name: &str) -> RepoResult<i64> {
        let started_at = Instant::now();

        for attempt in 1..=COUNTER_MAX_ATTEMPTS {
            match increment_once(self.conn, name) {
                Ok(count) => {
                    debug!(
                        "event=counter_increment module=repo status=ok kind={} name={} count={} attempt={} duration_ms={}",
                        COUNTER_KIND,
                        name,
                        count,
                        attempt,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(count);
                }
                Err(err) if err.is_busy() => {
                    warn!(
                        "event=counter_increment module=repo status=retry kind={} name={} attempt={} error={}",
                        COUNTER_KIND, name, attempt, err
                    );
                    if attempt < COUNTER_MAX_ATTEMPTS {
                        thread::sleep(COUNTER_RETRY_BACKOFF * attempt);
                    }
                }
                Err(err) => {
                    error!(
                        "event=counter_increment module=repo status=error kind={} name={} attempt={} duration_ms={} error={}",
                        COUNTER_KIND,
                        name,
                        attempt,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(err);
                }
            }
        }

        error!(
            "event=counter_increment module=repo status=error kind={} name={} attempts={} duration_ms={} error_code=transaction_exhausted",
            COUNTER_KIND,
            name,
            COUNTER_MAX_ATTEMPTS,
            started_at.elapsed().as_millis()
        );
        Err(RepoError::TransactionExhausted {
            name: name.to_string(),
            attempts: COUNTER_MAX_ATTEMPTS,
        })
    }

    fn get(&self, name: &str) -> RepoResult<i64> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT count FROM counters WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        count.ok_or_else(|| RepoError::CounterNotFound(name.to_string()))
    }
}

fn increment_once(conn: &Connection, name: &str) -> RepoResult<i64> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let current: Option<i64> = tx
        .query_row(
            "SELECT count FROM counters WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    let next = current.unwrap_or(0).checked_add(1).ok_or_else(|| {
        RepoError::InvalidData(format!("counter `{name}` overflowed counters.count"))
    })?;

    tx.execute(
        "INSERT INTO counters (name, count)
         VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE
         SET count = excluded.count,
             updated_at = (strftime('%s', 'now') * 1000);",
        params![name, next],
    )?;
    tx.commit()?;
    Ok(next)
}
