//! Store-side identifier allocation.
//!
//! # Responsibility
//! - Hand out ids that are unique among every record of one kind ever created.
//!
//! # Invariants
//! - Ids per kind are strictly increasing and never handed out twice, even
//!   after the record that used one is deleted.
//! - Allocation is one upsert statement, so two connections can never observe
//!   the same `last_id`. Callers that persist a record run it inside the same
//!   write transaction so id and record commit together.

use super::error::{RepoError, RepoResult};
use log::debug;
use rusqlite::Connection;

/// Allocates the next id for `kind`.
///
/// Deleted records leave holes; ids are unique, not dense.
pub fn allocate_id(conn: &Connection, kind: &str) -> RepoResult<i64> {
    let id: i64 = conn.query_row(
        "INSERT INTO key_sequences (kind, last_id)
         VALUES (?1, 1)
         ON CONFLICT(kind) DO UPDATE SET last_id = last_id + 1
         RETURNING last_id;",
        [kind],
        |row| row.get(0),
    )?;

    if id <= 0 {
        return Err(RepoError::InvalidData(format!(
            "key sequence `{kind}` produced non-positive id {id}"
        )));
    }

    debug!("event=key_allocate module=repo status=ok kind={kind} id={id}");
    Ok(id)
}
