//! Error type shared by the listing, counter and key-allocation stores.

use crate::db::DbError;
use crate::model::listing::ListingId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse classification adapters use to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoErrorKind {
    /// Lookup or delete target does not exist.
    NotFound,
    /// The database could not complete the operation.
    StorageUnavailable,
    /// The connection is not migrated to the schema this binary expects.
    Schema,
    /// A stored row cannot be read back as a valid record.
    InvalidData,
}

#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// No listing is stored under this id.
    ListingNotFound(ListingId),
    /// Counter was never incremented.
    CounterNotFound(String),
    /// Counter transaction kept hitting lock contention.
    TransactionExhausted { name: String, attempts: u32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> RepoErrorKind {
        match self {
            Self::Db(_) | Self::TransactionExhausted { .. } => RepoErrorKind::StorageUnavailable,
            Self::ListingNotFound(_) | Self::CounterNotFound(_) => RepoErrorKind::NotFound,
            Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => RepoErrorKind::Schema,
            Self::InvalidData(_) => RepoErrorKind::InvalidData,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == RepoErrorKind::NotFound
    }

    /// Returns whether the failure is lock contention that may clear on retry.
    pub(crate) fn is_busy(&self) -> bool {
        match self {
            Self::Db(err) => err.is_busy(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ListingNotFound(id) => write!(f, "listing not found: {id}"),
            Self::CounterNotFound(name) => write!(f, "counter not found: {name}"),
            Self::TransactionExhausted { name, attempts } => write!(
                f,
                "counter `{name}` transaction gave up after {attempts} attempts"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::ListingNotFound(_) => None,
            Self::CounterNotFound(_) => None,
            Self::TransactionExhausted { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
