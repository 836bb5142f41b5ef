//! Error types for catalog operations.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// SQLite primary result codes (extended codes carry them in the low byte).
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CONSTRAINT: i32 = 19;

/// How a failed statement affects the pass that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Another connection held the write lock past the busy timeout.
    Locked,
    /// A UNIQUE, FOREIGN KEY, CHECK or NOT NULL constraint rejected the write.
    Constraint,
    /// IO, pool, driver or SQL failure.
    Other,
}

impl From<&sqlx::Error> for DbErrorKind {
    fn from(error: &sqlx::Error) -> Self {
        let sqlx::Error::Database(db) = error else {
            return Self::Other;
        };

        match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => return Self::Constraint,
            _ => {}
        }

        let primary = db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| code & 0xff);
        match primary {
            Some(SQLITE_BUSY | SQLITE_LOCKED) => Self::Locked,
            Some(SQLITE_CONSTRAINT) => Self::Constraint,
            _ => Self::Other,
        }
    }
}

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// A statement failed; any open transaction was rolled back.
    #[error("database error ({kind:?}): {message}")]
    Database {
        kind: DbErrorKind,
        /// Driver error text.
        message: String,
    },

    /// A binary expected to exist was gone when the write ran.
    #[error("binary not found: id {0}")]
    BinaryNotFound(i64),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: DbErrorKind::from(&err),
            message: err.to_string(),
        }
    }
}

impl CatalogError {
    /// Classification of a database failure.
    #[must_use]
    pub fn kind(&self) -> Option<DbErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            Self::BinaryNotFound(_) => None,
        }
    }

    /// True when a rolled-back write concerned only the binary it touched:
    /// the binary vanished, another writer claimed the release key first,
    /// or the database stayed locked. The binary is still eligible on the
    /// next pass, so the promoter counts it as failed and moves on.
    #[must_use]
    pub fn is_candidate_scoped(&self) -> bool {
        match self {
            Self::BinaryNotFound(_) => true,
            Self::Database { kind, .. } => matches!(kind, DbErrorKind::Locked | DbErrorKind::Constraint),
        }
    }
}
