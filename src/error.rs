//! Typed failures returned by the catalog core. The UI turns these into footer
//! messages; nothing in the core panics or exits on a failed operation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::db::codec::DecodeError;
use crate::models::Entity;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Duplicate id, or a duplicate ISBN for books.
    #[error("{entity} {key} already exists.")]
    AlreadyExists { entity: Entity, key: String },

    #[error("{entity} ID {id} not found.")]
    NotFound { entity: Entity, id: i64 },

    /// A delete blocked by a dependent book or an active loan.
    #[error("{entity} ID {id} cannot be deleted: {reason}.")]
    ReferentialConflict {
        entity: Entity,
        id: i64,
        reason: String,
    },

    #[error("{field} {value} is out of range ({min}-{max}).")]
    InvalidRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Invalid date '{0}' (use YYYY-MM-DD).")]
    InvalidDate(String),

    #[error("Book ID {book_id} is already on loan (loan ID {loan_id}).")]
    BookUnavailable { book_id: i64, loan_id: i64 },

    #[error("Loan ID {loan_id} was already returned on {date}.")]
    AlreadyReturned { loan_id: i64, date: String },

    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: DecodeError,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(entity: Entity, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }
}
