//! Error taxonomy for GridBase operations.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants map
//! one-to-one onto the failure classes callers are expected to branch on:
//! missing records, malformed payloads, transactions that could not commit,
//! and bulk-ingestion runs that only partially committed.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GridError>;

#[derive(Debug, Error)]
pub enum GridError {
    /// A referenced record (table, view, row, or cell) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A payload was structurally invalid (unknown operator, unknown column
    /// type, and similar closed-set violations).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A storage transaction could not commit. Nothing from the transaction
    /// is observable.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// A bulk-ingestion run concluded without reaching the requested row
    /// count. Chunks that committed stay committed; the caller recovers the
    /// actual total by re-querying the table.
    #[error("bulk ingestion incomplete: did not reach {requested} rows")]
    PartialIngestion { requested: usize },
}

impl GridError {
    pub fn not_found(what: impl Into<String>) -> Self {
        GridError::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GridError::NotFound(_))
    }
}
