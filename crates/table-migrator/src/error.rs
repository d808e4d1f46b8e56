//! Error types for the copy/reconciliation engine.

use thiserror::Error;

/// Errors raised while planning or executing a table migration.
///
/// Configuration errors (`TableNameMismatch`, `MissingDeltaColumn`) are raised
/// before any statement executes and are never retried. Execution errors
/// propagate to the caller after lock release and autocommit restoration.
#[derive(Debug, Error)]
pub enum Error {
    /// A declared structural change names a table other than the one under
    /// migration.
    #[error("expected table `{expected}`, got `{got}`")]
    TableNameMismatch {
        /// The table the migration was built for.
        expected: String,
        /// The table the change was declared against.
        got: String,
    },

    /// The source table has no column to drive change detection.
    #[error("cannot migrate table `{table}` without a delta column: `{column}`")]
    MissingDeltaColumn {
        /// The table under migration.
        table: String,
        /// The configured delta column.
        column: String,
    },

    /// A statement was rejected or failed at the connection.
    #[error("statement failed: `{sql}`: {reason}")]
    Execution {
        /// The statement that failed.
        sql: String,
        /// Backend-reported reason.
        reason: String,
    },

    /// Connection-level failure outside a specific statement.
    #[error("connection error: {0}")]
    Connection(String),
}
