//! Copy strategies: what to copy, under what column names, and which
//! structural changes to apply to the new table.
//!
//! The [`DeclarativeStrategy`] replays a closed set of structural operations
//! and derives the copy projection from them; the [`RawSqlStrategy`] takes
//! caller-supplied SQL with table-name placeholders and leaves column choices
//! to the caller.

pub mod declarative;
pub mod raw;

pub use declarative::{DeclarativeStrategy, TableChanges};
pub use raw::RawSqlStrategy;

use crate::connection::Connection;
use crate::error::Error;
use crate::session::Session;
use crate::table::TableNames;

/// Which form a copy statement takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Plain `INSERT INTO ... SELECT`, append-only.
    Insert,
    /// Adds `ON DUPLICATE KEY UPDATE col=VALUES(col)` for every projected
    /// column, so re-copying a row always overwrites with the source's
    /// current values.
    Upsert,
}

/// One declared structural change, recorded in order for later replay
/// against the real schema of the new table.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralOp {
    /// Add a column with a raw SQL type and optional trailing options.
    AddColumn {
        /// Column name.
        name: String,
        /// SQL type, e.g. `VARCHAR(255)`.
        sql_type: String,
        /// Trailing options, e.g. `NOT NULL DEFAULT ''`.
        options: Option<String>,
    },
    /// Rename a column; the copy projection maps the source column to the
    /// new name.
    RenameColumn {
        /// Existing column name.
        from: String,
        /// New column name.
        to: String,
    },
    /// Drop columns; they are excluded from the copy projection.
    RemoveColumn {
        /// Columns to drop.
        names: Vec<String>,
    },
    /// Sugar for dropping `created_at` and `updated_at`.
    RemoveTimestamps,
    /// Passthrough for operations the engine does not interpret. The clause
    /// is appended verbatim to an `ALTER TABLE` on the new table and has no
    /// effect on the copy projection.
    Other {
        /// Raw `ALTER TABLE` clause.
        clause: String,
    },
}

/// Contract implemented by both strategy variants.
pub trait CopyStrategy {
    /// The source/new/old table names.
    fn names(&self) -> &TableNames;

    /// Source column names, from the table descriptor.
    fn column_names(&self) -> &[String];

    /// Replay the strategy's structural changes against the new table. Every
    /// statement goes through the session, so dry run records the DDL plan
    /// without mutating.
    fn apply_structural_changes<C: Connection>(
        &self,
        session: &mut Session<C>,
    ) -> Result<(), Error>;

    /// Build the copy statement: `INSERT INTO <new> (<cols>) SELECT <cols>
    /// FROM <source>`, with an optional `WHERE` predicate and, for
    /// [`CopyMode::Upsert`], a trailing `ON DUPLICATE KEY UPDATE` map.
    /// `columns` overrides the projected column list (used identically on
    /// both sides).
    fn copy_statement(
        &self,
        mode: CopyMode,
        predicate: Option<&str>,
        columns: Option<&[String]>,
    ) -> String;
}

/// Render the `ON DUPLICATE KEY UPDATE` map for already-quoted columns.
pub(crate) fn upsert_map(quoted_columns: &[String]) -> String {
    quoted_columns
        .iter()
        .map(|c| format!("{c}=VALUES({c})"))
        .collect::<Vec<_>>()
        .join(", ")
}
