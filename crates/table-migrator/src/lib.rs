//! Online reshaping of live MySQL-flavored tables.
//!
//! Builds a structurally modified copy of a table, backfills it with the
//! existing rows, re-synchronizes rows mutated during the backfill, and
//! finally swaps the copy into place while holding an exclusive write lock
//! only for a short catch-up window.
//!
//! - Epoch/watermark bookkeeping makes the unlocked reconciliation correct:
//!   the epoch captured before each pass is the lower bound the next pass
//!   re-covers.
//! - Strategies decide what gets copied: [`DeclarativeStrategy`] derives the
//!   projection from declared structural operations, [`RawSqlStrategy`] runs
//!   caller-supplied SQL with table-name placeholders.
//! - Dry run suppresses every mutation and fabricates safe reads while the
//!   complete statement plan is still produced and reported.
//!
//! # Example
//!
//! ```ignore
//! use table_migrator::{MigrationConfig, TableChanges, TableMigration};
//!
//! let config = MigrationConfig {
//!     multi_pass: true,
//!     ..MigrationConfig::default()
//! };
//!
//! let outcome = TableMigration::new("users", config)
//!     .change_table(
//!         TableChanges::new("users")
//!             .rename_column("email", "email_address")
//!             .remove_columns(&["created_at"]),
//!     )
//!     .up(conn)?;
//!
//! if outcome.dry_run {
//!     println!("dry run, no changes committed");
//! }
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod lock;
pub mod migrate;
pub mod session;
pub mod strategy;
pub mod table;

pub use config::{CopyTuning, MigrationConfig};
pub use connection::{Connection, Row, Value};
pub use engine::CopyEngine;
pub use epoch::{Epoch, EpochTracker};
pub use error::Error;
pub use migrate::{MigrationOutcome, TableMigration};
pub use session::{PlannedStatement, Session, StatementKind};
pub use strategy::{
    CopyMode, CopyStrategy, DeclarativeStrategy, RawSqlStrategy, StructuralOp, TableChanges,
};
pub use table::{TableDescriptor, TableNames};
