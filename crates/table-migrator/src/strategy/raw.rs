//! Raw SQL strategy: caller-supplied copy query and DDL with table-name
//! placeholders.

use tracing::debug;

use super::{upsert_map, CopyMode, CopyStrategy};
use crate::config::MigrationConfig;
use crate::connection::Connection;
use crate::error::Error;
use crate::session::Session;
use crate::table::{quote_ident, TableDescriptor, TableNames};

/// Placeholder for the source table in caller-supplied SQL.
pub const TABLE_PLACEHOLDER: &str = ":table_name";
/// Placeholder for the new table in caller-supplied SQL.
pub const NEW_TABLE_PLACEHOLDER: &str = ":new_table_name";

/// Strategy that executes caller-supplied SQL verbatim, substituting
/// `:table_name` and `:new_table_name`.
///
/// The base copy query must be a plain `INSERT INTO :new_table_name (...)
/// SELECT ... FROM :table_name` with no trailing clauses; the engine appends
/// predicates and the upsert map. Column choices are the caller's
/// responsibility.
pub struct RawSqlStrategy {
    names: TableNames,
    descriptor: TableDescriptor,
    base_copy_query: String,
    schema_changes: Vec<String>,
}

impl RawSqlStrategy {
    /// Build the strategy from a base copy query and a list of DDL statements
    /// to run against the new table.
    pub fn new(
        descriptor: TableDescriptor,
        config: &MigrationConfig,
        base_copy_query: impl Into<String>,
        schema_changes: Vec<String>,
    ) -> Self {
        let names = TableNames::derive(descriptor.table(), config.migration_name.as_deref());
        Self {
            names,
            descriptor,
            base_copy_query: base_copy_query.into(),
            schema_changes,
        }
    }

    /// Derive the identity base copy query over the descriptor's columns.
    pub fn identity_copy_query(descriptor: &TableDescriptor) -> String {
        let columns: Vec<String> = descriptor.columns().iter().map(|c| quote_ident(c)).collect();
        format!(
            "INSERT INTO {} ({cols}) SELECT {cols} FROM {}",
            NEW_TABLE_PLACEHOLDER,
            TABLE_PLACEHOLDER,
            cols = columns.join(", "),
        )
    }

    fn substitute(&self, sql: &str) -> String {
        sql.replace(NEW_TABLE_PLACEHOLDER, &quote_ident(&self.names.new_table))
            .replace(TABLE_PLACEHOLDER, &quote_ident(&self.names.table))
    }
}

impl CopyStrategy for RawSqlStrategy {
    fn names(&self) -> &TableNames {
        &self.names
    }

    fn column_names(&self) -> &[String] {
        self.descriptor.columns()
    }

    fn apply_structural_changes<C: Connection>(
        &self,
        session: &mut Session<C>,
    ) -> Result<(), Error> {
        for sql in &self.schema_changes {
            debug!("applying raw schema change: {}", sql);
            session.execute(&self.substitute(sql))?;
        }
        Ok(())
    }

    fn copy_statement(
        &self,
        mode: CopyMode,
        predicate: Option<&str>,
        columns: Option<&[String]>,
    ) -> String {
        let mut sql = self.substitute(&self.base_copy_query);
        if let Some(predicate) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        if mode == CopyMode::Upsert {
            // columns default to the full source column list
            let quoted: Vec<String> = match columns {
                Some(cols) => cols.iter().map(|c| quote_ident(c)).collect(),
                None => self
                    .descriptor
                    .columns()
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect(),
            };
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&upsert_map(&quoted));
        }
        sql
    }
}
