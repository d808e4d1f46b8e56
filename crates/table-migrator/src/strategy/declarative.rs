//! Declarative strategy: structural operations replayed in order, with the
//! copy projection derived from them.

use std::collections::HashMap;

use tracing::debug;

use super::{upsert_map, CopyMode, CopyStrategy, StructuralOp};
use crate::config::MigrationConfig;
use crate::connection::Connection;
use crate::error::Error;
use crate::session::Session;
use crate::table::{quote_ident, TableDescriptor, TableNames};

/// Ordered structural changes declared against a named table.
///
/// The table name is checked against the table under migration when the
/// strategy is built; a mismatch is fatal before any DDL executes.
#[derive(Debug, Clone)]
pub struct TableChanges {
    table: String,
    ops: Vec<StructuralOp>,
}

impl TableChanges {
    /// Start a change list for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ops: Vec::new(),
        }
    }

    /// Add a column.
    pub fn add_column(
        mut self,
        name: impl Into<String>,
        sql_type: impl Into<String>,
        options: Option<&str>,
    ) -> Self {
        self.ops.push(StructuralOp::AddColumn {
            name: name.into(),
            sql_type: sql_type.into(),
            options: options.map(str::to_string),
        });
        self
    }

    /// Rename a column.
    pub fn rename_column(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.ops.push(StructuralOp::RenameColumn {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Drop one or more columns.
    pub fn remove_columns(mut self, names: &[&str]) -> Self {
        self.ops.push(StructuralOp::RemoveColumn {
            names: names.iter().map(|n| n.to_string()).collect(),
        });
        self
    }

    /// Drop `created_at` and `updated_at`.
    pub fn remove_timestamps(mut self) -> Self {
        self.ops.push(StructuralOp::RemoveTimestamps);
        self
    }

    /// Record a raw `ALTER TABLE` clause the engine does not interpret.
    pub fn other(mut self, clause: impl Into<String>) -> Self {
        self.ops.push(StructuralOp::Other {
            clause: clause.into(),
        });
        self
    }

    /// The table the changes were declared against.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The recorded operations, in declaration order.
    pub fn ops(&self) -> &[StructuralOp] {
        &self.ops
    }
}

/// Strategy that replays [`StructuralOp`]s and projects the copy accordingly.
pub struct DeclarativeStrategy {
    names: TableNames,
    descriptor: TableDescriptor,
    ops: Vec<StructuralOp>,
    /// Source column -> destination column; `None` means dropped. Total over
    /// the descriptor's columns, identity by default.
    projection: HashMap<String, Option<String>>,
}

impl DeclarativeStrategy {
    /// Build the strategy, validating the declared table name and replaying
    /// the operations into the projection map. Replay order is significant: a
    /// later rename or drop overrides an earlier mapping for the same column.
    pub fn new(
        descriptor: TableDescriptor,
        config: &MigrationConfig,
        changes: TableChanges,
    ) -> Result<Self, Error> {
        if changes.table() != descriptor.table() {
            return Err(Error::TableNameMismatch {
                expected: descriptor.table().to_string(),
                got: changes.table().to_string(),
            });
        }

        let names = TableNames::derive(descriptor.table(), config.migration_name.as_deref());

        let mut projection: HashMap<String, Option<String>> = descriptor
            .columns()
            .iter()
            .map(|c| (c.clone(), Some(c.clone())))
            .collect();

        for op in changes.ops() {
            match op {
                StructuralOp::RenameColumn { from, to } => {
                    if let Some(entry) = projection.get_mut(from) {
                        *entry = Some(to.clone());
                    }
                }
                StructuralOp::RemoveColumn { names } => {
                    for name in names {
                        if let Some(entry) = projection.get_mut(name) {
                            *entry = None;
                        }
                    }
                }
                StructuralOp::RemoveTimestamps => {
                    for name in ["created_at", "updated_at"] {
                        if let Some(entry) = projection.get_mut(name) {
                            *entry = None;
                        }
                    }
                }
                // no effect on the projection; still replayed as DDL
                StructuralOp::AddColumn { .. } | StructuralOp::Other { .. } => {}
            }
        }

        Ok(Self {
            names,
            descriptor,
            ops: changes.ops.clone(),
            projection,
        })
    }

    /// Source/destination column pairs in schema order, dropped columns
    /// excluded.
    pub fn projected_pairs(&self) -> Vec<(String, String)> {
        self.descriptor
            .columns()
            .iter()
            .filter_map(|source| {
                self.projection
                    .get(source)
                    .and_then(|dest| dest.as_ref())
                    .map(|dest| (source.clone(), dest.clone()))
            })
            .collect()
    }

    fn render_ddl(&self, op: &StructuralOp) -> Vec<String> {
        let new_table = quote_ident(&self.names.new_table);
        match op {
            StructuralOp::AddColumn {
                name,
                sql_type,
                options,
            } => {
                let mut sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    new_table,
                    quote_ident(name),
                    sql_type
                );
                if let Some(options) = options {
                    sql.push(' ');
                    sql.push_str(options);
                }
                vec![sql]
            }
            StructuralOp::RenameColumn { from, to } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                new_table,
                quote_ident(from),
                quote_ident(to)
            )],
            StructuralOp::RemoveColumn { names } => names
                .iter()
                .map(|name| {
                    format!("ALTER TABLE {} DROP COLUMN {}", new_table, quote_ident(name))
                })
                .collect(),
            StructuralOp::RemoveTimestamps => ["created_at", "updated_at"]
                .into_iter()
                .filter(|name| self.descriptor.has_column(name))
                .map(|name| {
                    format!("ALTER TABLE {} DROP COLUMN {}", new_table, quote_ident(name))
                })
                .collect(),
            StructuralOp::Other { clause } => {
                vec![format!("ALTER TABLE {} {}", new_table, clause)]
            }
        }
    }
}

impl CopyStrategy for DeclarativeStrategy {
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
        for op in &self.ops {
            debug!("replaying structural change: {:?}", op);
            for sql in self.render_ddl(op) {
                session.execute(&sql)?;
            }
        }
        Ok(())
    }

    fn copy_statement(
        &self,
        mode: CopyMode,
        predicate: Option<&str>,
        columns: Option<&[String]>,
    ) -> String {
        let pairs: Vec<(String, String)> = match columns {
            Some(cols) => cols.iter().map(|c| (c.clone(), c.clone())).collect(),
            None => self.projected_pairs(),
        };
        let sources: Vec<String> = pairs.iter().map(|(s, _)| quote_ident(s)).collect();
        let dests: Vec<String> = pairs.iter().map(|(_, d)| quote_ident(d)).collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            quote_ident(&self.names.new_table),
            dests.join(", "),
            sources.join(", "),
            quote_ident(&self.names.table),
        );
        if let Some(predicate) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        if mode == CopyMode::Upsert {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&upsert_map(&dests));
        }
        sql
    }
}
