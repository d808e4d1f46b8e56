//! Table naming and the immutable column snapshot.

use crate::connection::Connection;
use crate::error::Error;
use crate::session::Session;

/// Backtick-quote an identifier.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident)
}

/// The three table names involved in a migration.
///
/// For any nonempty table name the three are pairwise distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// The live table under migration.
    pub table: String,
    /// The structurally modified copy being populated.
    pub new_table: String,
    /// Where the original lands after the swap.
    pub old_table: String,
}

impl TableNames {
    /// Derive the copy and retirement names for `table`.
    pub fn derive(table: &str, migration_name: Option<&str>) -> Self {
        let old_table = match migration_name {
            Some(name) => format!("{}_pre_{}", table, name),
            None => format!("{}_old", table),
        };
        Self {
            table: table.to_string(),
            new_table: format!("new_{}", table),
            old_table,
        }
    }
}

/// Immutable snapshot of a table's column names, captured once before any
/// pass runs.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    table: String,
    columns: Vec<String>,
}

impl TableDescriptor {
    /// Capture the column list through the session's connection.
    pub fn capture<C: Connection>(session: &mut Session<C>, table: &str) -> Result<Self, Error> {
        let columns = session.columns(table)?;
        Ok(Self {
            table: table.to_string(),
            columns,
        })
    }

    /// Build a descriptor from an already known column list.
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// The table this snapshot describes.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names in schema order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether the table has a column named `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_default_names() {
        let names = TableNames::derive("users", None);
        assert_eq!(names.table, "users");
        assert_eq!(names.new_table, "new_users");
        assert_eq!(names.old_table, "users_old");
    }

    #[test]
    fn test_derive_named_migration() {
        let names = TableNames::derive("users", Some("add_email_address"));
        assert_eq!(names.old_table, "users_pre_add_email_address");
    }

    #[test]
    fn test_names_pairwise_distinct() {
        for migration_name in [None, Some("split_name")] {
            let names = TableNames::derive("t", migration_name);
            assert_ne!(names.table, names.new_table);
            assert_ne!(names.table, names.old_table);
            assert_ne!(names.new_table, names.old_table);
        }
    }

    #[test]
    fn test_descriptor_lookup() {
        let descriptor = TableDescriptor::new(
            "users",
            vec!["id".to_string(), "name".to_string(), "updated_at".to_string()],
        );
        assert_eq!(descriptor.table(), "users");
        assert!(descriptor.has_column("updated_at"));
        assert!(!descriptor.has_column("email"));
        assert_eq!(descriptor.columns().len(), 3);
    }
}
