//! Dry-run demo: plan an online migration of a `users` table and print the
//! statement sequence a live run would issue.
//!
//! Run with: cargo run

use table_migrator::{
    Connection, Error, MigrationConfig, Row, StatementKind, TableChanges, TableMigration,
};

/// A connection that only answers schema introspection. Dry run never sends
/// mutations or reads, so nothing else is needed.
struct SchemaOnlyConnection;

impl Connection for SchemaOnlyConnection {
    fn execute(&mut self, sql: &str) -> Result<u64, Error> {
        Err(Error::Connection(format!("unexpected statement: {}", sql)))
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>, Error> {
        Err(Error::Connection(format!("unexpected query: {}", sql)))
    }

    fn columns(&mut self, _table: &str) -> Result<Vec<String>, Error> {
        Ok(["id", "name", "email", "created_at", "updated_at"]
            .iter()
            .map(|c| c.to_string())
            .collect())
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = MigrationConfig {
        dry_run: true,
        multi_pass: true,
        ..MigrationConfig::default()
    };

    let outcome = TableMigration::new("users", config)
        .change_table(
            TableChanges::new("users")
                .rename_column("email", "email_address")
                .remove_columns(&["created_at"]),
        )
        .up(SchemaOnlyConnection)?;

    println!("dry run: no statement below was executed\n");
    for statement in &outcome.plan {
        let marker = match statement.kind {
            StatementKind::Execute => "!",
            StatementKind::Query => "?",
        };
        println!("{} {}", marker, statement.sql);
    }

    Ok(())
}
