//! Assembles a strategy and engine for a single table migration.
//!
//! The host migration-lifecycle layer stays external: it constructs a
//! [`TableMigration`], calls [`up`](TableMigration::up) or
//! [`down`](TableMigration::down) with a connection, and surfaces the
//! dry-run signal from the returned [`MigrationOutcome`] to the operator.

use crate::config::MigrationConfig;
use crate::connection::Connection;
use crate::engine::CopyEngine;
use crate::error::Error;
use crate::session::{PlannedStatement, Session};
use crate::strategy::{CopyStrategy, DeclarativeStrategy, RawSqlStrategy, TableChanges};
use crate::table::TableDescriptor;

/// What a finished run reports back to the operator.
#[derive(Debug)]
pub struct MigrationOutcome {
    /// Whether this was a dry run (no changes committed).
    pub dry_run: bool,
    /// The full statement plan, in issue order.
    pub plan: Vec<PlannedStatement>,
}

enum StrategyChoice {
    /// Declared structural changes; the projection is derived from them.
    Declarative(TableChanges),
    /// Caller-supplied copy query and DDL with table-name placeholders.
    /// `None` for the query means the identity copy over the captured
    /// columns.
    Raw {
        base_copy_query: Option<String>,
        schema_changes: Vec<String>,
    },
}

/// Builder for one online table migration.
pub struct TableMigration {
    table: String,
    config: MigrationConfig,
    choice: StrategyChoice,
}

impl TableMigration {
    /// Migrate `table` with the given configuration. Without further
    /// customization the copy is an identity projection over the table's
    /// columns.
    pub fn new(table: impl Into<String>, config: MigrationConfig) -> Self {
        Self {
            table: table.into(),
            config,
            choice: StrategyChoice::Raw {
                base_copy_query: None,
                schema_changes: Vec::new(),
            },
        }
    }

    /// Use declared structural changes; the copy projection and the DDL
    /// replayed against the new table both follow from them.
    pub fn change_table(mut self, changes: TableChanges) -> Self {
        self.choice = StrategyChoice::Declarative(changes);
        self
    }

    /// Use caller-supplied SQL: a base copy query and DDL statements, with
    /// `:table_name` / `:new_table_name` placeholders.
    pub fn raw_sql(mut self, base_copy_query: impl Into<String>, schema_changes: Vec<String>) -> Self {
        self.choice = StrategyChoice::Raw {
            base_copy_query: Some(base_copy_query.into()),
            schema_changes,
        };
        self
    }

    /// Run the forward migration.
    pub fn up<C: Connection>(&self, conn: C) -> Result<MigrationOutcome, Error> {
        self.run(conn, Direction::Up)
    }

    /// Run the reverse migration.
    pub fn down<C: Connection>(&self, conn: C) -> Result<MigrationOutcome, Error> {
        self.run(conn, Direction::Down)
    }

    /// Run only the creation and unlocked copy phases. A later
    /// [`up`](TableMigration::up) with `create_temp_table` off then holds the
    /// write lock only for the catch-up and swap.
    pub fn prepare<C: Connection>(&self, conn: C) -> Result<MigrationOutcome, Error> {
        self.run(conn, Direction::Prepare)
    }

    fn run<C: Connection>(&self, conn: C, direction: Direction) -> Result<MigrationOutcome, Error> {
        let mut session = Session::new(conn, self.config.dry_run);
        let descriptor = TableDescriptor::capture(&mut session, &self.table)?;

        match &self.choice {
            StrategyChoice::Declarative(changes) => {
                let strategy =
                    DeclarativeStrategy::new(descriptor, &self.config, changes.clone())?;
                self.drive(session, strategy, direction)
            }
            StrategyChoice::Raw {
                base_copy_query,
                schema_changes,
            } => {
                let base = match base_copy_query {
                    Some(sql) => sql.clone(),
                    None => RawSqlStrategy::identity_copy_query(&descriptor),
                };
                let strategy =
                    RawSqlStrategy::new(descriptor, &self.config, base, schema_changes.clone());
                self.drive(session, strategy, direction)
            }
        }
    }

    fn drive<C: Connection, S: CopyStrategy>(
        &self,
        session: Session<C>,
        strategy: S,
        direction: Direction,
    ) -> Result<MigrationOutcome, Error> {
        let mut engine = CopyEngine::new(session, strategy, self.config.clone())?;
        match direction {
            Direction::Up => engine.up()?,
            Direction::Down => engine.down()?,
            Direction::Prepare => engine.prepare()?,
        }
        Ok(MigrationOutcome {
            dry_run: self.config.dry_run,
            plan: engine.into_session().into_plan(),
        })
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
    Prepare,
}
