//! Statement gate: dry-run suppression and plan capture.
//!
//! Every statement the engine issues flows through a [`Session`]. The session
//! records the statement in an ordered plan, logs it, and either forwards it
//! to the connection or, under dry run, suppresses the mutation and fabricates
//! a safe read result. The plan is complete in both modes, so a dry run
//! reports exactly the statement sequence a real run would issue.

use tracing::debug;

use crate::connection::{Connection, Row};
use crate::error::Error;

/// Whether a planned statement mutates or reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A mutating statement (DDL or DML).
    Execute,
    /// A read-only query.
    Query,
}

/// One entry in the statement plan.
#[derive(Debug, Clone)]
pub struct PlannedStatement {
    /// The statement text.
    pub sql: String,
    /// Mutating or read-only.
    pub kind: StatementKind,
    /// Whether the statement was actually sent to the connection.
    pub executed: bool,
}

/// A connection wrapped with dry-run gating and plan capture.
pub struct Session<C: Connection> {
    conn: C,
    dry_run: bool,
    plan: Vec<PlannedStatement>,
}

impl<C: Connection> Session<C> {
    /// Wrap a connection. Under `dry_run`, mutations are suppressed and reads
    /// return empty results.
    pub fn new(conn: C, dry_run: bool) -> Self {
        Self {
            conn,
            dry_run,
            plan: Vec::new(),
        }
    }

    /// Whether this session suppresses mutation.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute a mutating statement; returns the affected row count
    /// (fabricated as zero under dry run).
    pub fn execute(&mut self, sql: &str) -> Result<u64, Error> {
        debug!(dry_run = self.dry_run, "executing: {}", sql);
        self.plan.push(PlannedStatement {
            sql: sql.to_string(),
            kind: StatementKind::Execute,
            executed: !self.dry_run,
        });
        if self.dry_run {
            return Ok(0);
        }
        self.conn.execute(sql)
    }

    /// Run a read-only query (fabricated as empty under dry run).
    pub fn query(&mut self, sql: &str) -> Result<Vec<Row>, Error> {
        debug!(dry_run = self.dry_run, "querying: {}", sql);
        self.plan.push(PlannedStatement {
            sql: sql.to_string(),
            kind: StatementKind::Query,
            executed: !self.dry_run,
        });
        if self.dry_run {
            return Ok(Vec::new());
        }
        self.conn.query(sql)
    }

    /// List a table's columns. Introspection is non-destructive and is
    /// forwarded even under dry run.
    pub fn columns(&mut self, table: &str) -> Result<Vec<String>, Error> {
        self.conn.columns(table)
    }

    /// The statement plan so far, in issue order.
    pub fn plan(&self) -> &[PlannedStatement] {
        &self.plan
    }

    /// Consume the session, returning the plan.
    pub fn into_plan(self) -> Vec<PlannedStatement> {
        self.plan
    }

    /// Consume the session, returning the underlying connection.
    pub fn into_inner(self) -> C {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Value;

    #[derive(Default)]
    struct LogConnection {
        executed: Vec<String>,
        queried: Vec<String>,
    }

    impl Connection for LogConnection {
        fn execute(&mut self, sql: &str) -> Result<u64, Error> {
            self.executed.push(sql.to_string());
            Ok(3)
        }

        fn query(&mut self, sql: &str) -> Result<Vec<Row>, Error> {
            self.queried.push(sql.to_string());
            Ok(vec![Row::new(vec![Value::Int(1)])])
        }

        fn columns(&mut self, _table: &str) -> Result<Vec<String>, Error> {
            Ok(vec!["id".to_string()])
        }
    }

    #[test]
    fn test_live_session_forwards() {
        let mut session = Session::new(LogConnection::default(), false);

        assert_eq!(session.execute("DROP TABLE `t`").unwrap(), 3);
        assert_eq!(session.query("SELECT 1").unwrap().len(), 1);

        let conn = session.into_inner();
        assert_eq!(conn.executed, vec!["DROP TABLE `t`"]);
        assert_eq!(conn.queried, vec!["SELECT 1"]);
    }

    #[test]
    fn test_dry_run_suppresses_mutation_and_fakes_reads() {
        let mut session = Session::new(LogConnection::default(), true);

        assert_eq!(session.execute("DROP TABLE `t`").unwrap(), 0);
        assert!(session.query("SELECT 1").unwrap().is_empty());
        // introspection still reaches the connection
        assert_eq!(session.columns("t").unwrap(), vec!["id".to_string()]);

        let plan = session.plan().to_vec();
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|s| !s.executed));
        assert_eq!(plan[0].kind, StatementKind::Execute);
        assert_eq!(plan[1].kind, StatementKind::Query);

        let conn = session.into_inner();
        assert!(conn.executed.is_empty());
        assert!(conn.queried.is_empty());
    }

    #[test]
    fn test_plan_preserves_issue_order() {
        let mut session = Session::new(LogConnection::default(), false);
        session.execute("A").unwrap();
        session.query("B").unwrap();
        session.execute("C").unwrap();

        let sqls: Vec<&str> = session.plan().iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(sqls, vec!["A", "B", "C"]);
    }
}
