//! Epoch bookkeeping over the delta column.
//!
//! An epoch is a captured value of the delta column marking "all rows mutated
//! at or after this point must still be reconciled". The epoch recorded
//! before an unlocked pass begins becomes the lower bound the next pass must
//! re-cover: any row mutated during the pass has a delta value at or above
//! that epoch, so the following pass is guaranteed to pick it up.

use tracing::info;

use crate::connection::Connection;
use crate::error::Error;
use crate::session::Session;
use crate::table::quote_ident;

/// An opaque captured value of the delta column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epoch(String);

impl Epoch {
    /// Beginning-of-time sentinel: every row sorts at or after it.
    pub fn beginning() -> Self {
        Epoch("1970-01-01 00:00:00".to_string())
    }

    /// Wrap a raw delta-column value.
    pub fn new(raw: impl Into<String>) -> Self {
        Epoch(raw.into())
    }

    /// The raw value, as rendered into statements.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Captures and threads the watermark forward between passes.
pub struct EpochTracker {
    table: String,
    delta_column: String,
    next: Option<Epoch>,
}

impl EpochTracker {
    /// Track epochs of `delta_column` on `table`.
    pub fn new(table: impl Into<String>, delta_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            delta_column: delta_column.into(),
            next: None,
        }
    }

    /// Read the current maximum of the delta column. Under dry run this
    /// returns the beginning-of-time sentinel without querying.
    pub fn capture<C: Connection>(&self, session: &mut Session<C>) -> Result<Epoch, Error> {
        if session.dry_run() {
            return Ok(Epoch::beginning());
        }

        let sql = format!(
            "SELECT {delta} FROM {table} ORDER BY {delta} DESC LIMIT 1",
            delta = quote_ident(&self.delta_column),
            table = quote_ident(&self.table),
        );
        let rows = session.query(&sql)?;
        let epoch = match rows.first().and_then(|r| r.first()) {
            Some(value) if !value.is_null() => Epoch::new(value.to_string()),
            _ => Epoch::beginning(),
        };
        Ok(epoch)
    }

    /// Capture a new epoch, returning the previously held one (`None` on the
    /// first call) and the one just captured. The new epoch is retained for
    /// [`last`](Self::last).
    pub fn flop<C: Connection>(
        &mut self,
        session: &mut Session<C>,
    ) -> Result<(Option<Epoch>, Epoch), Error> {
        let current = self.capture(session)?;
        info!("current epoch starts at: {}", current);
        let previous = self.next.replace(current.clone());
        Ok((previous, current))
    }

    /// The most recently captured epoch.
    pub fn last(&self) -> Option<&Epoch> {
        self.next.as_ref()
    }
}
