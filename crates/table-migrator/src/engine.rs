//! The copy engine: create, bulk copy, delta reconciliation, locked swap.
//!
//! `up` drives `Created -> BulkCopied -> DeltaPass* -> CatchupLocked ->
//! Swapped`; arbitrary-duration scanning and reconciliation happen unlocked,
//! and only the final catch-up plus the two renames run under the table write
//! lock. `down` renames the old table back and drops the copy under the same
//! lock discipline.

use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::MigrationConfig;
use crate::connection::{Connection, Value};
use crate::epoch::{Epoch, EpochTracker};
use crate::error::Error;
use crate::lock;
use crate::session::Session;
use crate::strategy::{CopyMode, CopyStrategy};
use crate::table::quote_ident;

/// Orchestrates one online table migration over a single connection.
///
/// The engine is single-threaded: it issues one statement at a time and
/// blocks until it completes. No two engine instances may target the same
/// table pair.
pub struct CopyEngine<C: Connection, S: CopyStrategy> {
    session: Session<C>,
    strategy: S,
    config: MigrationConfig,
    epochs: EpochTracker,
}

impl<C: Connection, S: CopyStrategy> CopyEngine<C, S> {
    /// Build an engine. Fails before any statement executes if the source
    /// table lacks the configured delta column (unless dry run).
    pub fn new(session: Session<C>, strategy: S, config: MigrationConfig) -> Result<Self, Error> {
        if !config.dry_run
            && !strategy
                .column_names()
                .iter()
                .any(|c| c == &config.delta_column)
        {
            return Err(Error::MissingDeltaColumn {
                table: strategy.names().table.clone(),
                column: config.delta_column.clone(),
            });
        }

        let epochs = EpochTracker::new(&strategy.names().table, &config.delta_column);
        Ok(Self {
            session,
            strategy,
            config,
            epochs,
        })
    }

    /// The session, for plan inspection.
    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Consume the engine, returning the session.
    pub fn into_session(self) -> Session<C> {
        self.session
    }

    /// Run the forward migration: build and populate the copy, reconcile
    /// deltas, then catch up and swap under a short write lock.
    pub fn up(&mut self) -> Result<(), Error> {
        if self.session.dry_run() {
            info!("executing dry run");
        }

        if self.config.create_temp_table {
            self.create_new_table()?;
        }

        let names = self.strategy.names().clone();

        if self.has_rows()? {
            if self.config.create_temp_table {
                self.paged_copy()?;
            }
            if self.config.multi_pass {
                self.multi_pass_delta_copy()?;
            }
            if self.config.create_temp_table || self.config.multi_pass {
                self.settle();
            }

            // lock for write, copy the final delta, and swap
            let catch_up = self.full_delta_copy_query();
            let (rename_out, rename_in) = self.swap_statements();
            lock::with_write_lock(
                &mut self.session,
                &[&names.table, &names.new_table],
                |s| {
                    info!("copying delta from {} to {}", names.table, names.new_table);
                    s.execute(&catch_up)?;
                    s.execute(&rename_out)?;
                    s.execute(&rename_in)?;
                    Ok(())
                },
            )?;
        } else {
            // no pre-existing rows: lock and copy everything (probably still
            // nothing) through the same code path
            let base_copy = self.strategy.copy_statement(CopyMode::Insert, None, None);
            let (rename_out, rename_in) = self.swap_statements();
            lock::with_write_lock(
                &mut self.session,
                &[&names.table, &names.new_table],
                |s| {
                    s.execute(&base_copy)?;
                    s.execute(&rename_out)?;
                    s.execute(&rename_in)?;
                    Ok(())
                },
            )?;
        }

        Ok(())
    }

    /// Reverse the swap: rename the live table back to the copy name,
    /// restore the old table, and drop the copy.
    pub fn down(&mut self) -> Result<(), Error> {
        let names = self.strategy.names().clone();
        let rename_out = format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(&names.table),
            quote_ident(&names.new_table)
        );
        let rename_back = format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(&names.old_table),
            quote_ident(&names.table)
        );
        let drop_new = format!("DROP TABLE {}", quote_ident(&names.new_table));

        lock::with_write_lock(&mut self.session, &[&names.table, &names.old_table], |s| {
            s.execute(&rename_out)?;
            s.execute(&rename_back)?;
            s.execute(&drop_new)?;
            Ok(())
        })
    }

    /// Run only the creation and unlocked copy phases, so a later `up` (with
    /// `create_temp_table` off) holds the write lock for as little time as
    /// possible. The later run re-covers recent changes through its own delta
    /// passes and locked catch-up.
    pub fn prepare(&mut self) -> Result<(), Error> {
        self.create_new_table()?;
        self.paged_copy()?;
        if self.config.multi_pass {
            self.multi_pass_delta_copy()?;
        }
        Ok(())
    }

    /// Create the new table as a structural clone of the source, then apply
    /// the strategy's changes.
    fn create_new_table(&mut self) -> Result<(), Error> {
        let names = self.strategy.names().clone();
        self.session.execute(&format!(
            "CREATE TABLE {} LIKE {}",
            quote_ident(&names.new_table),
            quote_ident(&names.table)
        ))?;

        info!("applying structural changes to {}", names.new_table);
        self.strategy.apply_structural_changes(&mut self.session)
    }

    /// Bulk paged copy: forward-only pagination over the identity column,
    /// append-only. The epoch captured here is the lower bound the delta
    /// phase must re-cover.
    pub fn paged_copy(&mut self) -> Result<(), Error> {
        let names = self.strategy.names().clone();
        info!("copying {} to {}", names.table, names.new_table);

        // record the start of this epoch before scanning
        self.epochs.flop(&mut self.session)?;

        let page_size = self.config.tuning.page_size;
        // resume past whatever already landed in the destination
        let mut start = self.destination_max_id()?;
        let mut page: u32 = 0;
        loop {
            page += 1;
            debug!(page, start, "bulk copy page");

            let sql = format!(
                "{} LIMIT {}",
                self.strategy.copy_statement(
                    CopyMode::Insert,
                    Some(&format!("{} > {}", quote_ident("id"), start)),
                    None,
                ),
                page_size
            );
            let copied = self.session.execute(&sql)?;

            // a short page means the source is exhausted past `start`
            if copied < page_size {
                break;
            }

            let new_start = self.destination_max_id()?;
            if new_start == start {
                break;
            }
            start = new_start;
        }
        Ok(())
    }

    /// Multi-pass delta copy: repeated unlocked reconciliation until a pass
    /// runs fast enough to fit under the lock, or the pass budget is spent.
    /// Exhausting the budget is not an error; the locked catch-up is the
    /// correctness backstop either way.
    pub fn multi_pass_delta_copy(&mut self) -> Result<(), Error> {
        let names = self.strategy.names().clone();
        info!(
            "multi-pass non-locking delta copy from {} to {}",
            names.table, names.new_table
        );

        let mut pass: u32 = 0;
        loop {
            pass += 1;
            debug!(pass, "delta pass");

            let started = Instant::now();
            self.paged_delta_copy()?;
            let elapsed = started.elapsed();

            if elapsed <= self.config.tuning.convergence_threshold {
                info!(pass, ?elapsed, "delta copy converged");
                break;
            }
            if pass >= self.config.tuning.max_delta_passes {
                info!(pass, "delta pass budget spent; deferring to locked catch-up");
                break;
            }
        }
        Ok(())
    }

    /// One unlocked delta pass: upsert all rows changed since the previous
    /// epoch, in fixed-size id batches.
    fn paged_delta_copy(&mut self) -> Result<(), Error> {
        let (previous, _current) = self.epochs.flop(&mut self.session)?;
        let epoch = previous.unwrap_or_else(Epoch::beginning);

        let ids_sql = format!(
            "SELECT {id} FROM {table} WHERE {delta} >= '{epoch}'",
            id = quote_ident("id"),
            table = quote_ident(&self.strategy.names().table),
            delta = quote_ident(&self.config.delta_column),
            epoch = epoch,
        );
        let updated_ids: Vec<i64> = self
            .session
            .query(&ids_sql)?
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_i64))
            .collect();

        for chunk in updated_ids.chunks(self.config.tuning.delta_batch_size) {
            let ids = chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let sql = self.strategy.copy_statement(
                CopyMode::Upsert,
                Some(&format!("{} IN ({})", quote_ident("id"), ids)),
                None,
            );
            self.session.execute(&sql)?;
        }
        Ok(())
    }

    /// The final catch-up statement: a single unbatched upsert over
    /// everything at or past the last captured epoch. Executed under the
    /// write lock, where its cost is bounded by the converged delta volume.
    fn full_delta_copy_query(&self) -> String {
        let epoch = self.epochs.last().cloned().unwrap_or_else(Epoch::beginning);
        self.strategy.copy_statement(
            CopyMode::Upsert,
            Some(&format!(
                "{} >= '{}'",
                quote_ident(&self.config.delta_column),
                epoch
            )),
            None,
        )
    }

    fn swap_statements(&self) -> (String, String) {
        let names = self.strategy.names();
        (
            format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_ident(&names.table),
                quote_ident(&names.old_table)
            ),
            format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_ident(&names.new_table),
                quote_ident(&names.table)
            ),
        )
    }

    /// Whether the source has at least one row. Dry run always reports rows,
    /// so the full plan is exercised.
    fn has_rows(&mut self) -> Result<bool, Error> {
        if self.session.dry_run() {
            return Ok(true);
        }
        let sql = format!(
            "SELECT * FROM {} LIMIT 1",
            quote_ident(&self.strategy.names().table)
        );
        Ok(!self.session.query(&sql)?.is_empty())
    }

    /// Current watermark: maximum id present in the destination.
    fn destination_max_id(&mut self) -> Result<i64, Error> {
        let sql = format!(
            "SELECT MAX({}) FROM {}",
            quote_ident("id"),
            quote_ident(&self.strategy.names().new_table)
        );
        let rows = self.session.query(&sql)?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    /// Unlocked pause before the locked pass, shrinking the tail it must
    /// absorb.
    fn settle(&self) {
        let pause = self.config.tuning.settle_pause;
        if pause.is_zero() || self.session.dry_run() {
            return;
        }
        info!("waiting {:?} for in-flight writes to land", pause);
        thread::sleep(pause);
    }
}
