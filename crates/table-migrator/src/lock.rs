//! Table lock coordination.
//!
//! Lock release and autocommit restoration run on every exit path; a failure
//! inside the body reaches the caller only after cleanup completes.

use tracing::info;

use crate::connection::Connection;
use crate::error::Error;
use crate::session::Session;
use crate::table::quote_ident;

/// Run `body` while holding an explicit write lock on `tables`.
///
/// Disables autocommit, locks the named tables, runs the body, then commits
/// and releases the lock. On a body failure the lock is still released and
/// autocommit restored before the error propagates.
pub fn with_write_lock<C, T, F>(
    session: &mut Session<C>,
    tables: &[&str],
    body: F,
) -> Result<T, Error>
where
    C: Connection,
    F: FnOnce(&mut Session<C>) -> Result<T, Error>,
{
    info!("acquiring write lock on: {}", tables.join(", "));
    session.execute("SET autocommit=0")?;

    let locks = tables
        .iter()
        .map(|t| format!("{} WRITE", quote_ident(t)))
        .collect::<Vec<_>>()
        .join(", ");

    let result = match session.execute(&format!("LOCK TABLES {}", locks)) {
        Ok(_) => body(session),
        Err(e) => Err(e),
    };

    let release = if result.is_ok() {
        session
            .execute("COMMIT")
            .and_then(|_| session.execute("UNLOCK TABLES"))
            .map(|_| ())
    } else {
        session.execute("UNLOCK TABLES").map(|_| ())
    };
    let restore = session.execute("SET autocommit=1").map(|_| ());

    let value = result?;
    release?;
    restore?;
    Ok(value)
}

/// Run `body` under a server-wide flush-and-read lock.
///
/// Reserved for coordinating multiple engines; the primary copy algorithms do
/// not use it.
pub fn with_global_read_lock<C, T, F>(session: &mut Session<C>, body: F) -> Result<T, Error>
where
    C: Connection,
    F: FnOnce(&mut Session<C>) -> Result<T, Error>,
{
    info!("acquiring global read lock");
    session.execute("FLUSH TABLES WITH READ LOCK")?;
    let result = body(session);
    let release = session.execute("UNLOCK TABLES").map(|_| ());

    let value = result?;
    release?;
    Ok(value)
}
