//! Session providers: unit-of-work scopes over a SQLite connection.
//!
//! # Responsibility
//! - Hand repositories a connection for the duration of one operation.
//! - Commit the unit of work on success and roll it back on error.
//!
//! # Invariants
//! - Errors raised inside a session are returned unchanged after rollback.
//! - Repositories never open or close connections themselves.
//! - A session opened on a connection that is already inside a transaction
//!   nests as a savepoint; only the outermost scope commits.

use crate::logging::sanitize_message;
use crate::repo::error::RepoResult;
use log::{debug, error, warn};
use rusqlite::{Connection, Transaction};

const SESSION_SAVEPOINT: &str = "entity_repo_session";
const MAX_LOG_ERROR_CHARS: usize = 512;

mod connect_fn;
mod manager;

pub use connect_fn::ConnectFn;
pub use manager::SessionManager;

/// Supplies sessions to repositories.
pub trait SessionProvider {
    /// Runs `work` inside one transaction on a provider-owned connection.
    fn with_session<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Connection) -> RepoResult<T>;
}

/// A caller-owned connection used directly as the session.
///
/// Inside a caller transaction the work runs in a savepoint, so several
/// repository calls can share one unit of work.
impl SessionProvider for Connection {
    fn with_session<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Connection) -> RepoResult<T>,
    {
        if !self.is_autocommit() {
            return run_in_savepoint(self, work);
        }
        let tx = self.unchecked_transaction()?;
        run_in_transaction(tx, "borrowed", work)
    }
}

impl<P: SessionProvider + ?Sized> SessionProvider for &P {
    fn with_session<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Connection) -> RepoResult<T>,
    {
        (**self).with_session(work)
    }
}

pub(crate) fn run_in_transaction<T, F>(tx: Transaction<'_>, provider: &str, work: F) -> RepoResult<T>
where
    F: FnOnce(&Connection) -> RepoResult<T>,
{
    debug!("event=session module=session status=start provider={provider}");
    match work(&tx) {
        Ok(value) => {
            tx.commit()?;
            debug!("event=session module=session status=ok provider={provider}");
            Ok(value)
        }
        Err(err) => {
            warn!(
                "event=session_rollback module=session status=error provider={provider} error_code={} error={}",
                err.code(),
                sanitize_message(&err.to_string(), MAX_LOG_ERROR_CHARS)
            );
            if let Err(rollback_err) = tx.rollback() {
                error!(
                    "event=session_rollback module=session status=error provider={provider} error_code=rollback_failed error={}",
                    sanitize_message(&rollback_err.to_string(), MAX_LOG_ERROR_CHARS)
                );
            }
            Err(err)
        }
    }
}

fn run_in_savepoint<T, F>(conn: &Connection, work: F) -> RepoResult<T>
where
    F: FnOnce(&Connection) -> RepoResult<T>,
{
    conn.execute_batch(&format!("SAVEPOINT {SESSION_SAVEPOINT};"))?;
    debug!("event=session module=session status=start provider=savepoint");
    match work(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE SAVEPOINT {SESSION_SAVEPOINT};"))?;
            debug!("event=session module=session status=ok provider=savepoint");
            Ok(value)
        }
        Err(err) => {
            warn!(
                "event=session_rollback module=session status=error provider=savepoint error_code={} error={}",
                err.code(),
                sanitize_message(&err.to_string(), MAX_LOG_ERROR_CHARS)
            );
            if let Err(rollback_err) = conn.execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {SESSION_SAVEPOINT}; RELEASE SAVEPOINT {SESSION_SAVEPOINT};"
            )) {
                error!(
                    "event=session_rollback module=session status=error provider=savepoint error_code=rollback_failed error={}",
                    sanitize_message(&rollback_err.to_string(), MAX_LOG_ERROR_CHARS)
                );
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SessionProvider;
    use crate::db::open_db_in_memory;
    use crate::repo::error::RepoError;

    fn count(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn borrowed_connection_commits_successful_work() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
            .unwrap();

        conn.with_session(|session| {
            session.execute("INSERT INTO t DEFAULT VALUES;", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn borrowed_connection_rolls_back_failed_work() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
            .unwrap();

        let err = (&conn)
            .with_session(|session| -> Result<(), RepoError> {
                session.execute("INSERT INTO t DEFAULT VALUES;", [])?;
                Err(RepoError::InvalidData("abort".to_string()))
            })
            .unwrap_err();

        assert!(matches!(err, RepoError::InvalidData(message) if message == "abort"));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn nested_session_rolls_back_only_its_own_work() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
            .unwrap();

        conn.with_session(|outer| {
            outer.execute("INSERT INTO t DEFAULT VALUES;", [])?;
            let nested = outer.with_session(|inner| -> Result<(), RepoError> {
                inner.execute("INSERT INTO t DEFAULT VALUES;", [])?;
                Err(RepoError::InvalidData("inner abort".to_string()))
            });
            assert!(nested.is_err());
            assert!(!outer.is_autocommit());
            Ok(())
        })
        .unwrap();

        assert_eq!(count(&conn), 1);
        assert!(conn.is_autocommit());
    }
}
