//! Session provider backed by a caller-supplied connect function.

use super::{run_in_transaction, SessionProvider};
use crate::db::DbResult;
use crate::repo::error::RepoResult;
use rusqlite::Connection;

/// Opens a fresh connection for every session through `connect`.
///
/// The connection is dropped when the session ends, so this provider only
/// makes sense for file-backed databases.
pub struct ConnectFn<F> {
    connect: F,
}

impl<F> ConnectFn<F>
where
    F: Fn() -> DbResult<Connection>,
{
    pub fn new(connect: F) -> Self {
        Self { connect }
    }
}

impl<F> SessionProvider for ConnectFn<F>
where
    F: Fn() -> DbResult<Connection>,
{
    fn with_session<T, W>(&self, work: W) -> RepoResult<T>
    where
        W: FnOnce(&Connection) -> RepoResult<T>,
    {
        let mut conn = (self.connect)()?;
        let tx = conn.transaction()?;
        run_in_transaction(tx, "connect_fn", work)
    }
}
