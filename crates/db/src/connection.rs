//! The [`Repository`]: one Postgres connection and the typed operations
//! issued over it.

use std::future::Future;
use std::pin::Pin;

use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection, Postgres, Transaction};
use tracing::{debug, error, info, warn};

use crate::{
    DbConfig, DbError,
    models::{OrderRow, UserRow, UserTotalRow},
    repository::{orders, users},
    schema,
};

/// Future returned by the closure handed to [`scoped`].
pub type RepoFuture<'r, T> = Pin<Box<dyn Future<Output = Result<T, DbError>> + Send + 'r>>;

/// Owns at most one open connection.
///
/// Mutating operations each run inside their own transaction, committed on
/// success and rolled back on any error. Operations called while
/// disconnected fail with [`DbError::NotConnected`]; an operation that finds
/// the connection dead returns [`DbError::ConnectionLost`] and leaves the
/// repository disconnected.
pub struct Repository {
    config: DbConfig,
    conn: Option<PgConnection>,
}

impl Repository {
    /// Create a disconnected repository. Call [`Repository::connect`] or
    /// use [`scoped`] before issuing queries.
    pub fn new(config: DbConfig) -> Self {
        Self { config, conn: None }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the connection. A no-op when already connected.
    ///
    /// On failure the repository stays disconnected.
    pub async fn connect(&mut self) -> Result<(), DbError> {
        if self.conn.is_some() {
            debug!("Already connected, reusing the open connection");
            return Ok(());
        }

        info!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            user = %self.config.user,
            "Connecting to database"
        );

        match PgConnection::connect_with(&self.config.connect_options()).await {
            Ok(conn) => {
                self.conn = Some(conn);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to connect to database");
                Err(DbError::Connection(err))
            }
        }
    }

    /// Close the connection if one is open. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        match conn.close().await {
            Ok(()) => info!("Disconnected from database"),
            Err(err) => warn!(error = %err, "Connection did not close cleanly"),
        }
    }

    /// Create `users` and `orders` if absent, both in one transaction.
    pub async fn create_schema(&mut self) -> Result<(), DbError> {
        let result = async {
            let mut tx = self.begin("create_schema").await?;
            let result = schema::create_tables(&mut tx).await;
            finish(tx, "create_schema", result).await
        }
        .await;

        self.settle(result)?;
        info!("Schema is in place");
        Ok(())
    }

    /// Insert a user and return the generated id.
    pub async fn add_user(&mut self, name: &str, age: i32) -> Result<i32, DbError> {
        let result = async {
            let mut tx = self.begin("add_user").await?;
            let result = users::insert_user(&mut tx, name, age).await;
            finish(tx, "add_user", result).await
        }
        .await;

        self.settle(result)
    }

    /// Insert an order for an existing user and return the generated id.
    pub async fn add_order(&mut self, user_id: i32, amount: Decimal) -> Result<i32, DbError> {
        let result = async {
            let mut tx = self.begin("add_order").await?;
            let result = orders::insert_order(&mut tx, user_id, amount).await;
            finish(tx, "add_order", result).await
        }
        .await;

        self.settle(result)
    }

    /// Per-user order totals, every user included, highest total first.
    pub async fn user_totals(&mut self) -> Result<Vec<UserTotalRow>, DbError> {
        let result = match self.conn() {
            Ok(conn) => users::user_totals(conn).await,
            Err(err) => Err(err),
        };
        self.settle(logged("user_totals", result))
    }

    /// All users ordered by id.
    pub async fn list_users(&mut self) -> Result<Vec<UserRow>, DbError> {
        let result = match self.conn() {
            Ok(conn) => users::list_users(conn).await,
            Err(err) => Err(err),
        };
        self.settle(logged("list_users", result))
    }

    /// All orders of `user_id`, oldest first. Unknown users yield an empty list.
    pub async fn user_orders(&mut self, user_id: i32) -> Result<Vec<OrderRow>, DbError> {
        let result = match self.conn() {
            Ok(conn) => orders::list_orders_for_user(conn, user_id).await,
            Err(err) => Err(err),
        };
        self.settle(logged("user_orders", result))
    }

    /// Delete a user and, through the cascade, their orders.
    ///
    /// Returns `Ok(false)` when no user had that id.
    pub async fn delete_user(&mut self, user_id: i32) -> Result<bool, DbError> {
        let result = async {
            let mut tx = self.begin("delete_user").await?;
            let result = users::delete_user(&mut tx, user_id).await;
            finish(tx, "delete_user", result).await
        }
        .await;

        let deleted = self.settle(result)?;
        if !deleted {
            debug!(user_id, "No user to delete");
        }
        Ok(deleted)
    }

    /// Delete all orders, then all users, in one transaction.
    pub async fn clear_all(&mut self) -> Result<(), DbError> {
        let result = async {
            let mut tx = self.begin("clear_all").await?;
            let result = async {
                let orders_removed = orders::delete_all_orders(&mut tx).await?;
                let users_removed = users::delete_all_users(&mut tx).await?;
                Ok::<_, DbError>((orders_removed, users_removed))
            }
            .await;
            finish(tx, "clear_all", result).await
        }
        .await;

        let (orders_removed, users_removed) = self.settle(result)?;
        info!(orders_removed, users_removed, "Cleared all tables");
        Ok(())
    }

    /// Server process id of the open session, as `pg_backend_pid()` reports it.
    pub async fn backend_pid(&mut self) -> Result<i32, DbError> {
        let result = match self.conn() {
            Ok(conn) => sqlx::query_scalar::<_, i32>("SELECT pg_backend_pid()")
                .fetch_one(&mut *conn)
                .await
                .map_err(DbError::from),
            Err(err) => Err(err),
        };
        self.settle(logged("backend_pid", result))
    }

    /// Drop a dead connection handle so `is_connected` reports the truth and
    /// a later `connect` opens a fresh session.
    fn settle<T>(&mut self, result: Result<T, DbError>) -> Result<T, DbError> {
        if matches!(result, Err(DbError::ConnectionLost(_))) && self.conn.take().is_some() {
            warn!("Connection lost, repository is now disconnected");
        }
        result
    }

    fn conn(&mut self) -> Result<&mut PgConnection, DbError> {
        self.conn.as_mut().ok_or(DbError::NotConnected)
    }

    async fn begin(&mut self, operation: &'static str) -> Result<Transaction<'_, Postgres>, DbError> {
        let result = match self.conn() {
            Ok(conn) => conn.begin().await.map_err(DbError::from),
            Err(err) => Err(err),
        };
        logged(operation, result)
    }
}

impl Drop for Repository {
    fn drop(&mut self) {
        // Dropping the socket is all we can do without an async context.
        if self.conn.take().is_some() {
            debug!("Repository dropped while connected, connection released");
        }
    }
}

/// Commit on `Ok`, roll back on `Err`, logging failures either way.
async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    operation: &'static str,
    result: Result<T, DbError>,
) -> Result<T, DbError> {
    match result {
        Ok(value) => {
            let committed = tx.commit().await.map_err(DbError::from);
            logged(operation, committed)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(operation, error = %rollback_err, "Rollback failed");
            }
            logged(operation, Err(err))
        }
    }
}

fn logged<T>(operation: &'static str, result: Result<T, DbError>) -> Result<T, DbError> {
    if let Err(err) = &result {
        error!(operation, error = %err, "Database operation failed");
    }
    result
}

/// Connect, run `f`, and disconnect on every exit path.
///
/// If connecting fails `f` is never called and the connection error is
/// returned. Otherwise the result of `f` is returned after the connection
/// has been closed.
///
/// ```rust,ignore
/// let users = db::scoped(DbConfig::from_env()?, |repo| {
///     Box::pin(async move { repo.list_users().await })
/// })
/// .await?;
/// ```
pub async fn scoped<T, F>(config: DbConfig, f: F) -> Result<T, DbError>
where
    F: for<'r> FnOnce(&'r mut Repository) -> RepoFuture<'r, T>,
{
    let mut repo = Repository::new(config);
    repo.connect().await?;

    let result = f(&mut repo).await;
    repo.disconnect().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nothing listens on port 1, so connecting fails fast.
    fn unreachable_config() -> DbConfig {
        DbConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ..DbConfig::default()
        }
    }

    #[tokio::test]
    async fn new_repository_starts_disconnected() {
        let repo = Repository::new(DbConfig::default());
        assert!(!repo.is_connected());
        assert_eq!(repo.config(), &DbConfig::default());
    }

    #[tokio::test]
    async fn operations_without_a_connection_report_not_connected() {
        let mut repo = Repository::new(DbConfig::default());

        assert!(matches!(repo.create_schema().await, Err(DbError::NotConnected)));
        assert!(matches!(repo.add_user("Alice", 30).await, Err(DbError::NotConnected)));
        assert!(matches!(
            repo.add_order(1, Decimal::new(5000, 2)).await,
            Err(DbError::NotConnected)
        ));
        assert!(matches!(repo.user_totals().await, Err(DbError::NotConnected)));
        assert!(matches!(repo.list_users().await, Err(DbError::NotConnected)));
        assert!(matches!(repo.user_orders(1).await, Err(DbError::NotConnected)));
        assert!(matches!(repo.delete_user(1).await, Err(DbError::NotConnected)));
        assert!(matches!(repo.clear_all().await, Err(DbError::NotConnected)));
        assert!(matches!(repo.backend_pid().await, Err(DbError::NotConnected)));
    }

    #[tokio::test]
    async fn lost_connection_errors_pass_through_settle() {
        let mut repo = Repository::new(DbConfig::default());
        let lost = DbError::from(sqlx::Error::Protocol("closed".into()));

        assert!(repo.settle::<()>(Err(lost)).unwrap_err().is_connection_lost());
        assert!(!repo.is_connected());
        assert_eq!(repo.settle(Ok(7)).unwrap(), 7);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let mut repo = Repository::new(DbConfig::default());
        repo.disconnect().await;
        repo.disconnect().await;
        assert!(!repo.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_leaves_repository_disconnected() {
        let mut repo = Repository::new(unreachable_config());

        let err = repo.connect().await.unwrap_err();
        assert!(matches!(err, DbError::Connection(_)));
        assert!(!repo.is_connected());
        assert!(matches!(repo.list_users().await, Err(DbError::NotConnected)));
    }

    #[tokio::test]
    async fn scoped_skips_the_body_when_connect_fails() {
        let mut ran = false;
        let result = scoped(unreachable_config(), |_repo| {
            ran = true;
            Box::pin(async { Ok::<_, DbError>(()) })
        })
        .await;

        assert!(matches!(result, Err(DbError::Connection(_))));
        assert!(!ran);
    }
}
