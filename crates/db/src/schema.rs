//! Table definitions for the `users` / `orders` schema.

use sqlx::PgConnection;
use tracing::debug;

use crate::DbError;

pub const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id   SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        age  INTEGER CHECK (age >= 0)
    )
"#;

pub const CREATE_ORDERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS orders (
        id         SERIAL PRIMARY KEY,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        amount     NUMERIC(10,2) NOT NULL CHECK (amount >= 0),
        created_at TIMESTAMP DEFAULT NOW()
    )
"#;

/// Create both tables if they are missing. `users` must exist before
/// `orders` because of the foreign key.
///
/// The caller owns the surrounding transaction.
pub async fn create_tables(conn: &mut PgConnection) -> Result<(), DbError> {
    debug!("Creating table users");
    sqlx::query(CREATE_USERS_TABLE).execute(&mut *conn).await?;

    debug!("Creating table orders");
    sqlx::query(CREATE_ORDERS_TABLE).execute(&mut *conn).await?;

    Ok(())
}
