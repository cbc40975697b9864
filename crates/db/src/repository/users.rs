//! `users` table queries.

use sqlx::PgConnection;

use crate::{
    DbError,
    models::{UserRow, UserTotalRow},
};

/// Insert a user and return its generated id.
pub async fn insert_user(conn: &mut PgConnection, name: &str, age: i32) -> Result<i32, DbError> {
    let id: i32 = sqlx::query_scalar("INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(age)
        .fetch_one(&mut *conn)
        .await?;

    Ok(id)
}

/// Return all users ordered by id.
pub async fn list_users(conn: &mut PgConnection) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>("SELECT id, name, age FROM users ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

/// Sum of order amounts per user, highest total first, ties by name.
///
/// The `LEFT JOIN` keeps users without orders; `COALESCE` turns their
/// `NULL` sum into `0`.
pub async fn user_totals(conn: &mut PgConnection) -> Result<Vec<UserTotalRow>, DbError> {
    let rows = sqlx::query_as::<_, UserTotalRow>(
        r#"
        SELECT
            u.name,
            COALESCE(SUM(o.amount), 0) AS total_amount
        FROM users u
        LEFT JOIN orders o ON u.id = o.user_id
        GROUP BY u.id, u.name
        ORDER BY total_amount DESC, u.name
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Delete a user by primary key. Orders go with it via `ON DELETE CASCADE`.
///
/// Returns `false` if no row matched.
pub async fn delete_user(conn: &mut PgConnection, id: i32) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every user. Returns the number of rows removed.
pub async fn delete_all_users(conn: &mut PgConnection) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM users").execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
