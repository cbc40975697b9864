//! `orders` table queries.

use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::{DbError, models::OrderRow};

/// Insert an order for `user_id` and return its generated id.
///
/// `created_at` is filled by the column default.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: i32,
    amount: Decimal,
) -> Result<i32, DbError> {
    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO orders (user_id, amount)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// All orders of one user, oldest first.
///
/// Orders inserted in the same transaction share `NOW()`, so `id` breaks ties.
pub async fn list_orders_for_user(
    conn: &mut PgConnection,
    user_id: i32,
) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT id, amount, created_at
        FROM orders
        WHERE user_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Delete every order. Returns the number of rows removed.
pub async fn delete_all_orders(conn: &mut PgConnection) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM orders").execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
