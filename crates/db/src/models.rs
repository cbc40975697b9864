//! Row structs that map onto the `users` and `orders` tables and the
//! per-user totals aggregate.
//!
//! These are *persistence* models and carry no behaviour.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// users
// ---------------------------------------------------------------------------

/// A persisted user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    /// The column has a `CHECK (age >= 0)` but no `NOT NULL`.
    pub age: Option<i32>,
}

// ---------------------------------------------------------------------------
// orders
// ---------------------------------------------------------------------------

/// An order as returned by [`crate::Repository::user_orders`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderRow {
    pub id: i32,
    pub amount: Decimal,
    pub created_at: Option<NaiveDateTime>,
}

// ---------------------------------------------------------------------------
// aggregates
// ---------------------------------------------------------------------------

/// Sum of a user's order amounts; zero when the user has no orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserTotalRow {
    pub name: String,
    pub total_amount: Decimal,
}
