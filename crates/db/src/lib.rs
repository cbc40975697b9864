//! `db` crate — data access for the `users` / `orders` schema.
//!
//! Provides connection settings, a typed error taxonomy, row structs, and a
//! [`Repository`] that owns a single Postgres connection and exposes the
//! CRUD and aggregate operations over it. No pooling, no retries.

pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod repository;
pub mod schema;

pub use config::DbConfig;
pub use connection::{scoped, RepoFuture, Repository};
pub use error::{ConfigError, ConstraintKind, DbError};
pub use models::{OrderRow, UserRow, UserTotalRow};
pub use rust_decimal::Decimal;
