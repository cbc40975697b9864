//! Query functions — one function per database operation.
//!
//! Every function takes a `&mut PgConnection` (a plain connection or a
//! transaction deref'd to one) and returns a `Result<T, DbError>`.
//! Transaction boundaries belong to [`crate::Repository`], not to these.

pub mod users;
pub mod orders;
