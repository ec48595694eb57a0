//! Repository functions: one function per database operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`.
//! No business logic and no domain types, only SQL.  Queries are plain
//! runtime `sqlx::query_as` calls.

pub mod logs;
pub mod rules;
pub mod webhooks;
