//! `db` crate: pure persistence layer.
//!
//! Provides a connection pool, typed row structs, repository functions for
//! the automation tables, and the cipher that keeps webhook secrets
//! encrypted at rest.  No business logic lives here.

pub mod crypto;
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;

pub use crypto::SecretCipher;
pub use error::DbError;
pub use pool::{create_pool, run_migrations, DbPool};
