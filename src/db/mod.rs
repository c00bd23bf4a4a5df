//! Database layer
//!
//! SQLite storage for users, sessions, categories, locations, posts and
//! comments.
//!
//! # Usage
//!
//! ```ignore
//! use blogicum::config::DatabaseConfig;
//! use blogicum::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pool::{create_pool, create_test_pool, ping, DbPool};
