//! Database access: entity store, read-models and migrations

pub mod db;
pub mod migrations;
pub mod stats;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
