//! Dispatcher schema and handler dependencies

pub mod schema;
pub mod types;

pub use schema::schema;
pub use types::{ensure_user_exists, HandlerDeps, HandlerError, UserCreationResult, UserInfo};
