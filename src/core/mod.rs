//! Core utilities: configuration, errors, logging, shared domain types

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::AdminIds;
pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use types::{LectureCategory, ProjectStatus};
