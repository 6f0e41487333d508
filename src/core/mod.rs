// Public modules
pub mod classify;
pub mod config;
pub mod error;
pub mod log;
pub mod mapping;
pub mod migrate;
pub mod rewrite;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
