//! Generic utility primitives with zero domain knowledge.
//!
//! - `io` - File I/O with consistent error handling
//! - `text` - Line text helpers

pub mod io;
pub mod text;
