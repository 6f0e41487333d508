/// Macro for prefixed status lines on stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("run", "Migrating {} files under {}", count, root);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `nsmigrate::mapping` instead of `nsmigrate::core::mapping`
pub use core::*;
pub use utils::*;
