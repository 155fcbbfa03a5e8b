//! Utility modules for shipwright.

pub mod logging;

// Re-export commonly used items
pub use logging::{init_default, init_logging, parse_level, LoggingConfig};
