//! Shared helpers: logging setup, path formatting, XML text splicing

pub mod logging;
pub mod paths;
pub mod xml;

pub use logging::{init_logging, LoggingConfig};
