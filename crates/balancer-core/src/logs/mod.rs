//! Structured, color-formatted logging setup.

pub mod logger;

pub use logger::configure_logger;
