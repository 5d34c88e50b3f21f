//! # Runtime Container
//!
//! Configuration and the assembled runtime services.

pub mod config;

pub use config::{ConfigError, RuntimeConfig};
