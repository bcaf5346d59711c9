//! Builders
//!
//! Fluent builder for authentication configuration.

pub mod config;

pub use config::{auth_config, AuthConfigBuilder};
