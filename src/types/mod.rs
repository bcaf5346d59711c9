//! Authentication Types
//!
//! Core type definitions for sessions, tokens, events and configuration.

pub mod config;
pub mod events;
pub mod session;
pub mod token;

pub use config::*;
pub use events::*;
pub use session::*;
pub use token::*;
