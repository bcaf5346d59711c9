//! Core Components
//!
//! Core infrastructure: HTTP transport and identity token claims.

pub mod claims;
pub mod transport;

pub use claims::*;
pub use transport::*;
