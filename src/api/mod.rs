//! Backend APIs
//!
//! Authenticated clients for the dashboard's Jobs and Credits services.

pub mod client;
pub mod credits;
pub mod format;
pub mod jobs;

pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use credits::{CreditOperation, CreditsApi};
pub use format::{format_bytes, format_duration};
pub use jobs::{JobsApi, DEFAULT_JOB_LIMIT};
