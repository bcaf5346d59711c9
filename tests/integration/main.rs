//! Integration tests using WireMock
//!
//! These tests drive the user-pool protocol and the backend API clients over
//! real HTTP against a mock server, and the file store across manager
//! instances.

mod api;
mod cognito;
mod common;
mod lifecycle;
