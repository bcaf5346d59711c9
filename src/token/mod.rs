//! Token Management
//!
//! Session lifecycle and persistence.
//!
//! This module provides:
//!
//! - **Session Storage**: Persistent key-value stores for session material
//! - **Lifecycle Manager**: Sign-in, sign-out and single-flight refresh
//! - **Admin gating**: Allow-list checks for the admin views

pub mod admin;
pub mod file_storage;
pub mod manager;
pub mod storage;

// Session Storage
pub use file_storage::FileSessionStore;
pub use storage::{
    create_in_memory_session_store, create_mock_session_store, InMemorySessionStore,
    MockSessionStore, SessionStore,
};

// Lifecycle Manager
pub use manager::{
    create_mock_authenticator, Authenticator, MockAuthenticator, TokenLifecycleManager,
};

// Admin gating
pub use admin::{is_admin, is_admin_in, ADMIN_SUBJECT_IDS};
