//! Admin gating.
//!
//! Membership in this list only decides which dashboard views are shown.
//! The backend enforces authorization on every request independently.

use crate::types::Session;

/// Subject identifiers with access to the admin views.
pub const ADMIN_SUBJECT_IDS: [&str; 3] = [
    "f4c8e4a8-3081-70cd-43f9-ea8a7b407430",
    "04d8c4d8-20f1-7000-5cf5-90247ec54b3a",
    "44088418-f0d1-7016-37c9-3bbf83358bb6",
];

/// Check a session against the built-in allow-list.
pub fn is_admin(session: &Session) -> bool {
    ADMIN_SUBJECT_IDS.contains(&session.subject_id.as_str())
}

/// Check a session against a configured allow-list.
pub fn is_admin_in(session: &Session, allow_list: &[String]) -> bool {
    allow_list.iter().any(|id| id == &session.subject_id)
}
