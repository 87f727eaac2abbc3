//! GraphQL helper functions

use async_graphql::{Error, ErrorExtensions};

/// Build a user-facing error carrying the `BAD_USER_INPUT` extension code.
///
/// This is the single surfaced error kind of the API: create-validation
/// failures, uniqueness violations, and failed logins all use it.
pub fn bad_user_input(message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", "BAD_USER_INPUT"))
}

/// Convert a collection count into the GraphQL `Int` range, saturating at
/// `i32::MAX` rather than truncating.
pub fn clamp_count(count: u64) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}
