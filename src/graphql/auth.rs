//! GraphQL authentication context
//!
//! The HTTP layer verifies the bearer token, looks up the user, and attaches
//! a `CurrentUser` to the request data before any resolver runs. Resolvers
//! read it through `AuthExt`.

use async_graphql::Context;

use crate::db::UserRecord;

/// Authenticated user attached to the per-request context
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

/// Extension trait to read the authenticated user from the GraphQL context
pub trait AuthExt {
    /// The current user, or `None` when the request is unauthenticated
    fn current_user(&self) -> Option<&UserRecord>;
}

impl AuthExt for Context<'_> {
    fn current_user(&self) -> Option<&UserRecord> {
        self.data_opt::<CurrentUser>().map(|u| &u.0)
    }
}
