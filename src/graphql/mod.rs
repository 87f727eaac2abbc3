//! GraphQL API
//!
//! This is the single API surface for the Bibliotheca backend: a handful of
//! queries and mutations over books, authors, and users, served at /graphql.

pub mod auth;
pub mod helpers;
mod schema;
pub mod types;

pub use auth::CurrentUser;
pub use schema::{BibliothecaSchema, build_schema};
