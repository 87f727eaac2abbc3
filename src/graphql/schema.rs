//! GraphQL schema definition with queries and mutations
//!
//! Resolvers read and write the persistence layer directly; every request
//! hits storage, there is no cross-request cache.

use std::collections::{HashMap, HashSet};

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, Object, Result, Schema, value,
};
use bson::oid::ObjectId;

use crate::db::{
    AuthorRecord, BookFilter, BookRecord, CreateBook, CreateUser, Database, DbError,
};
use crate::services::{AuthError, AuthService};

use super::auth::AuthExt;
use super::helpers::{bad_user_input, clamp_count};
use super::types::{Author, Book, Token, User};

/// The GraphQL schema type
pub type BibliothecaSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema with all resolvers
pub fn build_schema(db: Database, auth: AuthService) -> BibliothecaSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .finish()
}

fn internal(e: impl std::fmt::Display) -> async_graphql::Error {
    async_graphql::Error::new(e.to_string())
}

/// Narrow a book filter to the result of an author-name lookup. `None` means
/// the requested author does not exist: the caller answers with an empty
/// list, never an error.
fn narrow_to_author(filter: BookFilter, matched: Option<AuthorRecord>) -> Option<BookFilter> {
    matched.map(|author| BookFilter {
        author: Some(author.id),
        ..filter
    })
}

/// Join each book with its author record, the document-database equivalent
/// of populate. Books referencing a missing author are skipped with a warning.
async fn join_authors(db: &Database, records: Vec<BookRecord>) -> Result<Vec<Book>> {
    let ids: Vec<ObjectId> = records
        .iter()
        .map(|b| b.author)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<ObjectId, AuthorRecord> = db
        .authors()
        .get_many(&ids)
        .await
        .map_err(internal)?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let mut books = Vec::with_capacity(records.len());
    for record in records {
        let Some(author) = authors.get(&record.author) else {
            tracing::warn!(book_id = %record.id, "book references a missing author, skipping");
            continue;
        };
        books.push(Book::from_records(record, author.clone()));
    }
    Ok(books)
}

// ============================================================================
// Query Root
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Total number of books in the catalogue
    async fn book_count(&self, ctx: &Context<'_>) -> Result<i32> {
        let db = ctx.data_unchecked::<Database>();
        let count = db.books().count().await.map_err(internal)?;
        Ok(clamp_count(count))
    }

    /// Total number of authors
    async fn author_count(&self, ctx: &Context<'_>) -> Result<i32> {
        let db = ctx.data_unchecked::<Database>();
        let count = db.authors().count().await.map_err(internal)?;
        Ok(clamp_count(count))
    }

    /// All books, optionally narrowed by author name and/or genre.
    /// An unknown author name yields an empty list, not an error.
    async fn all_books(
        &self,
        ctx: &Context<'_>,
        author: Option<String>,
        genre: Option<String>,
    ) -> Result<Vec<Book>> {
        let db = ctx.data_unchecked::<Database>();

        let mut filter = BookFilter {
            genre,
            ..Default::default()
        };
        if let Some(name) = author {
            let matched = db.authors().get_by_name(&name).await.map_err(internal)?;
            filter = match narrow_to_author(filter, matched) {
                Some(f) => f,
                None => return Ok(vec![]),
            };
        }

        let records = db.books().list(filter).await.map_err(internal)?;
        join_authors(db, records).await
    }

    /// Every author. The derived `bookCount` field counts books per author
    /// at resolution time.
    async fn all_authors(&self, ctx: &Context<'_>) -> Result<Vec<Author>> {
        let db = ctx.data_unchecked::<Database>();
        let records = db.authors().list().await.map_err(internal)?;
        Ok(records.into_iter().map(Author::from_record).collect())
    }

    /// The current authenticated user, or null when unauthenticated
    async fn me(&self, ctx: &Context<'_>) -> Option<User> {
        ctx.current_user().cloned().map(User::from_record)
    }

    /// Health check (no auth required)
    async fn health(&self) -> bool {
        true
    }

    /// Server version
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

// ============================================================================
// Mutation Root
// ============================================================================

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Add a book. A previously-unseen author name creates the author first;
    /// the new book always references an existing author record.
    async fn add_book(
        &self,
        ctx: &Context<'_>,
        title: String,
        published: i32,
        author: String,
        genres: Vec<String>,
    ) -> Result<Book> {
        let db = ctx.data_unchecked::<Database>();

        let author_record = db
            .authors()
            .find_or_create(&author)
            .await
            .map_err(|e| match e {
                DbError::Validation(msg) => bad_user_input(format!("saving book failed: {msg}"))
                    .extend_with(|_, ext| ext.set("invalidArgs", value!({ "author": author.clone() }))),
                other => internal(other),
            })?;

        let record = db
            .books()
            .create(CreateBook {
                title: title.clone(),
                published,
                author: author_record.id,
                genres: genres.clone(),
            })
            .await
            .map_err(|e| match e {
                DbError::Validation(msg) => bad_user_input(format!("saving book failed: {msg}"))
                    .extend_with(|_, ext| {
                        ext.set(
                            "invalidArgs",
                            value!({
                                "title": title.clone(),
                                "published": published,
                                "author": author.clone(),
                                "genres": genres.clone(),
                            }),
                        )
                    }),
                other => internal(other),
            })?;

        Ok(Book::from_records(record, author_record))
    }

    /// Set an author's birth year. Returns null (and writes nothing)
    /// when no author matches the name.
    async fn edit_author(
        &self,
        ctx: &Context<'_>,
        name: String,
        set_born_to: i32,
    ) -> Result<Option<Author>> {
        let db = ctx.data_unchecked::<Database>();
        let updated = db
            .authors()
            .set_born(&name, set_born_to)
            .await
            .map_err(internal)?;
        Ok(updated.map(Author::from_record))
    }

    /// Create a user with a per-account credential
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        favourite_genre: String,
        password: String,
    ) -> Result<User> {
        let db = ctx.data_unchecked::<Database>();
        let auth = ctx.data_unchecked::<AuthService>();

        let password_hash = auth.hash_password(&password).map_err(internal)?;

        let record = db
            .users()
            .create(CreateUser {
                username: username.clone(),
                favourite_genre,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                DbError::Duplicate { .. } => bad_user_input("username must be unique")
                    .extend_with(|_, ext| ext.set("invalidArgs", value!({ "username": username.clone() }))),
                DbError::Validation(msg) => bad_user_input(format!("creating user failed: {msg}"))
                    .extend_with(|_, ext| ext.set("invalidArgs", value!({ "username": username.clone() }))),
                other => internal(other),
            })?;

        Ok(User::from_record(record))
    }

    /// Log in, returning a signed bearer token
    async fn login(&self, ctx: &Context<'_>, username: String, password: String) -> Result<Token> {
        let auth = ctx.data_unchecked::<AuthService>();

        let value = auth.login(&username, &password).await.map_err(|e| match e {
            AuthError::InvalidCredentials => bad_user_input("wrong credentials"),
            other => internal(other),
        })?;

        Ok(Token { value })
    }
}
