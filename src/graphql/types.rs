//! GraphQL object types and conversions from database records

use async_graphql::{ComplexObject, Context, ID, Result, SimpleObject};
use bson::oid::ObjectId;

use crate::db::{AuthorRecord, BookRecord, Database, UserRecord};

use super::helpers::clamp_count;

/// An author in the catalogue. `bookCount` is derived at read time from the
/// books collection, never stored.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct Author {
    pub id: ID,
    pub name: String,
    pub born: Option<i32>,

    #[graphql(skip)]
    pub record_id: ObjectId,
}

#[ComplexObject]
impl Author {
    /// Number of books referencing this author
    async fn book_count(&self, ctx: &Context<'_>) -> Result<i32> {
        let db = ctx.data_unchecked::<Database>();
        let count = db
            .books()
            .count_by_author(self.record_id)
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;
        Ok(clamp_count(count))
    }
}

impl Author {
    pub fn from_record(record: AuthorRecord) -> Self {
        Self {
            id: ID(record.id.to_hex()),
            name: record.name,
            born: record.born,
            record_id: record.id,
        }
    }
}

/// A book with its author joined in
#[derive(Debug, Clone, SimpleObject)]
pub struct Book {
    pub id: ID,
    pub title: String,
    pub published: i32,
    pub author: Author,
    pub genres: Vec<String>,
}

impl Book {
    pub fn from_records(book: BookRecord, author: AuthorRecord) -> Self {
        Self {
            id: ID(book.id.to_hex()),
            title: book.title,
            published: book.published,
            author: Author::from_record(author),
            genres: book.genres,
        }
    }
}

/// A registered user. The stored credential hash is never exposed.
#[derive(Debug, Clone, SimpleObject)]
pub struct User {
    pub id: ID,
    pub username: String,
    pub favourite_genre: String,
}

impl User {
    pub fn from_record(record: UserRecord) -> Self {
        Self {
            id: ID(record.id.to_hex()),
            username: record.username,
            favourite_genre: record.favourite_genre,
        }
    }
}

/// A signed bearer token issued by `login`
#[derive(Debug, Clone, SimpleObject)]
pub struct Token {
    pub value: String,
}
