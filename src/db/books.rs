//! Books collection operations

use bson::oid::ObjectId;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::{DbError, DbResult};

/// A book document as stored in the `books` collection.
/// `author` references a document in the `authors` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub published: i32,
    pub author: ObjectId,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    pub published: i32,
    pub author: ObjectId,
    pub genres: Vec<String>,
}

/// Filter for listing books. Both criteria compose conjunctively.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Restrict to books referencing this author id
    pub author: Option<ObjectId>,
    /// Restrict to books whose genre list contains this value
    pub genre: Option<String>,
}

impl BookFilter {
    /// Translate into a MongoDB filter document. Matching a scalar against
    /// the `genres` array field is the server's containment test.
    pub fn into_document(self) -> Document {
        let mut filter = doc! {};
        if let Some(genre) = self.genre {
            filter.insert("genres", genre);
        }
        if let Some(author) = self.author {
            filter.insert("author", author);
        }
        filter
    }
}

/// Books repository
pub struct BooksRepository {
    collection: Collection<BookRecord>,
}

impl BooksRepository {
    pub fn new(collection: Collection<BookRecord>) -> Self {
        Self { collection }
    }

    /// Total number of books
    pub async fn count(&self) -> DbResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    /// Number of books referencing the given author
    pub async fn count_by_author(&self, author: ObjectId) -> DbResult<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "author": author })
            .await?)
    }

    /// List books matching the filter
    pub async fn list(&self, filter: BookFilter) -> DbResult<Vec<BookRecord>> {
        Ok(self
            .collection
            .find(filter.into_document())
            .await?
            .try_collect()
            .await?)
    }

    /// Insert a new book
    pub async fn create(&self, input: CreateBook) -> DbResult<BookRecord> {
        validate_title(&input.title)?;

        let record = BookRecord {
            id: ObjectId::new(),
            title: input.title,
            published: input.published,
            author: input.author,
            genres: input.genres,
        };

        self.collection
            .insert_one(&record)
            .await
            .map_err(|e| DbError::from_write(e, "title"))?;

        Ok(record)
    }
}

fn validate_title(title: &str) -> DbResult<()> {
    if title.trim().len() < 5 {
        return Err(DbError::Validation(
            "book title must be at least 5 characters".to_string(),
        ));
    }
    Ok(())
}
