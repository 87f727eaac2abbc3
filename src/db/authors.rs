//! Authors collection operations

use std::future::Future;

use bson::doc;
use bson::oid::ObjectId;
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};

use super::{DbError, DbResult};

/// An author document as stored in the `authors` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub born: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CreateAuthor {
    pub name: String,
    pub born: Option<i32>,
}

/// Authors repository
pub struct AuthorsRepository {
    collection: Collection<AuthorRecord>,
}

impl AuthorsRepository {
    pub fn new(collection: Collection<AuthorRecord>) -> Self {
        Self { collection }
    }

    /// Total number of authors
    pub async fn count(&self) -> DbResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    /// List every author
    pub async fn list(&self) -> DbResult<Vec<AuthorRecord>> {
        Ok(self.collection.find(doc! {}).await?.try_collect().await?)
    }

    /// Look up an author by exact name
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<AuthorRecord>> {
        Ok(self.collection.find_one(doc! { "name": name }).await?)
    }

    /// Fetch a batch of authors by id
    pub async fn get_many(&self, ids: &[ObjectId]) -> DbResult<Vec<AuthorRecord>> {
        Ok(self
            .collection
            .find(doc! { "_id": { "$in": ids } })
            .await?
            .try_collect()
            .await?)
    }

    /// Insert a new author. The unique index on `name` rejects duplicates.
    pub async fn create(&self, input: CreateAuthor) -> DbResult<AuthorRecord> {
        validate_name(&input.name)?;

        let record = AuthorRecord {
            id: ObjectId::new(),
            name: input.name,
            born: input.born,
        };

        self.collection
            .insert_one(&record)
            .await
            .map_err(|e| DbError::from_write(e, "name"))?;

        Ok(record)
    }

    /// Fetch the author with the given name, creating it if absent.
    ///
    /// Two concurrent calls for the same new name race on the unique index;
    /// the loser re-fetches the winner's record instead of surfacing the
    /// duplicate-key error.
    pub async fn find_or_create(&self, name: &str) -> DbResult<AuthorRecord> {
        find_or_create_with(
            || self.get_by_name(name),
            || {
                self.create(CreateAuthor {
                    name: name.to_string(),
                    born: None,
                })
            },
        )
        .await
    }

    /// Set the birth year of the named author, returning the updated record.
    /// Returns `None` (and writes nothing) when no author matches.
    pub async fn set_born(&self, name: &str, born: i32) -> DbResult<Option<AuthorRecord>> {
        Ok(self
            .collection
            .find_one_and_update(doc! { "name": name }, doc! { "$set": { "born": born } })
            .return_document(ReturnDocument::After)
            .await?)
    }
}

/// Drive the lookup-then-create routine for a unique natural key.
///
/// A duplicate-key failure from `create` means a concurrent caller won the
/// race; the loser re-runs the lookup and adopts the winner's record. Every
/// other error passes through untouched.
async fn find_or_create_with<T, L, Fl, C, Fc>(lookup: L, create: C) -> DbResult<T>
where
    L: Fn() -> Fl,
    Fl: Future<Output = DbResult<Option<T>>>,
    C: FnOnce() -> Fc,
    Fc: Future<Output = DbResult<T>>,
{
    if let Some(existing) = lookup().await? {
        return Ok(existing);
    }

    match create().await {
        Ok(created) => Ok(created),
        Err(DbError::Duplicate { field }) => lookup().await?.ok_or(DbError::Duplicate { field }),
        Err(e) => Err(e),
    }
}

fn validate_name(name: &str) -> DbResult<()> {
    if name.trim().len() < 4 {
        return Err(DbError::Validation(
            "author name must be at least 4 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use assert_matches::assert_matches;

    use super::*;

    fn author(name: &str) -> AuthorRecord {
        AuthorRecord {
            id: ObjectId::new(),
            name: name.to_string(),
            born: None,
        }
    }

    #[tokio::test]
    async fn test_find_or_create_returns_existing_without_creating() {
        let existing = author("Umberto Eco");
        let created = Cell::new(false);

        let result = find_or_create_with(
            || {
                let found = existing.clone();
                async move { Ok(Some(found)) }
            },
            || {
                created.set(true);
                async move { Ok(author("Umberto Eco")) }
            },
        )
        .await
        .unwrap();

        assert_eq!(result.id, existing.id);
        assert!(!created.get());
    }

    #[tokio::test]
    async fn test_find_or_create_lost_race_resolves_to_existing_record() {
        let winner = author("Umberto Eco");
        let lookups = Cell::new(0);

        let result = find_or_create_with(
            || {
                let n = lookups.get();
                lookups.set(n + 1);
                let winner = winner.clone();
                // first lookup misses; the re-fetch after the duplicate-key
                // rejection finds the record the concurrent caller inserted
                async move { Ok(if n == 0 { None } else { Some(winner) }) }
            },
            || async { Err(DbError::Duplicate { field: "name" }) },
        )
        .await
        .unwrap();

        assert_eq!(result.id, winner.id);
        assert_eq!(result.name, winner.name);
        assert_eq!(lookups.get(), 2);
    }

    #[tokio::test]
    async fn test_find_or_create_propagates_other_errors() {
        let result: DbResult<AuthorRecord> = find_or_create_with(
            || async { Ok(None) },
            || async {
                Err(DbError::Validation(
                    "author name must be at least 4 characters".to_string(),
                ))
            },
        )
        .await;

        assert_matches!(result, Err(DbError::Validation(_)));
    }

    #[test]
    fn test_validate_name_rejects_short_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("Bo").is_err());
        assert!(validate_name("   a   ").is_err());
    }

    #[test]
    fn test_validate_name_accepts_real_names() {
        assert!(validate_name("Fyodor Dostoevsky").is_ok());
        assert!(validate_name("Bede").is_ok());
    }
}
