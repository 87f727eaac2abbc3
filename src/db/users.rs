//! Users collection operations
//!
//! Users carry a per-account bcrypt hash; the hash never leaves this layer
//! except for verification inside the auth service.

use bson::doc;
use bson::oid::ObjectId;
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::{DbError, DbResult};

/// A user document as stored in the `users` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub favourite_genre: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub favourite_genre: String,
    pub password_hash: String,
}

/// Users repository
pub struct UsersRepository {
    collection: Collection<UserRecord>,
}

impl UsersRepository {
    pub fn new(collection: Collection<UserRecord>) -> Self {
        Self { collection }
    }

    /// Look up a user by username
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<UserRecord>> {
        Ok(self
            .collection
            .find_one(doc! { "username": username })
            .await?)
    }

    /// Look up a user by id
    pub async fn get_by_id(&self, id: ObjectId) -> DbResult<Option<UserRecord>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Insert a new user. The unique index on `username` rejects duplicates.
    pub async fn create(&self, input: CreateUser) -> DbResult<UserRecord> {
        validate_username(&input.username)?;

        let record = UserRecord {
            id: ObjectId::new(),
            username: input.username,
            favourite_genre: input.favourite_genre,
            password_hash: input.password_hash,
        };

        self.collection
            .insert_one(&record)
            .await
            .map_err(|e| DbError::from_write(e, "username"))?;

        Ok(record)
    }
}

fn validate_username(username: &str) -> DbResult<()> {
    if username.trim().len() < 3 {
        return Err(DbError::Validation(
            "username must be at least 3 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_length() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("ada").is_ok());
    }
}
