//! Database connection and collection repositories

pub mod authors;
pub mod books;
pub mod users;

use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, IndexModel};
use thiserror::Error;

pub use authors::{AuthorRecord, AuthorsRepository, CreateAuthor};
pub use books::{BookFilter, BookRecord, BooksRepository, CreateBook};
pub use users::{CreateUser, UserRecord, UsersRepository};

const AUTHORS: &str = "authors";
const BOOKS: &str = "books";
const USERS: &str = "users";

/// Persistence layer errors. Duplicate-key violations are separated out so
/// callers can turn a lost create race into a fetch, and validation failures
/// so resolvers can surface them as user errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{field} must be unique")]
    Duplicate { field: &'static str },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Classify a write error, mapping MongoDB duplicate-key failures
    /// (code 11000) on the named unique field.
    fn from_write(err: mongodb::error::Error, unique_field: &'static str) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000 => {
                DbError::Duplicate {
                    field: unique_field,
                }
            }
            _ => DbError::Driver(err),
        }
    }
}

/// Database wrapper providing collection access
#[derive(Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Create a client for the given connection string. The driver connects
    /// lazily; an unreachable server surfaces on the first operation, not here.
    pub async fn connect(uri: &str, database_name: &str) -> DbResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            db: client.database(database_name),
        })
    }

    /// Round-trip a ping to verify the server is reachable
    pub async fn ping(&self) -> DbResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Create the unique indexes the data model relies on:
    /// `authors.name` and `users.username`
    pub async fn ensure_indexes(&self) -> DbResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.db
            .collection::<AuthorRecord>(AUTHORS)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.db
            .collection::<UserRecord>(USERS)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "username": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        Ok(())
    }

    pub fn authors(&self) -> AuthorsRepository {
        AuthorsRepository::new(self.db.collection(AUTHORS))
    }

    pub fn books(&self) -> BooksRepository {
        BooksRepository::new(self.db.collection(BOOKS))
    }

    pub fn users(&self) -> UsersRepository {
        UsersRepository::new(self.db.collection(USERS))
    }
}
