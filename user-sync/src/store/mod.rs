//! User record storage.
//!
//! Records are keyed by the Clerk user id (`clerk_id`). Every lookup, update
//! and delete filters on that column, never on the internal row id.

pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use sqlite::SqliteUserStore;

/// Local copy of an identity provider user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub clerk_id: String,
    pub email: String,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal: {0}")]
    Internal(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new record. A second insert for the same `clerk_id` is a
    /// [`StoreError::Conflict`].
    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError>;

    /// Overwrite every field of the record matching `user.clerk_id`.
    /// Returns `false` when no such record exists.
    async fn update_user(&self, user: &UserRecord) -> Result<bool, StoreError>;

    /// Remove the record for `clerk_id`. Returns `false` when none existed.
    async fn delete_user(&self, clerk_id: &str) -> Result<bool, StoreError>;

    async fn find_user(&self, clerk_id: &str) -> Result<Option<UserRecord>, StoreError>;
}
