//! SQLite-backed user store.
//!
//! The pool is opened on first use rather than at startup, and shared by
//! every request after that. Opening it also creates the `users` table.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{StoreError, UserRecord, UserStore};

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        clerk_id TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        name TEXT NOT NULL,
        image TEXT NOT NULL
    )
"#;

/// Lazily connected SQLite user store.
///
/// Cheap to clone; clones share one pool.
#[derive(Clone)]
pub struct SqliteUserStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    url: String,
    max_connections: u32,
    pool: RwLock<Option<SqlitePool>>,
}

impl SqliteUserStore {
    /// Create a store for `url`. No connection is made until the first query.
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                url: url.into(),
                max_connections: max_connections.max(1),
                pool: RwLock::new(None),
            }),
        }
    }

    /// Return the shared pool, opening it and creating the schema on first use.
    async fn pool(&self) -> Result<SqlitePool, StoreError> {
        {
            let pool = self.inner.pool.read().await;
            if let Some(p) = pool.as_ref() {
                return Ok(p.clone());
            }
        }

        let mut pool = self.inner.pool.write().await;

        // Double-check after acquiring write lock
        if let Some(p) = pool.as_ref() {
            return Ok(p.clone());
        }

        info!("user_store_connecting");

        let in_memory = is_in_memory(&self.inner.url);
        let mut options = SqliteConnectOptions::from_str(&self.inner.url)
            .map_err(|e| StoreError::Internal(format!("Invalid database URL: {e}")))?
            .create_if_missing(true);

        // An in-memory database lives only as long as its single connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
            SqlitePoolOptions::new().max_connections(self.inner.max_connections)
        };

        let p = pool_options.connect_with(options).await?;

        sqlx::query(CREATE_USERS_TABLE).execute(&p).await?;

        info!(in_memory, "user_store_connected");

        *pool = Some(p.clone());
        Ok(p)
    }

    /// Close the pool if it was ever opened.
    pub async fn close(&self) {
        let mut pool = self.inner.pool.write().await;
        if let Some(p) = pool.take() {
            p.close().await;
        }
        info!("user_store_closed");
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn row_to_user(row: &SqliteRow) -> Result<UserRecord, StoreError> {
    Ok(UserRecord {
        clerk_id: row.try_get("clerk_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    #[tracing::instrument(skip(self, user), fields(clerk_id = %user.clerk_id))]
    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let pool = self.pool().await?;

        sqlx::query("INSERT INTO users (clerk_id, email, name, image) VALUES (?, ?, ?, ?)")
            .bind(&user.clerk_id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.image)
            .execute(&pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    StoreError::Conflict(format!("User {} already exists", user.clerk_id))
                }
                _ => StoreError::Sqlx(e),
            })?;

        debug!("user row inserted");
        Ok(())
    }

    #[tracing::instrument(skip(self, user), fields(clerk_id = %user.clerk_id))]
    async fn update_user(&self, user: &UserRecord) -> Result<bool, StoreError> {
        let pool = self.pool().await?;

        let result =
            sqlx::query("UPDATE users SET email = ?, name = ?, image = ? WHERE clerk_id = ?")
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.image)
                .bind(&user.clerk_id)
                .execute(&pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, clerk_id: &str) -> Result<bool, StoreError> {
        let pool = self.pool().await?;

        let result = sqlx::query("DELETE FROM users WHERE clerk_id = ?")
            .bind(clerk_id)
            .execute(&pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn find_user(&self, clerk_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let pool = self.pool().await?;

        let row = sqlx::query("SELECT clerk_id, email, name, image FROM users WHERE clerk_id = ?")
            .bind(clerk_id)
            .fetch_optional(&pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(clerk_id: &str, email: &str) -> UserRecord {
        UserRecord {
            clerk_id: clerk_id.to_string(),
            email: email.to_string(),
            name: "Jane Doe".to_string(),
            image: "https://img.example.com/jane.png".to_string(),
        }
    }

    fn memory_store() -> SqliteUserStore {
        SqliteUserStore::new("sqlite::memory:", 5)
    }

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory(":memory:"));
        assert!(is_in_memory("sqlite:file:users?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:users.db"));
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = memory_store();
        store.insert_user(&user("u1", "a@b.com")).await.unwrap();

        let found = store.find_user("u1").await.unwrap();
        assert_eq!(found, Some(user("u1", "a@b.com")));
        assert_eq!(store.find_user("u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let store = memory_store();
        store.insert_user(&user("u1", "a@b.com")).await.unwrap();

        let err = store.insert_user(&user("u1", "other@b.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(
            store.find_user("u1").await.unwrap().unwrap().email,
            "a@b.com"
        );
    }

    #[tokio::test]
    async fn test_update_filters_on_clerk_id() {
        let store = memory_store();
        store.insert_user(&user("u1", "a@b.com")).await.unwrap();
        store.insert_user(&user("u2", "c@d.com")).await.unwrap();

        let changed = UserRecord {
            clerk_id: "u1".to_string(),
            email: "new@b.com".to_string(),
            name: "Jane".to_string(),
            image: String::new(),
        };
        assert!(store.update_user(&changed).await.unwrap());

        assert_eq!(store.find_user("u1").await.unwrap(), Some(changed));
        assert_eq!(
            store.find_user("u2").await.unwrap(),
            Some(user("u2", "c@d.com"))
        );
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let store = memory_store();
        assert!(!store.update_user(&user("ghost", "g@h.com")).await.unwrap());
        assert_eq!(store.find_user("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = memory_store();
        store.insert_user(&user("u1", "a@b.com")).await.unwrap();

        assert!(store.delete_user("u1").await.unwrap());
        assert_eq!(store.find_user("u1").await.unwrap(), None);
        assert!(!store.delete_user("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_pool() {
        let store = memory_store();
        let clone = store.clone();
        store.insert_user(&user("u1", "a@b.com")).await.unwrap();
        assert!(clone.find_user("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_first_use_initializes_once() {
        let store = memory_store();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert_user(&user(&format!("u{i}"), "a@b.com"))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..8 {
            assert!(store.find_user(&format!("u{i}")).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_close_then_reopen() {
        let store = SqliteUserStore::new("sqlite::memory:", 1);
        store.insert_user(&user("u1", "a@b.com")).await.unwrap();
        store.close().await;

        // A fresh in-memory database is opened on next use.
        assert_eq!(store.find_user("u1").await.unwrap(), None);
    }
}
