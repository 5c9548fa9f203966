//! SQLite store.

use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::JournalMode;
use async_trait::async_trait;

use super::KeyValueStore;
use crate::error::StoreError;

/// SQLite-backed storage.
///
/// Plays the role of the browser's local storage: every page opened on the
/// same file sees the same keys, and values survive process restarts.
/// Reads always go to the database, so writes from another process sharing
/// the file are visible at once.
///
/// # Example
///
/// ```ignore
/// use board_sync::store::SqliteStore;
///
/// let store = SqliteStore::open("storage.db").await?;
/// ```
pub struct SqliteStore {
    client: Client,
}

impl SqliteStore {
    /// Opens a store at the given path, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let client = ClientBuilder::new()
            .path(path)
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    /// Opens an in-memory store. Data is lost when the store is dropped.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let client = ClientBuilder::new().path(":memory:").open().await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    async fn init_schema(client: &Client) -> Result<(), StoreError> {
        client
            .conn(|conn| {
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS storage (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL
                    )",
                    [],
                )
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key_owned = key.to_string();
        let value = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare("SELECT value FROM storage WHERE key = ?")?;
                let mut rows = stmt.query([&key_owned])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get::<_, String>(0)?)),
                    None => Ok(None),
                }
            })
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key_owned = key.to_string();
        let value_owned = value.to_string();

        self.client
            .conn(move |conn| {
                conn.execute(
                    "INSERT INTO storage (key, value) VALUES (?, ?)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    [&key_owned, &value_owned],
                )
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key_owned = key.to_string();

        self.client
            .conn(move |conn| conn.execute("DELETE FROM storage WHERE key = ?", [&key_owned]))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_in_memory() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store.set("autoreload", "1").await.unwrap();
        store.set("user_name", "山田").await.unwrap();
        assert_eq!(store.get("autoreload").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("user_name").await.unwrap().as_deref(), Some("山田"));

        store.set("autoreload", "0").await.unwrap();
        assert_eq!(store.get("autoreload").await.unwrap().as_deref(), Some("0"));

        store.remove("autoreload").await.unwrap();
        assert_eq!(store.get("autoreload").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stores_on_one_file_see_each_other() {
        let path = std::env::temp_dir().join(format!("board-sync-shared-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let first = SqliteStore::open(&path).await.unwrap();
        let second = SqliteStore::open(&path).await.unwrap();

        first.set("user_name", "alice").await.unwrap();
        assert_eq!(first.get("user_name").await.unwrap().as_deref(), Some("alice"));
        assert_eq!(second.get("user_name").await.unwrap().as_deref(), Some("alice"));

        second.remove("user_name").await.unwrap();
        assert_eq!(first.get("user_name").await.unwrap(), None);

        second.set("sortindex", "3").await.unwrap();
        assert_eq!(first.get("sortindex").await.unwrap().as_deref(), Some("3"));

        drop(first);
        drop(second);
        let _ = std::fs::remove_file(&path);
    }
}
