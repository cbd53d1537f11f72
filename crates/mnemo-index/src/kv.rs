//! The `KvStore` trait stands in for the browser's indexed async key-value
//! storage (IndexedDB). Callers address rows by a `(collection, key)` pair;
//! `collection` is just a namespace prefix here, not a SQL table per
//! collection — that would defeat the point of a generic store. Structured
//! collections that need real secondary indices (the graph) get their own
//! store in `graph_store` instead of going through this trait.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::Result;

pub trait KvStore: Send + Sync {
    fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()>;
    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>>;
    fn delete(&self, collection: &str, key: &str) -> Result<()>;
    fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>>;
}

pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );
            "#,
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()> {
        let conn = self.conn.lock().expect("kv store mutex poisoned");
        let serialized = serde_json::to_string(value)?;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO kv_documents (collection, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, key) DO UPDATE SET
                value = ?3,
                updated_at = ?4
            "#,
            params![collection, key, serialized, now],
        )?;
        Ok(())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().expect("kv store mutex poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let conn = self.conn.lock().expect("kv store mutex poisoned");
        conn.execute(
            "DELETE FROM kv_documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        Ok(())
    }

    fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let conn = self.conn.lock().expect("kv store mutex poisoned");
        let mut stmt =
            conn.prepare("SELECT key, value FROM kv_documents WHERE collection = ?1")?;
        let rows = stmt
            .query_map(params![collection], |row| {
                let key: String = row.get(0)?;
                let raw: String = row.get(1)?;
                Ok((key, raw))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, raw)| Ok((key, serde_json::from_str(&raw)?)))
            .collect()
    }
}

/// An in-memory `KvStore`, used by tests and the in-process CLI `sync demo`
/// where no durable SQLite file is wanted.
#[derive(Default)]
pub struct InMemoryKvStore {
    data: Mutex<HashMap<(String, String), Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for InMemoryKvStore {
    fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()> {
        let mut data = self.data.lock().expect("kv store mutex poisoned");
        data.insert((collection.to_string(), key.to_string()), value.clone());
        Ok(())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let data = self.data.lock().expect("kv store mutex poisoned");
        Ok(data
            .get(&(collection.to_string(), key.to_string()))
            .cloned())
    }

    fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let mut data = self.data.lock().expect("kv store mutex poisoned");
        data.remove(&(collection.to_string(), key.to_string()));
        Ok(())
    }

    fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let data = self.data.lock().expect("kv store mutex poisoned");
        Ok(data
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get("settings", "main").unwrap(), None);

        store.put("settings", "main", &json!({"theme": "dark"})).unwrap();
        assert_eq!(
            store.get("settings", "main").unwrap(),
            Some(json!({"theme": "dark"}))
        );

        store.put("settings", "main", &json!({"theme": "light"})).unwrap();
        assert_eq!(
            store.get("settings", "main").unwrap(),
            Some(json!({"theme": "light"}))
        );

        store.put("jobs", "j1", &json!({"status": "pending"})).unwrap();
        let all = store.get_all("settings").unwrap();
        assert_eq!(all.len(), 1);

        store.delete("settings", "main").unwrap();
        assert_eq!(store.get("settings", "main").unwrap(), None);
    }

    #[test]
    fn sqlite_in_memory_roundtrip() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        exercise(&store);
    }

    #[test]
    fn in_memory_store_roundtrip() {
        let store = InMemoryKvStore::new();
        exercise(&store);
    }
}
