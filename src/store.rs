//! SQLite-backed key-value store with Diesel ORM
//!
//! Every logical collection (domains, protocols, overlays, view state, stats)
//! lives under its own namespaced key as a serialized string, one row per key.
//! Access failures are contained here: `get` degrades to `None`, `set` to a
//! no-op, both logged. Callers never see a storage error.

use crate::schema::kv_entries;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::Path;

/// Reserved namespace prefix for every key this tool owns.
pub const KEY_PREFIX: &str = "rewire_";

/// Full domain list, seeded from the base dataset on first run.
pub const DOMAINS_KEY: &str = "rewire_domains";
/// User-created protocols.
pub const CUSTOM_PROTOCOLS_KEY: &str = "rewire_custom_protocols";
/// Archived protocol id overlay.
pub const ARCHIVED_KEY: &str = "rewire_archived";
/// Deleted protocol id overlay (suppresses immutable base records).
pub const DELETED_KEY: &str = "rewire_deleted";
/// Selection and display state.
pub const STATE_KEY: &str = "rewire_state";
/// Last backup timestamp, stored as a raw RFC 3339 string (not JSON-wrapped).
pub const LAST_BACKUP_KEY: &str = "rewire_last_backup";

const STAT_KEY_PREFIX: &str = "rewire_stat_";

/// Key for a protocol's completion stat.
pub fn stat_key(protocol_id: &str) -> String {
    format!("{}{}", STAT_KEY_PREFIX, protocol_id)
}

/// Resolve the store path. `REWIRE_DB_PATH` always wins; otherwise walk up
/// the directory tree for a `.rewire` folder (like git finds `.git`), falling
/// back to `~/.rewire/rewire.db`.
fn get_store_path() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("REWIRE_DB_PATH") {
        return std::path::PathBuf::from(path);
    }

    if let Ok(current_dir) = std::env::current_dir() {
        let mut dir = current_dir.as_path();
        loop {
            let rewire_dir = dir.join(".rewire");
            if rewire_dir.exists() && rewire_dir.is_dir() {
                return rewire_dir.join("rewire.db");
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".rewire").join("rewire.db"))
        .unwrap_or_else(|| std::path::PathBuf::from(".rewire/rewire.db"))
}

// ============================================================================
// Diesel Models
// ============================================================================

#[derive(Insertable)]
#[diesel(table_name = kv_entries)]
struct NewKvEntry<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = kv_entries)]
struct KvEntry {
    #[allow(dead_code)]
    key: String,
    value: String,
}

// ============================================================================
// Store Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Key-value store over a pooled SQLite connection
pub struct Store {
    pool: DbPool,
}

/// Error type for store open/query failures
#[derive(Debug)]
pub enum StoreError {
    Connection(String),
    Query(diesel::result::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "Connection error: {}", msg),
            StoreError::Query(e) => write!(f, "Query error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Query(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl Store {
    /// Get the store path that will be used
    pub fn store_path() -> std::path::PathBuf {
        get_store_path()
    }

    /// Open the store at the default path (respects REWIRE_DB_PATH env var)
    pub fn open() -> Result<Self> {
        let path = get_store_path();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).ok();
            }
        }
        Self::open_at(&path)
    }

    /// Open the store at a specific path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(2)
            .build(manager)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<DbConn> {
        self.pool
            .get()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut conn)?;
        Ok(())
    }

    // ========================================================================
    // Contained key-value operations
    // ========================================================================

    /// Read a key. Storage failures are logged and reported as `None`;
    /// callers proceed as if the value were absent.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                log::error!("store get failed for `{}`: {}", key, e);
                None
            }
        }
    }

    /// Write a key. Storage failures are logged and swallowed; no retries,
    /// a failure is permanent for this call.
    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            log::error!("store set failed for `{}`: {}", key, e);
        }
    }

    /// Remove a key. Failures are logged and swallowed.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key) {
            log::error!("store remove failed for `{}`: {}", key, e);
        }
    }

    /// All stored keys carrying `prefix`, in key order. Failures are logged
    /// and reported as an empty list.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self.try_keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(prefix))
                .collect(),
            Err(e) => {
                log::error!("store key scan failed: {}", e);
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Fallible internals
    // ========================================================================

    fn try_get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        let row = kv_entries::table
            .filter(kv_entries::key.eq(key))
            .first::<KvEntry>(&mut conn)
            .optional()?;
        Ok(row.map(|r| r.value))
    }

    fn try_set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let entry = NewKvEntry { key, value };
        diesel::replace_into(kv_entries::table)
            .values(&entry)
            .execute(&mut conn)?;
        Ok(())
    }

    fn try_remove(&self, key: &str) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::delete(kv_entries::table.filter(kv_entries::key.eq(key)))
            .execute(&mut conn)?;
        Ok(())
    }

    fn try_keys(&self) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        let keys = kv_entries::table
            .select(kv_entries::key)
            .order(kv_entries::key.asc())
            .load::<String>(&mut conn)?;
        Ok(keys)
    }
}
