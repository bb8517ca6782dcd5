//! Manual JSON backup over the namespaced key space
//!
//! Export is a pure, lossless snapshot: every `rewire_`-prefixed key copied
//! verbatim into a flat JSON object. Import validates the whole blob before
//! touching storage, then replaces the namespace wholesale (clear-then-write)
//! so old and new keys never mix. Callers reload in-memory state afterwards.

use crate::store::{Store, KEY_PREFIX, LAST_BACKUP_KEY};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// Error type for backup import failures
#[derive(Debug)]
pub enum BackupError {
    /// The supplied blob is not a JSON object of string values; storage was
    /// left untouched.
    Format(String),
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::Format(msg) => write!(f, "Invalid backup format: {}", msg),
        }
    }
}

impl std::error::Error for BackupError {}

/// Snapshot every namespaced key into an indented JSON object
pub fn export_blob(store: &Store) -> String {
    let mut blob: BTreeMap<String, String> = BTreeMap::new();
    for key in store.keys_with_prefix(KEY_PREFIX) {
        if let Some(value) = store.get(&key) {
            blob.insert(key, value);
        }
    }
    serde_json::to_string_pretty(&blob).unwrap_or_else(|e| {
        log::error!("failed to serialize backup blob: {}", e);
        "{}".to_string()
    })
}

/// Replace the namespace with the blob's prefixed entries.
///
/// Unprefixed keys are ignored, not errored. Returns the number of keys
/// written.
pub fn import_blob(store: &Store, raw: &str) -> Result<usize, BackupError> {
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| BackupError::Format(format!("not valid JSON: {}", e)))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| BackupError::Format("top-level value must be an object".to_string()))?;

    // Validate every prefixed entry before the first write; a bad value must
    // not leave the namespace half-replaced.
    let mut entries: Vec<(String, String)> = Vec::new();
    for (key, value) in object {
        if !key.starts_with(KEY_PREFIX) {
            continue;
        }
        let value = value.as_str().ok_or_else(|| {
            BackupError::Format(format!("value for `{}` must be a string", key))
        })?;
        entries.push((key.clone(), value.to_string()));
    }

    // A blob carrying no namespaced keys restores nothing; existing data
    // stays intact rather than being cleared for an empty import.
    if entries.is_empty() {
        return Ok(0);
    }

    for key in store.keys_with_prefix(KEY_PREFIX) {
        store.remove(&key);
    }
    for (key, value) in &entries {
        store.set(key, value);
    }
    Ok(entries.len())
}

/// Stamp the last-backup key with the current time (raw RFC 3339 string)
pub fn record_backup(store: &Store) {
    store.set(LAST_BACKUP_KEY, &Local::now().to_rfc3339());
}

/// Parse the last recorded backup time, `None` when absent or unparseable
pub fn last_backup(store: &Store) -> Option<DateTime<Local>> {
    let raw = store.get(LAST_BACKUP_KEY)?;
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// Whole hours since the last backup, `None` when no backup was recorded
pub fn hours_since_backup(store: &Store) -> Option<i64> {
    last_backup(store).map(|t| (Local::now() - t).num_hours())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = TempDir::new().expect("temp dir");
        let store = Store::open_at(dir.path().join("kv.db")).expect("open store");
        (dir, store)
    }

    #[test]
    fn test_export_import_roundtrip_is_byte_identical() {
        let (_dir, store) = temp_store();
        store.set("rewire_domains", r#"[{"id":"dom_x","name":"X","archived":false}]"#);
        store.set("rewire_stat_prot_a", r#"{"count":3,"last_completed":null}"#);
        store.set("rewire_last_backup", "2026-08-29T10:00:00+00:00");

        let blob = export_blob(&store);
        import_blob(&store, &blob).expect("import");

        assert_eq!(
            store.get("rewire_domains").as_deref(),
            Some(r#"[{"id":"dom_x","name":"X","archived":false}]"#)
        );
        assert_eq!(
            store.get("rewire_stat_prot_a").as_deref(),
            Some(r#"{"count":3,"last_completed":null}"#)
        );
        assert_eq!(export_blob(&store), blob);
    }

    #[test]
    fn test_import_replaces_namespace_wholesale() {
        let (_dir, store) = temp_store();
        store.set("rewire_domains", "[]");
        store.set("rewire_archived", r#"["prot_old"]"#);
        import_blob(&store, r#"{"rewire_domains": "[1]"}"#).expect("import");
        assert_eq!(store.get("rewire_domains").as_deref(), Some("[1]"));
        // Keys absent from the blob are gone, not merged.
        assert_eq!(store.get("rewire_archived"), None);
    }

    #[test]
    fn test_import_ignores_unprefixed_keys() {
        let (_dir, store) = temp_store();
        store.set("rewire_domains", "[]");
        let written = import_blob(&store, r#"{"unrelated_key": "x"}"#).expect("import");
        assert_eq!(written, 0);
        // Nothing to restore: existing prefixed data stays intact and the
        // foreign key is never written.
        assert_eq!(store.get("rewire_domains").as_deref(), Some("[]"));
        assert_eq!(store.get("unrelated_key"), None);
    }

    #[test]
    fn test_import_rejects_non_object() {
        let (_dir, store) = temp_store();
        store.set("rewire_domains", "[]");
        let err = import_blob(&store, "[1, 2]").expect_err("array is not a backup");
        assert!(matches!(err, BackupError::Format(_)));
        // Storage untouched on format failure.
        assert_eq!(store.get("rewire_domains").as_deref(), Some("[]"));
    }

    #[test]
    fn test_import_rejects_non_string_value_before_writing() {
        let (_dir, store) = temp_store();
        store.set("rewire_domains", "[]");
        let err = import_blob(&store, r#"{"rewire_domains": 5}"#).expect_err("non-string value");
        assert!(matches!(err, BackupError::Format(_)));
        assert_eq!(store.get("rewire_domains").as_deref(), Some("[]"));
    }

    #[test]
    fn test_last_backup_parses_recorded_stamp() {
        let (_dir, store) = temp_store();
        assert!(last_backup(&store).is_none());
        record_backup(&store);
        assert!(last_backup(&store).is_some());
        assert_eq!(hours_since_backup(&store), Some(0));
    }

    #[test]
    fn test_last_backup_tolerates_garbage() {
        let (_dir, store) = temp_store();
        store.set(LAST_BACKUP_KEY, "not-a-timestamp");
        assert!(last_backup(&store).is_none());
    }
}
