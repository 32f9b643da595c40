//! Local persistent key/value store and the form backup built on it.
//!
//! The store stands in for browser local storage: string keys, string
//! values, shared by every component on a page. Backups are JSON entries
//! stamped with their save time and dropped once they exceed the
//! expiration window.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::util::now_unix_secs;

// ============================================================================
// Key/value stores
// ============================================================================

/// Browser-local-storage-like string store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The file is read once on open and rewritten on every mutation, using a
/// temp file + rename so a crash never leaves a truncated store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or create on first write) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "opened backup store");
        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    /// Open `<dir>/backups.json`
    pub fn in_dir(dir: &Path) -> Result<Self, StoreError> {
        Self::open(dir.join("backups.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&*self.entries.borrow())?;
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let removed = self.entries.borrow_mut().remove(key).is_some();
        if removed {
            self.persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

// ============================================================================
// Backup entries
// ============================================================================

/// Key under which a form component backs up its values
pub fn form_backup_key(form_type: &str) -> String {
    format!("card-form-{}", form_type)
}

/// Key under which a list component backs up its active form
pub fn list_backup_key(list_type: &str) -> String {
    format!("card-list-{}", list_type)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupEntry {
    saved_at: u64,
    values: Map<String, Value>,
}

/// Expiring snapshots on top of a shared store
#[derive(Clone)]
pub struct BackupStore {
    store: Rc<dyn KeyValueStore>,
    expiration: Duration,
}

impl BackupStore {
    pub fn new(store: Rc<dyn KeyValueStore>, expiration: Duration) -> Self {
        Self { store, expiration }
    }

    pub fn save(&self, key: &str, values: &Map<String, Value>) -> Result<(), StoreError> {
        self.save_at(key, values, now_unix_secs())
    }

    pub fn save_at(&self, key: &str, values: &Map<String, Value>, saved_at: u64) -> Result<(), StoreError> {
        let entry = BackupEntry {
            saved_at,
            values: values.clone(),
        };
        self.store.set(key, &serde_json::to_string(&entry)?)?;
        debug!(key, fields = values.len(), "backup saved");
        Ok(())
    }

    /// The stored snapshot, unless missing, unreadable or expired
    pub fn load(&self, key: &str) -> Option<Map<String, Value>> {
        self.load_at(key, now_unix_secs())
    }

    pub fn load_at(&self, key: &str, now: u64) -> Option<Map<String, Value>> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cannot read backup");
                return None;
            }
        };
        let entry: BackupEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable backup");
                let _ = self.store.remove(key);
                return None;
            }
        };
        if now.saturating_sub(entry.saved_at) > self.expiration.as_secs() {
            debug!(key, saved_at = entry.saved_at, "discarding expired backup");
            let _ = self.store.remove(key);
            return None;
        }
        Some(entry.values)
    }

    pub fn clear(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "cannot clear backup");
        }
    }

    /// Remove every expired `card-*` backup. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cannot list backups");
                return 0;
            }
        };
        keys.iter()
            .filter(|k| k.starts_with("card-"))
            .filter(|k| self.store.get(k).ok().flatten().is_some() && self.load(k).is_none())
            .count()
    }
}

// ============================================================================
// Debounced backup
// ============================================================================

/// Backup of one component's in-progress values with a debounce window
pub struct Backup {
    store: BackupStore,
    key: String,
    debounce: Duration,
    pending: Option<(Map<String, Value>, Instant)>,
}

impl Backup {
    pub fn new(store: BackupStore, key: impl Into<String>, debounce: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            debounce,
            pending: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Record a snapshot. With no debounce it is written immediately,
    /// otherwise it replaces any pending snapshot and is written by `poll`,
    /// `settle` or on drop. A pending snapshot already past its deadline is
    /// written before being replaced.
    pub fn schedule(&mut self, values: Map<String, Value>, now: Instant) {
        self.poll(now);
        if self.debounce.is_zero() {
            self.pending = None;
            self.write(&values);
        } else {
            self.pending = Some((values, now + self.debounce));
        }
    }

    /// Write the pending snapshot if its deadline passed
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = matches!(&self.pending, Some((_, due)) if *due <= now);
        if due {
            self.flush()
        } else {
            false
        }
    }

    /// Write the pending snapshot now
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some((values, _)) => {
                self.write(&values);
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending snapshot becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Wait out the debounce window and write the pending snapshot
    pub async fn settle(&mut self) -> bool {
        let due = match self.deadline() {
            Some(due) => due,
            None => return false,
        };
        tokio::time::sleep_until(tokio::time::Instant::from_std(due)).await;
        self.poll(Instant::now())
    }

    pub fn load(&self) -> Option<Map<String, Value>> {
        self.store.load(&self.key)
    }

    /// Drop the pending snapshot and the stored entry
    pub fn clear(&mut self) {
        self.pending = None;
        self.store.clear(&self.key);
    }

    fn write(&self, values: &Map<String, Value>) {
        if let Err(e) = self.store.save(&self.key, values) {
            warn!(key = %self.key, error = %e, "backup write failed");
        }
    }
}

impl Drop for Backup {
    fn drop(&mut self) {
        if self.flush() {
            debug!(key = %self.key, "flushed pending backup on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(title: &str) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("title".to_string(), json!(title));
        m
    }

    fn backup_store() -> (Rc<MemoryStore>, BackupStore) {
        let mem = MemoryStore::shared();
        let store = BackupStore::new(mem.clone(), Duration::from_secs(7 * 86400));
        (mem, store)
    }

    #[test]
    fn test_save_and_load() {
        let (_, store) = backup_store();
        store.save("card-form-topic", &values("Direito")).unwrap();
        assert_eq!(store.load("card-form-topic"), Some(values("Direito")));
        store.clear("card-form-topic");
        assert_eq!(store.load("card-form-topic"), None);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let (mem, store) = backup_store();
        store.save_at("card-form-old", &values("velho"), 1_000).unwrap();
        assert_eq!(store.load_at("card-form-old", 1_000 + 8 * 86400), None);
        assert_eq!(mem.get("card-form-old").unwrap(), None);
    }

    #[test]
    fn test_unreadable_entries_are_dropped() {
        let (mem, store) = backup_store();
        mem.set("card-form-bad", "not json").unwrap();
        assert_eq!(store.load("card-form-bad"), None);
        assert!(mem.keys().unwrap().is_empty());
    }

    #[test]
    fn test_purge_expired_only_touches_card_keys() {
        let (mem, store) = backup_store();
        store.save_at("card-form-a", &values("a"), 0).unwrap();
        store.save("card-list-b", &values("b")).unwrap();
        mem.set("other", "x").unwrap();
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(mem.keys().unwrap(), vec!["card-list-b".to_string(), "other".to_string()]);
    }

    #[test]
    fn test_debounced_backup_writes_on_poll() {
        let (mem, store) = backup_store();
        let mut backup = Backup::new(store, "card-form-x", Duration::from_millis(500));
        let t0 = Instant::now();
        backup.schedule(values("1"), t0);
        backup.schedule(values("2"), t0 + Duration::from_millis(100));
        assert!(!backup.poll(t0 + Duration::from_millis(300)));
        assert_eq!(mem.get("card-form-x").unwrap(), None);
        assert!(backup.poll(t0 + Duration::from_millis(700)));
        assert_eq!(backup.load(), Some(values("2")));
        assert!(!backup.has_pending());
    }

    #[test]
    fn test_overdue_snapshot_written_before_next_schedule() {
        let (mem, store) = backup_store();
        let mut backup = Backup::new(store, "card-form-x", Duration::from_millis(500));
        let t0 = Instant::now();
        backup.schedule(values("1"), t0);
        backup.schedule(values("2"), t0 + Duration::from_secs(2));
        assert_eq!(backup.load(), Some(values("1")));
        assert!(backup.has_pending());
        drop(backup);
        let store = BackupStore::new(mem, Duration::from_secs(7 * 86400));
        assert_eq!(store.load("card-form-x"), Some(values("2")));
    }

    #[test]
    fn test_drop_flushes_pending_snapshot() {
        let (mem, store) = backup_store();
        let mut backup = Backup::new(store.clone(), "card-form-z", Duration::from_secs(1));
        backup.schedule(values("rascunho"), Instant::now());
        assert_eq!(mem.get("card-form-z").unwrap(), None);
        drop(backup);
        assert_eq!(store.load("card-form-z"), Some(values("rascunho")));
    }

    #[tokio::test]
    async fn test_settle_writes_after_debounce_window() {
        let (_, store) = backup_store();
        let mut backup = Backup::new(store, "card-form-w", Duration::from_millis(20));
        backup.schedule(values("espera"), Instant::now());
        assert!(backup.deadline().is_some());
        assert!(backup.settle().await);
        assert_eq!(backup.load(), Some(values("espera")));
        assert!(!backup.settle().await);
    }

    #[test]
    fn test_zero_debounce_writes_immediately() {
        let (_, store) = backup_store();
        let mut backup = Backup::new(store, "card-form-y", Duration::ZERO);
        backup.schedule(values("now"), Instant::now());
        assert_eq!(backup.load(), Some(values("now")));
        backup.clear();
        assert_eq!(backup.load(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::in_dir(dir.path()).unwrap();
            store.set("card-form-brand", "{\"savedAt\":1,\"values\":{}}").unwrap();
        }
        let reopened = FileStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["card-form-brand".to_string()]);
        reopened.remove("card-form-brand").unwrap();
        let again = FileStore::in_dir(dir.path()).unwrap();
        assert!(again.keys().unwrap().is_empty());
    }

    #[test]
    fn test_backup_keys() {
        assert_eq!(form_backup_key("marca"), "card-form-marca");
        assert_eq!(list_backup_key("topicos"), "card-list-topicos");
    }
}
