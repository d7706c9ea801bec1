// Persistence port for the event store and its implementations.
//
// The whole date -> events mapping is read once at startup and rewritten in
// full after every mutation. `LocalStorage` keeps it in a single JSON file;
// `MemoryStorage` keeps the same JSON text in memory for tests and embedders.
use crate::config::Config;
use crate::context::AppContext;
use crate::model::{DateKey, Event, EventMap};
use anyhow::{Context, Result};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const DEFAULT_DATA_FILENAME: &str = "events.json";
const CORRUPT_SUFFIX: &str = "corrupt";

/// Load/save port used by [`crate::store::EventStore`].
pub trait EventPersistence: Send + Sync + std::fmt::Debug {
    /// Returns the persisted mapping. Absent data is an empty map, not an error.
    fn load(&self) -> Result<EventMap>;

    /// Overwrites the persisted mapping.
    fn save(&self, events: &EventMap) -> Result<()>;
}

/// Parses a persisted mapping.
///
/// Keys are read as raw strings first: a legacy display key and an ISO key
/// can name the same day, and their lists are merged instead of one
/// replacing the other.
pub fn parse_events(json: &str) -> Result<EventMap> {
    if json.trim().is_empty() {
        return Ok(EventMap::new());
    }
    let raw: BTreeMap<String, Vec<Event>> = serde_json::from_str(json)?;

    let mut events = EventMap::new();
    for (raw_key, day) in raw {
        let key = DateKey::parse_lenient(&raw_key)
            .ok_or_else(|| anyhow::anyhow!("Invalid date key '{}'", raw_key))?;
        if raw_key != key.to_string() {
            log::info!("Migrating legacy date key '{}' to {}", raw_key, key);
        }
        match events.get_mut(&key) {
            Some(existing) => {
                log::warn!(
                    "Date key '{}' duplicates {}, merging {} events",
                    raw_key,
                    key,
                    day.len()
                );
                existing.extend(day);
            }
            None => {
                events.insert(key, day);
            }
        }
    }
    Ok(events)
}

// --- JSON FILE ---

/// Event data stored as one JSON object (`{ "YYYY-MM-DD": [Event, ...] }`).
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the data file from the context's data directory and the configured file name.
    pub fn from_context(ctx: &dyn AppContext, config: &Config) -> Result<Self> {
        let dir = ctx.get_data_dir()?;
        Ok(Self::new(dir.join(&config.data_file)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Helper to get a sidecar lock file path
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive lock on the sidecar lock file.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;

        file.lock_exclusive()?;
        let result = f();
        FileExt::unlock(&file)?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Path an unreadable data file is moved to (`events.json` -> `events.json.corrupt`).
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(CORRUPT_SUFFIX);
        PathBuf::from(name)
    }

    /// Moves an unreadable file out of the way so the next save cannot clobber it.
    fn set_aside(&self) {
        let target = self.corrupt_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => log::warn!("Unreadable event data moved to {:?}", target),
            Err(e) => log::error!("Could not move unreadable {:?} aside: {}", self.path, e),
        }
    }
}

impl EventPersistence for LocalStorage {
    fn load(&self) -> Result<EventMap> {
        if !self.path.exists() {
            return Ok(EventMap::new());
        }
        Self::with_lock(&self.path, || {
            let bytes =
                fs::read(&self.path).with_context(|| format!("Failed to read {:?}", self.path))?;
            let parsed = std::str::from_utf8(&bytes)
                .map_err(anyhow::Error::from)
                .and_then(parse_events);
            match parsed {
                Ok(events) => Ok(events),
                Err(e) => {
                    self.set_aside();
                    Err(e.context(format!("Failed to parse {:?}", self.path)))
                }
            }
        })
    }

    fn save(&self, events: &EventMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::with_lock(&self.path, || {
            let json = serde_json::to_string_pretty(events)?;
            Self::atomic_write(&self.path, json)?;
            Ok(())
        })
    }
}

// --- IN MEMORY ---

#[derive(Debug, Default)]
struct MemoryState {
    json: Option<String>,
    saves: usize,
    fail_saves: bool,
}

/// In-memory persistence holding the serialized JSON text.
///
/// Clones share state, so a test can keep a handle after giving one to the store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the storage with raw text, valid or not.
    pub fn with_raw(json: &str) -> Self {
        let storage = Self::new();
        if let Ok(mut state) = storage.state.lock() {
            state.json = Some(json.to_string());
        }
        storage
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))
    }

    /// The last saved (or seeded) JSON text.
    pub fn raw(&self) -> Option<String> {
        self.lock().ok().and_then(|s| s.json.clone())
    }

    pub fn save_count(&self) -> usize {
        self.lock().map(|s| s.saves).unwrap_or(0)
    }

    /// Makes subsequent saves fail, to exercise rollback paths.
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_saves = fail;
        }
    }
}

impl EventPersistence for MemoryStorage {
    fn load(&self) -> Result<EventMap> {
        match self.lock()?.json.as_deref() {
            Some(json) => parse_events(json),
            None => Ok(EventMap::new()),
        }
    }

    fn save(&self, events: &EventMap) -> Result<()> {
        let mut state = self.lock()?;
        if state.fail_saves {
            anyhow::bail!("storage is read-only");
        }
        state.json = Some(serde_json::to_string(events)?);
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;
    use crate::model::{DateKey, EventDraft, EventType};
    use std::thread;

    fn sample_map() -> EventMap {
        let mut map = EventMap::new();
        let ev = EventDraft::new("Standup", "09:00", "09:15", EventType::Work)
            .validate()
            .unwrap();
        map.insert(DateKey::from_ymd(2024, 6, 3).unwrap(), vec![ev]);
        map
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let ctx = TestContext::new();
        let storage = LocalStorage::new(ctx.root.join("nothing_here.json"));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_file() {
        let ctx = TestContext::new();
        let storage = LocalStorage::from_context(&ctx, &Config::default()).unwrap();
        let map = sample_map();
        storage.save(&map).unwrap();

        assert!(storage.path().ends_with(DEFAULT_DATA_FILENAME));
        assert!(!storage.path().with_extension("tmp").exists());
        let text = fs::read_to_string(storage.path()).unwrap();
        assert!(text.contains("\"2024-06-03\""));
        assert!(text.contains("\"startTime\": \"09:00\""));

        assert_eq!(storage.load().unwrap(), map);
    }

    #[test]
    fn test_corrupt_file_is_set_aside() {
        let ctx = TestContext::new();
        let storage = LocalStorage::new(ctx.root.join("events.json"));
        fs::write(storage.path(), "{ not json").unwrap();

        assert!(storage.load().is_err());
        assert!(!storage.path().exists());
        assert_eq!(
            fs::read_to_string(storage.corrupt_path()).unwrap(),
            "{ not json"
        );

        // Next save starts fresh without touching the set-aside copy
        storage.save(&sample_map()).unwrap();
        assert!(storage.corrupt_path().exists());
        assert_eq!(storage.load().unwrap().len(), 1);
    }

    #[test]
    fn test_non_utf8_file_is_set_aside() {
        let ctx = TestContext::new();
        let storage = LocalStorage::new(ctx.root.join("events.json"));
        let bytes = b"{\"2024-06-03\":[{\"name\":\"Caf\xE9\"}]}".to_vec();
        fs::write(storage.path(), &bytes).unwrap();

        assert!(storage.load().is_err());
        assert!(!storage.path().exists());
        assert_eq!(fs::read(storage.corrupt_path()).unwrap(), bytes);
    }

    #[test]
    fn test_duplicate_day_keys_are_merged() {
        let json = r#"{
            "Mon Jun 03 2024": [{"name":"C","startTime":"11:00","endTime":"12:00","type":"Work"}],
            "2024-06-03": [
                {"name":"A","startTime":"09:00","endTime":"09:30","type":"Work"},
                {"name":"B","startTime":"10:00","endTime":"10:30","type":"Work"}
            ]
        }"#;
        let map = MemoryStorage::with_raw(json).load().unwrap();
        let day = &map[&DateKey::from_ymd(2024, 6, 3).unwrap()];
        let names: Vec<&str> = day.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_bad_day_key_fails_to_parse() {
        assert!(parse_events(r#"{"someday": []}"#).is_err());
    }

    #[test]
    fn test_locking_concurrency() {
        let ctx = TestContext::new();
        let file_path = ctx.root.join("lock_test.txt");
        fs::write(&file_path, "0").unwrap();
        let path_ref = Arc::new(file_path.clone());

        let mut handles = vec![];
        for _ in 0..10 {
            let p = path_ref.clone();
            handles.push(thread::spawn(move || {
                LocalStorage::with_lock(&p, || {
                    let content = fs::read_to_string(&*p).unwrap();
                    let num: i32 = content.parse().unwrap();
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    fs::write(&*p, (num + 1).to_string()).unwrap();
                    Ok(())
                })
                .unwrap();
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "10");
    }

    #[test]
    fn test_memory_storage_shares_state_between_clones() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        assert!(storage.load().unwrap().is_empty());

        storage.save(&sample_map()).unwrap();
        assert_eq!(handle.save_count(), 1);
        assert!(handle.raw().unwrap().contains("Standup"));
        assert_eq!(handle.load().unwrap(), sample_map());
    }

    #[test]
    fn test_memory_storage_failures() {
        assert!(MemoryStorage::with_raw("[1, 2").load().is_err());
        assert!(MemoryStorage::with_raw("").load().unwrap().is_empty());

        let storage = MemoryStorage::new();
        storage.set_fail_saves(true);
        assert!(storage.save(&sample_map()).is_err());
        assert_eq!(storage.save_count(), 0);
        assert!(storage.raw().is_none());
    }
}
