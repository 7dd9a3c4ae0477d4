use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use directories::ProjectDirs;

use crate::models::sessions::SessionRecord;

/// Local key-value persistence for the session marker. One record at most;
/// no schema versioning.
pub trait SessionStore: Send + Sync + 'static {
    fn load(&self) -> Result<Option<SessionRecord>, anyhow::Error>;
    fn save(&self, record: &SessionRecord) -> Result<(), anyhow::Error>;
    fn clear(&self) -> Result<(), anyhow::Error>;
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new() -> Result<Self, anyhow::Error> {
        let dirs = ProjectDirs::from("app", "growthpay", "growthpay")
            .ok_or_else(|| anyhow!("could not resolve a data directory"))?;
        let dir = dirs.data_dir().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        Ok(FileSessionStore {
            path: dir.join("session.json"),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        FileSessionStore { path }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, anyhow::Error> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            // an unreadable marker is the same as no session
            Err(e) => {
                log::warn!("Discarding malformed session marker: {}", e);
                let _ = fs::remove_file(&self.path);
                Ok(None)
            }
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), anyhow::Error> {
        let raw = serde_json::to_string(record)?;
        fs::write(&self.path, raw)?;

        Ok(())
    }

    fn clear(&self) -> Result<(), anyhow::Error> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }

        Ok(())
    }
}

/// Volatile variant used by tests.
pub struct MemorySessionStore {
    inner: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        MemorySessionStore {
            inner: Mutex::new(None),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        MemorySessionStore::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, anyhow::Error> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard.clone()),
            Err(_) => bail!("session lock poisoned"),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), anyhow::Error> {
        match self.inner.lock() {
            Ok(mut guard) => {
                *guard = Some(record.clone());
                Ok(())
            }
            Err(_) => bail!("session lock poisoned"),
        }
    }

    fn clear(&self) -> Result<(), anyhow::Error> {
        match self.inner.lock() {
            Ok(mut guard) => {
                *guard = None;
                Ok(())
            }
            Err(_) => bail!("session lock poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FileSessionStore {
        let path = std::env::temp_dir().join(format!(
            "growthpay-session-{}.json",
            uuid::Uuid::new_v4().hyphenated()
        ));
        FileSessionStore::with_path(path)
    }

    #[test]
    fn file_store_round_trips_a_record() {
        let store = temp_store();
        assert!(store.load().unwrap().is_none());

        let record = SessionRecord {
            user_id: "u-1".to_string(),
            device_id: "d-1".to_string(),
            saved_at: 1_700_000_000,
        };
        store.save(&record).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user_id, "u-1");
        assert_eq!(loaded.device_id, "d-1");
        assert_eq!(loaded.saved_at, 1_700_000_000);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn malformed_marker_reads_as_no_session() {
        let store = temp_store();
        std::fs::write(&store.path, "not json").unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
