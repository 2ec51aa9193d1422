use crate::conversation::ConversationSet;
use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Key of the single persisted record
pub const STORAGE_KEY: &str = "chats";

/// Persistence for the whole conversation set as one record.
///
/// `load` never fails: a missing or unreadable record is an empty set.
pub trait ChatStore: Send {
    fn load(&self) -> ConversationSet;
    fn store(&mut self, chats: &ConversationSet) -> Result<()>;
}

fn decode(raw: &str, origin: &str) -> ConversationSet {
    match serde_json::from_str(raw) {
        Ok(chats) => chats,
        Err(e) => {
            tracing::warn!(origin, error = %e, "Stored chats are unreadable, starting empty");
            ConversationSet::new()
        }
    }
}

/// Record kept as `<data_dir>/chats.json`
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChatStore for FileStore {
    fn load(&self) -> ConversationSet {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw, &self.path.display().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No stored chats yet");
                ConversationSet::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read stored chats");
                ConversationSet::new()
            }
        }
    }

    fn store(&mut self, chats: &ConversationSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(chats)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), chats = chats.len(), "Saved chats");
        Ok(())
    }
}

/// Record kept in memory as its serialized text.
///
/// Clones share the same record, so a test can keep a handle and inspect
/// what the state wrote.
#[derive(Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing serialized record
    pub fn with_record(raw: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut record) = store.record.lock() {
            *record = Some(raw.into());
        }
        store
    }

    pub fn record(&self) -> Option<String> {
        self.record.lock().ok().and_then(|record| record.clone())
    }

    /// Number of `store` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ChatStore for MemoryStore {
    fn load(&self) -> ConversationSet {
        match self.record() {
            Some(raw) => decode(&raw, "memory"),
            None => ConversationSet::new(),
        }
    }

    fn store(&mut self, chats: &ConversationSet) -> Result<()> {
        let raw = serde_json::to_string(chats)?;
        if let Ok(mut record) = self.record.lock() {
            *record = Some(raw);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
