use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

use crate::conversation::Conversation;

pub const CONVERSATION_KEY: &str = "conversation_history";
pub const SESSION_KEY: &str = "session_id";

/// Key-value snapshot storage for session state. Abstracted so the
/// session can be tested against an in-memory fake instead of the
/// real on-disk store.
pub trait SnapshotStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);
    fn clear(&mut self);
}

/// File-backed store under the user's data directory. Read or write
/// failures degrade silently; the session then lives in memory only.
pub struct FileStore {
    dir: Option<PathBuf>,
}

impl FileStore {
    pub fn new() -> Self {
        Self {
            dir: dirs::data_local_dir().map(|d| d.join("boutique").join("session")),
        }
    }

    #[cfg(test)]
    pub fn at(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{}.json", key)))
    }
}

impl SnapshotStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        let path = self.path_for(key)?;
        fs::read_to_string(path).ok()
    }

    fn write(&mut self, key: &str, value: &str) {
        if let (Some(dir), Some(path)) = (self.dir.as_ref(), self.path_for(key)) {
            let _ = fs::create_dir_all(dir);
            let _ = fs::write(path, value);
        }
    }

    fn clear(&mut self) {
        if let Some(dir) = self.dir.as_ref() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}

/// In-memory fake used by tests in place of the on-disk store.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Conversation plus session identity, bound to a snapshot store.
/// The identity token is generated lazily on first use and never
/// regenerated while the persisted session exists.
pub struct Session<S: SnapshotStore> {
    store: S,
    pub conversation: Conversation,
    session_id: String,
}

impl<S: SnapshotStore> Session<S> {
    /// Restores a previously persisted session, or starts a fresh one
    /// with a new identity token. A snapshot that fails to parse is
    /// treated the same as an absent one, and a placeholder persisted
    /// mid-turn is dropped rather than rendered as a stale entry.
    pub fn restore(store: S) -> Self {
        let mut conversation: Conversation = store
            .read(CONVERSATION_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        conversation.sweep_pending();
        let session_id = store
            .read(SESSION_KEY)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            store,
            conversation,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Writes the full snapshot and session id. Called after every
    /// conversation change; side effect only.
    pub fn persist(&mut self) {
        if let Ok(raw) = serde_json::to_string(&self.conversation) {
            self.store.write(CONVERSATION_KEY, &raw);
        }
        let id = self.session_id.clone();
        self.store.write(SESSION_KEY, &id);
    }

    /// Ends the session: drops all persisted state and the identity.
    pub fn clear(&mut self) {
        self.store.clear();
        self.conversation = Conversation::new();
        self.session_id = Uuid::new_v4().to_string();
    }

    #[cfg(test)]
    fn into_store(self) -> S {
        self.store
    }
}
