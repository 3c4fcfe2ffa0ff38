//! Persisted session state.
//!
//! # Design
//! `SessionStore` is an ordinary value, not a global: the application opens
//! one at startup and passes it to whoever needs it. Opening loads the
//! persisted record; every mutation writes it back before returning.
//! Unreadable or corrupt persisted state opens as "no session".
//!
//! Persisted layout under the `user-storage` key:
//! `{"user": {"id": 1, "email": "a@b.com", "firstName": "Ada"}}` or
//! `{"user": null}`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::types::User;

/// Storage key of the persisted session record.
pub const SESSION_STORAGE_KEY: &str = "user-storage";

/// String key-value storage that outlives the process.
pub trait SessionStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<platform data dir>/klara`, when the platform has one.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|dir| Self::new(dir.join("klara")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }
}

/// In-process storage. Clones share the same map, which lets tests model a
/// restart by opening a second store over a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("memory storage lock poisoned"))
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    user: Option<User>,
}

/// Holder of the currently authenticated user.
#[derive(Debug)]
pub struct SessionStore<S: SessionStorage> {
    storage: S,
    user: Option<User>,
}

impl<S: SessionStorage> SessionStore<S> {
    /// Open the store, restoring whatever session `storage` holds.
    pub fn open(storage: S) -> Self {
        let user = restore(&storage);
        Self { storage, user }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Replace the current user and persist.
    pub fn set_user(&mut self, user: User) -> Result<(), SessionError> {
        tracing::info!(user_id = %user.id, "session user set");
        self.user = Some(user);
        self.persist()
    }

    /// Forget the current user and persist the empty session.
    pub fn clear_user(&mut self) -> Result<(), SessionError> {
        tracing::info!("session user cleared");
        self.user = None;
        self.persist()
    }

    /// Close the store and hand back its storage.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist(&self) -> Result<(), SessionError> {
        let record = PersistedSession {
            user: self.user.clone(),
        };
        let encoded = serde_json::to_string(&record)?;
        self.storage.save(SESSION_STORAGE_KEY, &encoded)?;
        Ok(())
    }
}

fn restore<S: SessionStorage>(storage: &S) -> Option<User> {
    let raw = match storage.load(SESSION_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "session storage unreadable, starting without a session");
            return None;
        }
    };
    match serde_json::from_str::<PersistedSession>(&raw) {
        Ok(record) => record.user,
        Err(e) => {
            tracing::warn!(error = %e, "persisted session is corrupt, starting without a session");
            None
        }
    }
}
