//! Durable key/value storage for credential strings.
//!
//! The session keeps exactly two entries here, under [`ACCESS_KEY`] and
//! [`REFRESH_KEY`]. Backends report failures through `anyhow::Result`; the
//! session decides what to do with them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};

pub const ACCESS_KEY: &str = "access";
pub const REFRESH_KEY: &str = "refresh";

/// Keychain service name
const SERVICE_NAME: &str = "salesdesk";

/// Session file name in the config directory
const SESSION_FILE: &str = "session.json";

/// Which persisted store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Keyring,
    Memory,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// File
// ============================================================================

/// JSON object file holding string entries.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `<dir>/session.json`
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    /// Store at an exact path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if map.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove session file")?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;

        // Tokens are bearer secrets
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking new credentials
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map().unwrap_or_default();
        map.remove(key);
        self.write_map(&map)
    }
}

// ============================================================================
// OS keychain
// ============================================================================

/// Entries in the OS keychain, one per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read credential from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Non-durable store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, as if a previous process had saved `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Open the store backend selected in config.
pub fn open(kind: StoreKind, dir: PathBuf) -> Box<dyn KeyValueStore> {
    match kind {
        StoreKind::File => Box::new(FileStore::new(dir)),
        StoreKind::Keyring => Box::new(KeyringStore::new()),
        StoreKind::Memory => Box::new(MemoryStore::new()),
    }
}
