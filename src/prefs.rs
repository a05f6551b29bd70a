//! Persisted preferences.
//!
//! Two flags survive across sessions: sound effects on/off and music
//! on/off. They are stored as `"true"`/`"false"` strings and default to
//! true whenever absent or unreadable - a broken config file must never
//! mute the game permanently or crash it.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub const SOUND_KEY: &str = "sound-enabled";
pub const MUSIC_KEY: &str = "music-enabled";

/// A string key-value store. Writes are best-effort: a failed write is
/// logged and swallowed, the in-memory value still wins for the session.
pub trait PrefStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// Read a boolean flag, defaulting to true when absent or malformed.
pub fn flag(store: &dyn PrefStore, key: &str) -> bool {
    match store.get(key).as_deref() {
        Some("false") => false,
        Some("true") | None => true,
        Some(other) => {
            log::warn!("preference `{key}` has unexpected value `{other}`; defaulting to true");
            true
        }
    }
}

pub fn set_flag(store: &mut dyn PrefStore, key: &str, value: bool) {
    store.set(key, if value { "true" } else { "false" });
}

/// In-memory store for tests and hosts without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// `key=value` lines in a file under the user's config directory.
/// Unparseable lines are skipped on load.
pub struct FilePrefs {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FilePrefs {
    /// Open (or create the directory for) the default preference file.
    /// Returns None when no user config directory exists on this
    /// platform; callers fall back to a [`MemoryStore`].
    pub fn open_default() -> Option<Self> {
        let dir = dirs::config_dir()?.join("serpentone");
        Some(Self::open(dir.join("prefs")))
    }

    pub fn open(path: PathBuf) -> Self {
        let mut values = HashMap::new();
        if let Ok(text) = fs::read_to_string(&path) {
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match line.split_once('=') {
                    Some((key, value)) => {
                        values.insert(key.trim().to_string(), value.trim().to_string());
                    }
                    None => log::warn!("skipping malformed preference line `{line}`"),
                }
            }
        }
        Self { path, values }
    }

    fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("cannot create preference directory: {e}");
                return;
            }
        }
        let mut text = String::new();
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        for key in keys {
            text.push_str(key);
            text.push('=');
            text.push_str(&self.values[key]);
            text.push('\n');
        }
        if let Err(e) = fs::write(&self.path, text) {
            log::warn!("cannot write preferences: {e}");
        }
    }
}

impl PrefStore for FilePrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_string(), value.to_string());
        self.save();
    }
}
