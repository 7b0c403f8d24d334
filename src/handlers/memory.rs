//! Key/value memory persisted as a pretty-printed JSON object.
//!
//! Keys are case-insensitive (stored lower-cased). Replies quote the key as
//! the user typed it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use super::MemoryStore;
use crate::error::{AssistantError, Result};

/// Memory store. With no path it lives only as long as the process.
#[derive(Debug)]
pub struct JsonMemoryStore {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonMemoryStore {
    /// Open the store, loading `path` when it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let entries = match &path {
            Some(p) if p.exists() => load(p)?,
            _ => BTreeMap::new(),
        };
        if let Some(p) = &path {
            debug!(path = %p.display(), count = entries.len(), "memory store opened");
        }
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| AssistantError::Memory(format!("cannot serialize memory: {e}")))?;
        write_atomic(path, &json)
    }
}

impl MemoryStore for JsonMemoryStore {
    fn remember(&self, key: &str, value: &str) -> Result<String> {
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            return Ok(
                "I need both a topic (key) and the information (value) to remember.".to_owned(),
            );
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut updated = entries.clone();
        updated.insert(key.to_lowercase(), value.to_owned());
        self.save(&updated)?;
        *entries = updated;
        info!(key = %key.to_lowercase(), "remembered");
        Ok(format!(
            "Okay, I've remembered that '{key}' is '{value}'. You can ask me to recall it later."
        ))
    }

    fn recall(&self, key: &str) -> Result<String> {
        let key = key.trim();
        if key.is_empty() {
            return Ok("What topic do you want me to recall?".to_owned());
        }
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(match entries.get(&key.to_lowercase()) {
            Some(value) => format!("I remember that '{key}' is '{value}'."),
            None => format!("I'm sorry, I don't have any information stored for '{key}'."),
        })
    }

    fn forget(&self, key: &str) -> Result<String> {
        let key = key.trim();
        if key.is_empty() {
            return Ok("What topic do you want me to forget?".to_owned());
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut updated = entries.clone();
        if updated.remove(&key.to_lowercase()).is_none() {
            return Ok(format!(
                "I don't have any information stored for '{key}', so there is nothing to forget."
            ));
        }
        self.save(&updated)?;
        *entries = updated;
        info!(key = %key.to_lowercase(), "forgotten");
        Ok(format!("Okay, I have forgotten the information about '{key}'."))
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, String>> {
    let bytes = std::fs::read(path)
        .map_err(|e| AssistantError::Memory(format!("cannot read {}: {e}", path.display())))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| AssistantError::Memory(format!("cannot parse {}: {e}", path.display())))
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("memory"),
        std::process::id()
    );
    let tmp_path = path
        .parent()
        .map(|p| p.join(&tmp_name))
        .unwrap_or_else(|| PathBuf::from(&tmp_name));
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
