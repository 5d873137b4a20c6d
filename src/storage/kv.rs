use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::{fs, path::PathBuf, sync::RwLock};

/// JSON-file-backed key-value store standing in for the device's local
/// storage. Values are read once at open and written through on every
/// mutation.
pub struct KvStore {
    path: PathBuf,
    data: RwLock<Map<String, Value>>,
}

impl KvStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read store at {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let guard = self.data.read().unwrap();
        match guard.get(key) {
            Some(value) => {
                let parsed = serde_json::from_value(value.clone())
                    .with_context(|| format!("malformed value under key {key}"))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let serialized = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize value for key {key}"))?;
        let mut guard = self.data.write().unwrap();
        guard.insert(key.to_string(), serialized);
        self.persist(&guard)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        if guard.remove(key).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &Map<String, Value>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write store to {}", self.path.display()))
    }
}
