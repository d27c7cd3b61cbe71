use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, Value>,
}

/// Small durable key-value store backed by one JSON file. Without a path
/// (no home directory) reads come back empty and writes are dropped.
#[derive(Debug, Clone)]
pub struct KvStore {
    path: Option<PathBuf>,
}

impl KvStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn ephemeral() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let file = self.load()?;
        let value = file.entries.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!("ignoring unreadable '{key}' entry: {err}");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).with_context(|| format!("serialize {key}"))?;
        self.write_with(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.write_with(|entries| {
            entries.remove(key);
        })
    }

    fn load(&self) -> Option<StoreFile> {
        let path = self.path.as_ref()?;
        let raw = fs::read_to_string(path).ok()?;
        let file = serde_json::from_str::<StoreFile>(&raw).ok()?;
        if file.version != STORE_VERSION {
            return None;
        }
        Some(file)
    }

    fn write_with(&self, mutate: impl FnOnce(&mut BTreeMap<String, Value>)) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create state dir {}", dir.display()))?;
        }
        let mut file = self.load().unwrap_or_default();
        file.version = STORE_VERSION;
        mutate(&mut file.entries);

        let json = serde_json::to_string_pretty(&file).context("serialize state file")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write state file")?;
        fs::rename(&tmp, path).context("swap state file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = KvStore::at(dir.path().join("nested").join("state.json"));
        assert_eq!(store.get::<String>("theme"), None);

        store.set("theme", &"dark").expect("set theme");
        store.set("other", &vec![1, 2, 3]).expect("set other");
        assert_eq!(store.get::<String>("theme").as_deref(), Some("dark"));

        store.remove("theme").expect("remove theme");
        assert_eq!(store.get::<String>("theme"), None);
        assert_eq!(store.get::<Vec<u32>>("other"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn corrupt_or_foreign_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").expect("write");
        let store = KvStore::at(&path);
        assert_eq!(store.get::<String>("theme"), None);

        fs::write(&path, r#"{"version":99,"entries":{"theme":"dark"}}"#).expect("write");
        assert_eq!(store.get::<String>("theme"), None);

        store.set("theme", &"light").expect("overwrite");
        assert_eq!(store.get::<String>("theme").as_deref(), Some("light"));
    }

    #[test]
    fn ephemeral_store_drops_writes() {
        let store = KvStore::ephemeral();
        store.set("theme", &"dark").expect("no-op");
        assert_eq!(store.get::<String>("theme"), None);
    }
}
