// Persistent key-value storage used for small session preferences (GPU tier cache,
// tier override). Backed by a RON map on disk, or held in memory where no
// filesystem exists (wasm) or the file cannot be used.

use std::collections::BTreeMap;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
use std::path::PathBuf;

use bevy::prelude::*;
use thiserror::Error;

use crate::plugins::config::ForgeConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage data malformed: {0}")]
    Malformed(String),
}

/// Minimal string store. Every operation may fail; callers treat failures as a
/// missing value rather than surfacing them.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Default, Debug)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store that always fails, modelling a sandboxed context with storage disabled.
#[derive(Default, Debug)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
    fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
}

/// RON file holding a flat `{ "key": "value" }` map. The whole file is rewritten
/// on every mutation; it only ever holds a handful of entries.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(data) => ron::from_str(&data).map_err(|e| StoreError::Malformed(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let text = ron::ser::to_string_pretty(map, ron::ser::PrettyConfig::default())
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Err(StoreError::Unavailable(format!("no filesystem for {}", self.path.display())))
    }

    #[cfg(target_arch = "wasm32")]
    fn save(&self, _map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(format!("no filesystem for {}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.get(key).cloned())
    }
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        // A malformed file is replaced rather than blocking every later write.
        let mut map = self.load().unwrap_or_default();
        map.insert(key.to_owned(), value.to_owned());
        self.save(&map)
    }
    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}

/// Shared handle to the active store.
#[derive(Resource)]
pub struct PreferenceStore(pub Box<dyn KeyValueStore>);

impl PreferenceStore {
    pub fn memory() -> Self {
        Self(Box::new(MemoryStore::default()))
    }

    /// Read that folds every failure into `None`.
    pub fn read(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            Ok(v) => v,
            Err(e) => {
                warn!("STORE read_failed key={key} error={e}");
                None
            }
        }
    }

    /// Write that logs and swallows failures.
    pub fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.0.set(key, value) {
            warn!("STORE write_failed key={key} error={e}");
        }
    }

    pub fn clear(&mut self, key: &str) {
        if let Err(e) = self.0.remove(key) {
            warn!("STORE remove_failed key={key} error={e}");
        }
    }

    /// File-backed on desktop, memory in the browser.
    pub fn for_platform(path: impl Into<PathBuf>) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self(Box::new(FileStore::new(path)))
        }
        #[cfg(target_arch = "wasm32")]
        {
            let _ = path;
            Self::memory()
        }
    }
}

/// Installs the platform store unless one was inserted already.
pub struct StoragePlugin;
impl Plugin for StoragePlugin {
    fn build(&self, app: &mut App) {
        if app.world().contains_resource::<PreferenceStore>() { return; }
        let store = match app.world().get_resource::<ForgeConfig>() {
            Some(c) => {
                let path = c.resolved_store_path();
                info!("STORE path={}", path.display());
                PreferenceStore::for_platform(path)
            }
            None => PreferenceStore::memory(),
        };
        app.insert_resource(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_values() {
        let mut store = PreferenceStore::memory();
        assert_eq!(store.read("k"), None);
        store.write("k", "mid");
        assert_eq!(store.read("k").as_deref(), Some("mid"));
        store.clear("k");
        assert_eq!(store.read("k"), None);
    }

    #[test]
    fn unavailable_store_reads_as_missing() {
        let mut store = PreferenceStore(Box::new(UnavailableStore));
        store.write("k", "high");
        assert_eq!(store.read("k"), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_store_persists_between_instances() {
        let path = std::env::temp_dir().join(format!("golf_forge_store_{}.ron", uuid::Uuid::new_v4()));
        {
            let mut a = FileStore::new(&path);
            a.set("golf-forge-gpu-tier", "high").unwrap();
        }
        let b = FileStore::new(&path);
        assert_eq!(b.get("golf-forge-gpu-tier").unwrap().as_deref(), Some("high"));
        let _ = std::fs::remove_file(&path);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_store_reports_malformed_contents() {
        let path = std::env::temp_dir().join(format!("golf_forge_bad_{}.ron", uuid::Uuid::new_v4()));
        std::fs::write(&path, "this is not ron {{").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.get("x"), Err(StoreError::Malformed(_))));
        let _ = std::fs::remove_file(&path);
    }
}
