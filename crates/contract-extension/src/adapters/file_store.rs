//! # JSON File Store
//!
//! Persists the registry as one JSON object keyed by management contract
//! address. Writes go to a sibling temp file which is renamed over the
//! target, all under an exclusive `fs2` lock on a `.lock` file.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use shared_types::Address;
use tracing::debug;

use crate::domain::{ExtensionError, ExtensionRecord, ExtensionResult};
use crate::ports::ExtensionStore;

/// Registry store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`. The parent directory is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn acquire_lock(&self) -> io::Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.sibling(".lock"))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn write_snapshot(&self, json: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Released when dropped, after the rename.
        let _lock = self.acquire_lock()?;
        let tmp = self.sibling(".tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

fn persistence(context: &str, path: &Path, e: impl std::fmt::Display) -> ExtensionError {
    ExtensionError::Persistence(format!("{context} {}: {e}", path.display()))
}

impl ExtensionStore for JsonFileStore {
    fn load(&self) -> ExtensionResult<HashMap<Address, ExtensionRecord>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "[qc-ext] No registry file, starting empty");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(persistence("failed to read", &self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| persistence("failed to parse", &self.path, e))
    }

    fn save(&self, contracts: &HashMap<Address, ExtensionRecord>) -> ExtensionResult<()> {
        let ordered: BTreeMap<&Address, &ExtensionRecord> = contracts.iter().collect();
        let json = serde_json::to_vec_pretty(&ordered)
            .map_err(|e| persistence("failed to encode", &self.path, e))?;

        self.write_snapshot(&json)
            .map_err(|e| persistence("failed to write", &self.path, e))?;

        debug!(
            path = %self.path.display(),
            records = contracts.len(),
            "[qc-ext] Registry saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::EncryptedPayloadHash;
    use tempfile::TempDir;

    fn record(address: u8) -> ExtensionRecord {
        ExtensionRecord {
            management_contract_address: Address([address; 20]),
            target_contract_address: Address([0xaa; 20]),
            initiator: Address([0xbb; 20]),
            creation_payload: EncryptedPayloadHash([address; 64]),
        }
    }

    fn snapshot(records: &[ExtensionRecord]) -> HashMap<Address, ExtensionRecord> {
        records
            .iter()
            .map(|r| (r.management_contract_address, r.clone()))
            .collect()
    }

    #[test]
    fn test_missing_file_is_empty_registry() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("activeExtensions.json"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("activeExtensions.json"));
        let contracts = snapshot(&[record(1), record(2)]);

        store.save(&contracts).unwrap();

        assert_eq!(store.load().unwrap(), contracts);
        assert!(!dir.path().join("activeExtensions.json.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/state/activeExtensions.json"));

        store.save(&snapshot(&[record(1)])).unwrap();

        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("activeExtensions.json"));

        store.save(&snapshot(&[record(1), record(2)])).unwrap();
        store.save(&snapshot(&[record(2)])).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&Address([2u8; 20])));
    }

    #[test]
    fn test_lock_released_after_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activeExtensions.json");
        JsonFileStore::new(&path).save(&snapshot(&[record(1)])).unwrap();

        let lock = File::open(dir.path().join("activeExtensions.json.lock")).unwrap();
        lock.try_lock_exclusive().unwrap();
    }

    #[test]
    fn test_file_is_keyed_by_address() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activeExtensions.json");
        JsonFileStore::new(&path).save(&snapshot(&[record(1)])).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let entry = &json[Address([1u8; 20]).to_string()];
        assert_eq!(entry["targetContractAddress"], Address([0xaa; 20]).to_string());
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activeExtensions.json");
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(ExtensionError::Persistence(_))
        ));
    }
}
