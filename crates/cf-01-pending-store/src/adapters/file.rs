use crate::error::KVStoreError;
use crate::ports::outbound::{KeyValueStore, ScanResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed key-value store.
///
/// Keeps the full map in memory and rewrites a JSON file (hex-encoded keys
/// and values) on every mutation. The file is written to a sibling temp file
/// and renamed into place, so a crash never leaves a half-written store.
/// The in-memory map only takes a mutation once its file write succeeded.
pub struct FileBackedKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let data = Self::load_from_file(&path)?;
            info!(
                "[cf-01] 💾 Loaded {} entries from {}",
                data.len(),
                path.display()
            );
            data
        } else {
            info!("[cf-01] 📁 No existing store file at {}", path.display());
            BTreeMap::new()
        };

        Ok(Self { data, path })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_file(path: &Path) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, KVStoreError> {
        let raw = fs::read_to_string(path).map_err(io_error)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let encoded: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| KVStoreError::Corruption {
                message: e.to_string(),
            })?;

        encoded
            .into_iter()
            .map(|(k, v)| -> Result<_, KVStoreError> { Ok((decode_hex(&k)?, decode_hex(&v)?)) })
            .collect()
    }

    fn persist(&self, data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), KVStoreError> {
        let encoded: BTreeMap<String, String> = data
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();
        let json = serde_json::to_vec_pretty(&encoded).map_err(|e| KVStoreError::Io {
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        // Write atomically via temp file
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(io_error)?;
        file.write_all(&json).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)?;

        debug!(
            "[cf-01] Flushed {} entries to {}",
            data.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> KVStoreError {
    KVStoreError::Io {
        message: e.to_string(),
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, KVStoreError> {
    hex::decode(value).map_err(|e| KVStoreError::Corruption {
        message: e.to_string(),
    })
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let mut next = self.data.clone();
        next.insert(key.to_vec(), value.to_vec());
        self.persist(&next)?;
        self.data = next;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        if !self.data.contains_key(key) {
            return Ok(());
        }
        let mut next = self.data.clone();
        next.remove(key);
        self.persist(&next)?;
        self.data = next;
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
