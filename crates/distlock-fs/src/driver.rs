use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use distlock_core::{DriverError, StorageDriver};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::record::Record;

/// Name of the file whose exclusive lock serializes operations on a node.
const GUARD_FILE: &str = ".guard";

/// Longest encoded key used verbatim as a file name. Leaves room for the
/// `.lock.tmp` suffix under the usual 255-byte name limit.
const MAX_ENCODED_KEY_LEN: usize = 200;

/// Storage node kept in a local directory.
///
/// Layout:
/// ```text
/// {base_dir}/
///   .guard                 advisory lock held for the duration of each operation
///   {urlencoded key}.lock  JSON record {"value": "<hex>", "expires_at": "<RFC 3339>"}
///   #{sha256 of key}.lock  same, for keys too long to encode into a file name
/// ```
///
/// `#` is always percent-encoded, so hashed names never collide with encoded ones.
///
/// Every operation holds an exclusive OS lock on `.guard`, which makes
/// set-if-absent atomic across threads and processes sharing the directory.
/// The process crashing releases the guard; records still expire by TTL.
#[derive(Debug, Clone)]
pub struct FileDriver {
    base_dir: PathBuf,
}

impl FileDriver {
    /// Create a node rooted at `base_dir`. The directory is created on first use.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the path of the record file for a key.
    fn record_path(base_dir: &Path, key: &str) -> PathBuf {
        let encoded = urlencoding::encode(key);
        if encoded.len() <= MAX_ENCODED_KEY_LEN {
            return base_dir.join(format!("{}.lock", encoded));
        }

        let digest = {
            let mut hasher = Sha256::new();
            hasher.update(key.as_bytes());
            hasher.finalize()
        };
        base_dir.join(format!("#{}.lock", hex::encode(digest)))
    }

    /// Run `op` on a blocking thread while holding the node guard.
    async fn guarded<T, F>(&self, op: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, DriverError> + Send + 'static,
    {
        let base_dir = self.base_dir.clone();
        tokio::task::spawn_blocking(move || {
            fs::create_dir_all(&base_dir).map_err(|e| {
                DriverError::Io(format!("Failed to create node dir {}: {}", base_dir.display(), e))
            })?;

            let guard_path = base_dir.join(GUARD_FILE);
            let guard = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&guard_path)
                .map_err(|e| DriverError::Io(format!("Failed to open guard file: {}", e)))?;
            guard
                .lock_exclusive()
                .map_err(|e| DriverError::Io(format!("Failed to lock guard file: {}", e)))?;

            let result = op(&base_dir);

            // Closing the handle releases the lock as well
            if let Err(e) = FileExt::unlock(&guard) {
                warn!("Failed to unlock guard file {}: {}", guard_path.display(), e);
            }
            result
        })
        .await
        .map_err(|e| DriverError::Internal(format!("Node task failed: {}", e)))?
    }
}

/// Read the record at `path`. A missing file is `Ok(None)`.
fn read_record(path: &Path) -> Result<Option<Record>, DriverError> {
    match fs::read(path) {
        Ok(data) => Record::from_json(&data).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DriverError::Io(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write `record` atomically via a temp file.
fn write_record(path: &Path, record: &Record) -> Result<(), DriverError> {
    let temp_path = path.with_extension("lock.tmp");
    fs::write(&temp_path, record.to_json()?).map_err(|e| {
        DriverError::Io(format!("Failed to write {}: {}", temp_path.display(), e))
    })?;
    fs::rename(&temp_path, path).map_err(|e| {
        DriverError::Io(format!("Failed to rename to {}: {}", path.display(), e))
    })
}

fn remove_record(path: &Path) -> Result<(), DriverError> {
    fs::remove_file(path)
        .map_err(|e| DriverError::Io(format!("Failed to remove {}: {}", path.display(), e)))
}

#[async_trait]
impl StorageDriver for FileDriver {
    fn driver_name(&self) -> &'static str {
        "fs"
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), DriverError> {
        let key = key.to_string();
        let value = value.to_vec();
        self.guarded(move |base_dir| {
            let path = Self::record_path(base_dir, &key);
            let now = Utc::now();

            match read_record(&path) {
                Ok(Some(existing)) if existing.is_live(now) => {
                    return Err(DriverError::AlreadyExists(key));
                }
                Ok(Some(_)) => debug!("Overwriting expired record {}", key),
                Ok(None) => {}
                Err(DriverError::Serialization(e)) => {
                    warn!("Overwriting unreadable record {}: {}", key, e);
                }
                Err(e) => return Err(e),
            }

            write_record(&path, &Record::new(&value, ttl, now)?)?;
            debug!("Stored record {} ({} bytes)", key, value.len());
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Bytes, DriverError> {
        let key = key.to_string();
        self.guarded(move |base_dir| {
            let path = Self::record_path(base_dir, &key);
            match read_record(&path)? {
                Some(record) if record.is_live(Utc::now()) => record.decode_value(),
                _ => Err(DriverError::NotFound(key)),
            }
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        let key = key.to_string();
        self.guarded(move |base_dir| {
            let path = Self::record_path(base_dir, &key);
            let live = match read_record(&path) {
                Ok(Some(record)) => record.is_live(Utc::now()),
                Ok(None) => return Err(DriverError::NotFound(key)),
                // Unreadable records are garbage, clear them but report absence
                Err(DriverError::Serialization(_)) => false,
                Err(e) => return Err(e),
            };

            remove_record(&path)?;
            if live {
                debug!("Deleted record {}", key);
                Ok(())
            } else {
                Err(DriverError::NotFound(key))
            }
        })
        .await
    }
}
