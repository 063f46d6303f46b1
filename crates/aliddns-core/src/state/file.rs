// # File State Store
//
// INI-backed implementation of StateStore.
//
// ## File Format
//
// ```ini
// [domain_record]
// id = 1234567890
// value = 1.2.3.4
// time = 1716904860
// ```
//
// `time` is the write time in Unix seconds.
//
// ## Crash Safety
//
// - Atomic writes: the document is written to a sibling `.tmp` file, then renamed
// - Corruption: an unreadable or incomplete document loads as "no cache";
//   the next cycle rebuilds it from a remote describe

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ini::Ini;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{CachedState, StateStore};

/// Section holding the cached record
pub const CACHE_SECTION: &str = "domain_record";

const KEY_ID: &str = "id";
const KEY_VALUE: &str = "value";
const KEY_TIME: &str = "time";

/// File-based record cache
///
/// # Example
///
/// ```rust,no_run
/// use aliddns_core::state::FileStateStore;
/// use aliddns_core::traits::state_store::{CachedState, StateStore};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/aliddns/aliyun_domain_record.ini");
///
///     store.store(&CachedState::new("1234567890", "1.2.3.4")).await?;
///
///     let cached = store.load().await?;
///     assert_eq!(cached.map(|c| c.value), Some("1.2.3.4".to_string()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store for the given cache file
    ///
    /// Nothing is touched on disk until the first `store`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Interpret a cache document
    ///
    /// Returns `None` when the document is not INI, lacks the section, or any
    /// key is missing, empty, or malformed.
    fn parse(content: &str) -> Option<CachedState> {
        let ini = match Ini::load_from_str(content) {
            Ok(ini) => ini,
            Err(e) => {
                tracing::warn!("Cache file is not valid INI: {}", e);
                return None;
            }
        };

        let Some(section) = ini.section(Some(CACHE_SECTION)) else {
            tracing::warn!("Cache file has no [{}] section", CACHE_SECTION);
            return None;
        };

        let field = |key: &str| {
            let value = section.get(key).map(str::trim).filter(|v| !v.is_empty());
            if value.is_none() {
                tracing::warn!("Cache file is missing '{}'", key);
            }
            value
        };

        let record_id = field(KEY_ID)?;
        let value = field(KEY_VALUE)?;
        let raw_time = field(KEY_TIME)?;

        let last_written = match parse_timestamp(raw_time) {
            Some(t) => t,
            None => {
                tracing::warn!("Cache file has an invalid time '{}'", raw_time);
                return None;
            }
        };

        Some(CachedState::at(record_id, value, last_written))
    }

    /// Render a cache document
    fn render(state: &CachedState) -> Result<Vec<u8>, Error> {
        let mut ini = Ini::new();
        ini.with_section(Some(CACHE_SECTION))
            .set(KEY_ID, state.record_id.as_str())
            .set(KEY_VALUE, state.value.as_str())
            .set(KEY_TIME, state.last_written.timestamp().to_string());

        let mut buf = Vec::new();
        ini.write_to(&mut buf)
            .map_err(|e| Error::state_store(format!("Failed to serialize cache: {}", e)))?;
        Ok(buf)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let secs = raw.parse::<i64>().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<CachedState>, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Cache file does not exist: {}", self.path.display());
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::warn!("Cache file {} is not UTF-8: {}", self.path.display(), e);
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read cache file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let state = Self::parse(&content);
        if let Some(ref state) = state {
            tracing::debug!(
                "Loaded cache: record {} = {} (written {})",
                state.record_id,
                state.value,
                state.last_written
            );
        }
        Ok(state)
    }

    async fn store(&self, state: &CachedState) -> Result<(), Error> {
        let bytes = Self::render(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::state_store(format!(
                        "Failed to create cache directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(&bytes).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Cache written to file: {}", self.path.display());
        Ok(())
    }
}
