//! File-based cache for enhancement results.
//!
//! The cache is a single JSON object mapping a source-file fingerprint to
//! the name of the enhanced artifact produced from it. A re-run on an
//! unchanged source can then reuse the expensive enhancement output even
//! when intermediate files were moved or deleted.
//!
//! Reads are forgiving: a missing or corrupt cache file behaves like an
//! empty one. Writes replace the whole file atomically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::{StepError, StepResult};

/// Default cache file name, created next to each source file.
pub const DEFAULT_CACHE_FILE: &str = ".scriba_cache.json";

/// Fingerprint a file as `name|size|mtime`.
///
/// mtime is whole seconds since the Unix epoch. Any edit to the file
/// changes its size or mtime, so equal keys mean "unchanged since the
/// key was recorded". No content hashing involved.
pub fn file_key(path: &Path) -> StepResult<String> {
    let meta = fs::metadata(path)
        .map_err(|e| StepError::io_error(format!("stat {}", path.display()), e))?;
    let mtime = meta
        .modified()
        .map_err(|e| StepError::io_error(format!("mtime of {}", path.display()), e))?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(format!("{}|{}|{}", name, meta.len(), mtime))
}

/// Handle on a fingerprint-keyed JSON cache file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_path: PathBuf,
}

impl CacheStore {
    /// Create a store for the given cache file path.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }

    /// Get the cache file path.
    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Load the full mapping. Never fails: a missing, unreadable, or
    /// corrupt cache file yields an empty mapping.
    pub fn load(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.cache_path) {
            Ok(content) => content,
            Err(_) => return Map::new(),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            _ => {
                debug!(
                    "cache file {} is corrupt, starting with an empty cache",
                    self.cache_path.display()
                );
                Map::new()
            }
        }
    }

    /// Persist the full mapping, replacing the cache file atomically.
    pub fn save(&self, entries: &Map<String, Value>) -> StepResult<()> {
        let content = serde_json::to_string_pretty(&Value::Object(entries.clone()))
            .map_err(|e| StepError::parse_error("cache mapping", e.to_string()))?;
        self.atomic_write(&content)
    }

    /// Look up the recorded artifact file name for a fingerprint.
    pub fn lookup_output(&self, key: &str) -> Option<String> {
        self.load()
            .get(key)?
            .get("output")?
            .as_str()
            .map(|s| s.to_string())
    }

    /// Record `output` as the artifact for `key` (read-modify-write).
    pub fn record_output(&self, key: &str, output: &str) -> StepResult<()> {
        let mut entries = self.load();
        entries.insert(key.to_string(), json!({ "output": output }));
        self.save(&entries)
    }

    /// Write content to the cache file via a same-directory temp file,
    /// then rename.
    fn atomic_write(&self, content: &str) -> StepResult<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StepError::io_error(format!("create {}", parent.display()), e))?;
        }

        let temp_path = self.cache_path.with_extension("json.tmp");

        {
            let mut file = fs::File::create(&temp_path)
                .map_err(|e| StepError::io_error(format!("create {}", temp_path.display()), e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| StepError::io_error(format!("write {}", temp_path.display()), e))?;
            file.sync_all()
                .map_err(|e| StepError::io_error(format!("sync {}", temp_path.display()), e))?;
        }

        fs::rename(&temp_path, &self.cache_path).map_err(|e| {
            StepError::io_error(format!("rename into {}", self.cache_path.display()), e)
        })?;

        Ok(())
    }
}
