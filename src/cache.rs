//! On-disk and in-memory cache of per-translation-unit analysis results.
//!
//! A [`SerializedTu`] captures everything the pipeline needs to fold a
//! previously analyzed translation unit back into the global solver without
//! re-running the C/C++ parser or the constraint generator: the per-TU
//! solver's assertions in SMT-LIB 2 text form, plus the list of assumption
//! labels that were asserted against it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// A serialized snapshot of one translation unit's analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedTu {
    #[serde(rename = "SerializationTime")]
    pub serialization_time: i64,
    #[serde(rename = "Assertions")]
    pub assertions: Vec<String>,
    #[serde(rename = "Solver")]
    pub solver: String,
    /// The TU's source file path. Not part of the on-disk JSON (it's
    /// implied by the cache filename); filled in on load.
    #[serde(skip)]
    pub spelling: String,
}

impl SerializedTu {
    /// An empty record for a file that was never cached, or whose cache
    /// entry could not be read. `serialization_time == 0` is always stale.
    fn empty(spelling: impl Into<String>) -> Self {
        SerializedTu { serialization_time: 0, assertions: Vec::new(), solver: String::new(), spelling: spelling.into() }
    }

    /// Builds a fresh record from a just-completed analysis, stamped with
    /// the current time.
    pub fn new(spelling: impl Into<String>, solver_smt2: String, assertion_labels: Vec<String>) -> Self {
        let serialization_time = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0);
        SerializedTu { serialization_time, assertions: assertion_labels, solver: solver_smt2, spelling: spelling.into() }
    }
}

/// Maps an absolute TU file path to the filename its cache entry lives
/// under, stable across runs (`/` can't appear in a filename).
fn cache_key(file_path: &str) -> String {
    file_path.replace('/', "_")
}

/// Holds the in-memory half of the cache and knows how to fall through to
/// an optional on-disk directory. One instance is shared (behind a mutex)
/// by the pipeline driver; each worker thread calls into it independently.
pub struct TuCache {
    memory: Mutex<HashMap<String, SerializedTu>>,
    disk_dir: Option<PathBuf>,
}

impl TuCache {
    pub fn new(disk_dir: Option<PathBuf>) -> Self {
        TuCache { memory: Mutex::new(HashMap::new()), disk_dir }
    }

    /// Returns a still-fresh cached record for `file_path`, if one exists
    /// in memory or on disk and is at least as new as the file's last
    /// modification time. `None` means the TU must be (re)parsed.
    pub fn get_stored(&self, file_path: &Path) -> Option<SerializedTu> {
        let modified_time = std::fs::metadata(file_path).and_then(|m| m.modified()).ok()?;
        let modified_time = modified_time.duration_since(UNIX_EPOCH).ok()?.as_secs() as i64;

        let path_str = file_path.to_string_lossy().into_owned();
        let key = cache_key(&path_str);

        if let Some(stu) = self.memory.lock().unwrap().get(&key).cloned() {
            if stu.serialization_time >= modified_time {
                tracing::info!(%key, "using in-memory cache");
                return Some(stu);
            }
            tracing::info!(%key, "in-memory cache entry is stale");
        } else {
            tracing::info!(%key, "no in-memory cache entry");
        }

        let dir = self.disk_dir.as_ref()?;
        let stu = self.read_from_disk(dir, &path_str);
        if stu.serialization_time >= modified_time {
            tracing::info!(path = %path_str, "using cached analysis from disk");
            self.save_to_memory(stu.clone());
            Some(stu)
        } else {
            None
        }
    }

    /// Loads a cache file if present; any I/O or parse failure yields an
    /// empty (always-stale) record rather than propagating an error, since
    /// a missing or corrupt cache simply means the TU gets reparsed.
    fn read_from_disk(&self, dir: &Path, file_path: &str) -> SerializedTu {
        let path = dir.join(format!("{}.json", cache_key(file_path)));
        match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<SerializedTu>(&bytes) {
                Ok(mut stu) => {
                    stu.spelling = file_path.to_string();
                    stu
                }
                Err(err) => {
                    tracing::warn!(?path, %err, "malformed cache entry, ignoring");
                    SerializedTu::empty(file_path)
                }
            },
            Err(_) => SerializedTu::empty(file_path),
        }
    }

    /// Stores `stu` in the in-memory cache, keyed by its own spelling.
    pub fn save_to_memory(&self, stu: SerializedTu) {
        let key = cache_key(&stu.spelling);
        tracing::info!(%key, "writing to in-memory cache");
        self.memory.lock().unwrap().insert(key, stu);
    }

    /// Writes `stu` to the on-disk cache directory, if one is configured.
    /// A no-op when no cache directory was given.
    pub fn write_to_disk(&self, stu: &SerializedTu) -> Result<(), CacheError> {
        let Some(dir) = &self.disk_dir else { return Ok(()) };
        std::fs::create_dir_all(dir).map_err(|source| CacheError::CreateDir { path: dir.clone(), source })?;
        let path = dir.join(format!("{}.json", cache_key(&stu.spelling)));
        let body = serde_json::to_vec(stu).map_err(|source| CacheError::Serialize { path: path.clone(), source })?;
        std::fs::write(&path, body).map_err(|source| CacheError::Write { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_replaces_slashes() {
        assert_eq!(cache_key("/home/user/src/a.cpp"), "_home_user_src_a.cpp");
    }

    #[test]
    fn empty_record_is_always_stale() {
        let stu = SerializedTu::empty("x.cpp");
        assert_eq!(stu.serialization_time, 0);
        assert!(stu.assertions.is_empty());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TuCache::new(Some(dir.path().to_path_buf()));
        let src = tempfile::NamedTempFile::new().unwrap();
        let path = src.path().to_path_buf();
        let path_str = path.to_string_lossy().into_owned();

        let stu = SerializedTu::new(path_str.clone(), "(set-logic ALL)".to_string(), vec!["label 0".to_string()]);
        cache.write_to_disk(&stu).unwrap();

        let fresh_cache = TuCache::new(Some(dir.path().to_path_buf()));
        let reloaded = fresh_cache.get_stored(&path).expect("cache hit");
        assert_eq!(reloaded.solver, "(set-logic ALL)");
        assert_eq!(reloaded.assertions, vec!["label 0".to_string()]);
    }

    #[test]
    fn missing_entry_yields_no_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TuCache::new(Some(dir.path().to_path_buf()));
        let src = tempfile::NamedTempFile::new().unwrap();
        assert!(cache.get_stored(src.path()).is_none());
    }
}
