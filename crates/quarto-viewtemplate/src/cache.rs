/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! On-disk cache of compiled artifacts.
//!
//! Artifacts are stored one file per view under a single directory. The file
//! name is derived from the absolute source path, never from its content,
//! so the cache cannot tell by itself whether an artifact is stale. That
//! decision belongs to [`CachePolicy`].
//!
//! ```text
//! <cache_dir>/
//! ├── 3f1c…9a.ejs   // sha256("/app/views/home.view.html")
//! └── 88b0…e2.ejs
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ViewError, ViewResult};

/// File extension of stored artifacts.
pub const ARTIFACT_EXTENSION: &str = "ejs";

/// Default time-to-live of a cached artifact: one day.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Derive the cache key for a view source path.
///
/// The key is the hex SHA-256 of the path's string form plus the artifact
/// extension, so the same path always maps to the same key.
pub fn cache_key(source_path: &Path) -> String {
    let digest = Sha256::digest(source_path.to_string_lossy().as_bytes());
    format!("{}.{ARTIFACT_EXTENSION}", hex::encode(digest))
}

/// Compiled code for one view plus the key it is cached under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub key: String,
    pub code: String,
}

impl Artifact {
    pub fn new(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
        }
    }
}

/// Decides whether a cached artifact may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Valid only while the source's modification time equals the
    /// artifact's write time, to the second. No grace period.
    ExactMtime,
    /// Valid until `ttl` has elapsed since the artifact was written, whether
    /// or not the source has changed in the meantime.
    Ttl(Duration),
}

impl CachePolicy {
    /// Build a policy from a host TTL setting in seconds.
    ///
    /// `None` selects [`CachePolicy::ExactMtime`]; negative values clamp to
    /// zero.
    pub fn from_ttl(ttl: Option<i64>) -> Self {
        match ttl {
            None => CachePolicy::ExactMtime,
            Some(secs) => CachePolicy::Ttl(Duration::from_secs(secs.max(0).unsigned_abs())),
        }
    }

    /// The TTL in seconds, or `None` for the exact-mtime policy.
    pub fn ttl_secs(&self) -> Option<u64> {
        match self {
            CachePolicy::ExactMtime => None,
            CachePolicy::Ttl(ttl) => Some(ttl.as_secs()),
        }
    }

    /// Whether an artifact written at `written_at` is still valid.
    pub fn is_valid(
        &self,
        written_at: SystemTime,
        source_modified: SystemTime,
        now: SystemTime,
    ) -> bool {
        match self {
            CachePolicy::ExactMtime => unix_secs(source_modified) == unix_secs(written_at),
            CachePolicy::Ttl(ttl) => unix_secs(written_at).saturating_add(ttl.as_secs()) > unix_secs(now),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Ttl(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

/// Whole seconds since the epoch; pre-epoch times count as zero.
fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Path-keyed artifact storage.
///
/// Every operation fails with [`ViewError::Configuration`] until a storage
/// directory has been set.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCache {
    dir: Option<PathBuf>,
}

impl ArtifactCache {
    /// Create a cache stored in `dir`, which must already exist.
    pub fn new(dir: impl AsRef<Path>) -> ViewResult<Self> {
        let mut cache = Self::default();
        cache.set_dir(dir)?;
        Ok(cache)
    }

    /// Set the storage directory.
    pub fn set_dir(&mut self, dir: impl AsRef<Path>) -> ViewResult<()> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ViewError::configuration(format!(
                "an existing directory must be specified for the view cache (got {})",
                dir.display()
            )));
        }
        self.dir = Some(dir.to_path_buf());
        Ok(())
    }

    pub fn dir(&self) -> ViewResult<&Path> {
        self.dir.as_deref().ok_or_else(|| {
            ViewError::configuration("an existing directory must be specified for the view cache")
        })
    }

    /// Where the artifact for `key` is (or would be) stored.
    pub fn artifact_path(&self, key: &str) -> ViewResult<PathBuf> {
        let key = key.trim_start_matches(['/', std::path::MAIN_SEPARATOR]);
        Ok(self.dir()?.join(key))
    }

    pub fn has(&self, key: &str) -> ViewResult<bool> {
        Ok(self.artifact_path(key)?.is_file())
    }

    /// Modification time of the stored artifact, or `None` if there is none.
    pub fn last_write_time(&self, key: &str) -> ViewResult<Option<SystemTime>> {
        let path = self.artifact_path(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn read(&self, key: &str) -> ViewResult<String> {
        Ok(fs::read_to_string(self.artifact_path(key)?)?)
    }

    /// Store `code` under `key`.
    ///
    /// Returns `Ok(false)` when the file could not be written; only a missing
    /// configuration is an error.
    pub fn write(&self, key: &str, code: &str) -> ViewResult<bool> {
        let path = self.artifact_path(key)?;
        match fs::write(&path, code) {
            Ok(()) => {
                debug!(path = %path.display(), "wrote cached artifact");
                Ok(true)
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "failed to write cached artifact");
                Ok(false)
            }
        }
    }

    /// Set the artifact's modification time.
    ///
    /// Used under [`CachePolicy::ExactMtime`] to tie the artifact to the
    /// source revision it was compiled from.
    pub fn stamp(&self, key: &str, modified: SystemTime) -> ViewResult<()> {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(self.artifact_path(key)?)?;
        file.set_modified(modified)?;
        Ok(())
    }

    /// Remove the artifact for `key`. Returns whether a file was removed.
    pub fn delete(&self, key: &str) -> ViewResult<bool> {
        let path = self.artifact_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "failed to delete cached artifact");
                Ok(false)
            }
        }
    }

    /// Remove every stored artifact. Returns how many were removed.
    pub fn clear(&self) -> ViewResult<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(self.dir()?)? {
            let path = entry?.path();
            let is_artifact = path
                .extension()
                .is_some_and(|ext| ext == ARTIFACT_EXTENSION);
            if is_artifact && path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
