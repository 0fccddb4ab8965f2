/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration.
//!
//! Hosts either build an [`EngineConfig`] in code or load one from TOML:
//!
//! ```toml
//! views_dir = "views"
//! cache_dir = ".cache/views"
//! suffix = ".view.html"
//! ttl = 3600          # or "mtime" to reuse artifacts only while the source is unchanged
//! compress = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cache::{CachePolicy, DEFAULT_TTL_SECS};
use crate::compiler::DEFAULT_MAX_DEPTH;
use crate::error::{ViewError, ViewResult};
use crate::loader::DEFAULT_SUFFIX;

/// Keyword selecting the exact-mtime cache policy in configuration files.
pub const MTIME_KEYWORD: &str = "mtime";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory view names are resolved against.
    pub views_dir: PathBuf,

    /// Existing directory compiled artifacts are stored in.
    pub cache_dir: PathBuf,

    /// Filename suffix appended to view names.
    pub suffix: String,

    /// Artifact time-to-live in seconds; `None` reuses an artifact only while
    /// the source modification time is unchanged.
    #[serde(
        serialize_with = "serialize_ttl",
        deserialize_with = "deserialize_ttl"
    )]
    pub ttl: Option<i64>,

    /// Collapse whitespace runs in compiled output.
    pub compress: bool,

    /// Maximum include/extends nesting depth.
    pub max_depth: usize,

    /// Overrides the `ENVIRONMENT` process variable for `@env` guards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            views_dir: PathBuf::from("views"),
            cache_dir: PathBuf::from("cache"),
            suffix: DEFAULT_SUFFIX.to_string(),
            ttl: Some(DEFAULT_TTL_SECS as i64),
            compress: false,
            max_depth: DEFAULT_MAX_DEPTH,
            environment: None,
        }
    }
}

impl EngineConfig {
    pub fn new(views_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            views_dir: views_dir.into(),
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML configuration.
    pub fn from_toml_str(source: &str) -> ViewResult<Self> {
        toml::from_str(source).map_err(|e| ViewError::ConfigParse(e.to_string()))
    }

    /// Load a TOML configuration file.
    ///
    /// Relative `views_dir`/`cache_dir` entries are resolved against the
    /// directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> ViewResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&source)?;
        if let Some(base) = path.parent() {
            config.views_dir = base.join(&config.views_dir);
            config.cache_dir = base.join(&config.cache_dir);
        }
        Ok(config)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from_ttl(self.ttl)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TtlSetting {
    Seconds(i64),
    Keyword(String),
}

fn deserialize_ttl<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match TtlSetting::deserialize(deserializer)? {
        TtlSetting::Seconds(secs) => Ok(Some(secs.max(0))),
        TtlSetting::Keyword(keyword) if keyword.eq_ignore_ascii_case(MTIME_KEYWORD) => Ok(None),
        TtlSetting::Keyword(other) => Err(serde::de::Error::custom(format!(
            "invalid ttl \"{other}\": expected a number of seconds or \"{MTIME_KEYWORD}\""
        ))),
    }
}

fn serialize_ttl<S>(ttl: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ttl {
        Some(secs) => serializer.serialize_i64(*secs),
        None => serializer.serialize_str(MTIME_KEYWORD),
    }
}
