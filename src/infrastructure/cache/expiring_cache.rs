use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs as async_fs;
use walkdir::WalkDir;

use super::clock::{Clock, SystemClock};

const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache entry '{name}' could not be serialized: {source}")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Freshness policy for cached values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    pub ttl: Duration,
    /// Fraction of `ttl` by which the expiry is randomly moved, in `[0, 1]`
    pub jitter: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(8 * 60 * 60),
            jitter: 0.25,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    cache_expiry: i64,
    object: serde_json::Value,
}

/// Disk backed name -> JSON value store with per-entry expiry.
///
/// Each entry is one file. Concurrent writers of the same name are not
/// coordinated and the last write wins.
#[derive(Clone)]
pub struct ExpiringCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExpiringCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("dir", &self.dir)
            .finish()
    }
}

impl ExpiringCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        let sanitized: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.{}", sanitized, ENTRY_EXTENSION))
    }

    /// Store `value` under `name` for `ttl`, optionally jittered by `± jitter * ttl`.
    ///
    /// Returns the expiry timestamp that was written.
    pub async fn save<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        ttl: Duration,
        jitter: Option<f64>,
    ) -> Result<i64, CacheError> {
        let ttl_secs = ttl.as_secs() as i64;
        let offset = match jitter {
            Some(fraction) if fraction > 0.0 => {
                let fraction = fraction.min(1.0);
                let factor = rand::thread_rng().gen_range(-fraction..=fraction);
                (ttl_secs as f64 * factor).round() as i64
            }
            _ => 0,
        };
        let cache_expiry = self.clock.now() + ttl_secs + offset;

        let object = serde_json::to_value(value).map_err(|source| CacheError::Serialization {
            name: name.to_string(),
            source,
        })?;
        let contents = serde_json::to_vec(&CacheEntry {
            cache_expiry,
            object,
        })
        .map_err(|source| CacheError::Serialization {
            name: name.to_string(),
            source,
        })?;

        async_fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
        let path = self.entry_path(name);
        async_fs::write(&path, contents)
            .await
            .map_err(|source| CacheError::Io {
                path: path.display().to_string(),
                source,
            })?;

        tracing::debug!("Cached '{}' until {}", name, cache_expiry);
        Ok(cache_expiry)
    }

    /// Fetch a value. Missing, expired and unreadable entries all yield `None`.
    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.entry_path(name);
        let contents = async_fs::read(&path).await.ok()?;

        let entry: CacheEntry = match serde_json::from_slice(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry {}: {}", path.display(), e);
                let _ = async_fs::remove_file(&path).await;
                return None;
            }
        };

        if self.clock.now() >= entry.cache_expiry {
            tracing::debug!("Cache entry '{}' expired", name);
            let _ = async_fs::remove_file(&path).await;
            return None;
        }

        match serde_json::from_value(entry.object) {
            Ok(value) => {
                tracing::debug!("Cache hit for '{}'", name);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Cache entry '{}' has an unexpected shape: {}", name, e);
                None
            }
        }
    }

    /// Remove a single entry.
    pub async fn remove(&self, name: &str) -> Result<(), CacheError> {
        let path = self.entry_path(name);
        match async_fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Remove every entry. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let entries: Vec<PathBuf> = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext == ENTRY_EXTENSION)
                    .unwrap_or(false)
            })
            .collect();

        let mut removed = 0;
        for path in entries {
            async_fs::remove_file(&path)
                .await
                .map_err(|source| CacheError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            removed += 1;
        }
        Ok(removed)
    }
}
