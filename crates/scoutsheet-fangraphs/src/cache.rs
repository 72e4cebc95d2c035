// On-disk cache of raw fetch payloads plus a "last fetched" timestamp.
//
// One JSON file per request key. `last_fetched.txt` holds the time of the
// most recent successful network fetch and decides whether cached payloads
// are fresh enough to reuse.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{FetchError, ProjectionProvider};
use crate::request::Request;

pub const LAST_FETCHED_FILE: &str = "last_fetched.txt";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("cached payload {path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FetchCache {
    dir: PathBuf,
    refresh_days: u32,
}

impl FetchCache {
    pub fn new(dir: impl Into<PathBuf>, refresh_days: u32) -> Self {
        Self {
            dir: dir.into(),
            refresh_days,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn stamp_path(&self) -> PathBuf {
        self.dir.join(LAST_FETCHED_FILE)
    }

    /// Time of the last successful fetch. A missing, empty or unparsable
    /// stamp file reads as "never".
    pub fn last_fetched(&self) -> Option<NaiveDateTime> {
        let text = std::fs::read_to_string(self.stamp_path()).ok()?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
            Ok(ts) => Some(ts),
            Err(e) => {
                warn!("ignoring unreadable {}: {}", LAST_FETCHED_FILE, e);
                None
            }
        }
    }

    /// Whether cached payloads are stale as of `now`.
    pub fn needs_refresh(&self, now: NaiveDateTime) -> bool {
        match self.last_fetched() {
            Some(last) => now - last >= Duration::days(i64::from(self.refresh_days)),
            None => true,
        }
    }

    pub fn mark_fetched(&self, now: NaiveDateTime) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let path = self.stamp_path();
        std::fs::write(&path, now.format(TIMESTAMP_FORMAT).to_string())
            .map_err(|e| io_error(&path, e))
    }

    /// Cached payload for `key`, or `None` if nothing is cached.
    pub fn load(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.payload_path(key);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| CacheError::Json {
                path: path.display().to_string(),
                source,
            })
    }

    pub fn store(&self, key: &str, payload: &Value) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let path = self.payload_path(key);
        let text = serde_json::to_string(payload).map_err(|source| CacheError::Json {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, text).map_err(|e| io_error(&path, e))
    }

    fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// A provider fronted by the payload cache.
///
/// With `prefer_cache` set, cached payloads are returned without touching the
/// network; a request with no cached payload still goes to the provider.
/// Every network payload is written back to the cache and bumps the stamp.
/// Cache write failures are logged, never fatal.
pub struct Fetcher {
    provider: Box<dyn ProjectionProvider>,
    cache: Option<FetchCache>,
    prefer_cache: bool,
}

impl Fetcher {
    pub fn new(provider: Box<dyn ProjectionProvider>) -> Self {
        Self {
            provider,
            cache: None,
            prefer_cache: false,
        }
    }

    pub fn with_cache(mut self, cache: FetchCache, prefer_cache: bool) -> Self {
        self.cache = Some(cache);
        self.prefer_cache = prefer_cache;
        self
    }

    pub async fn get(&self, request: &Request) -> Result<Value, FetchError> {
        let key = request.cache_key();

        if let (Some(cache), true) = (&self.cache, self.prefer_cache) {
            match cache.load(&key) {
                Ok(Some(payload)) => {
                    debug!("using cached {}", key);
                    return Ok(payload);
                }
                Ok(None) => info!("no cached {}, fetching", key),
                Err(e) => warn!("{}, fetching", e),
            }
        }

        let payload = self.provider.fetch(request).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&key, &payload) {
                warn!("failed to cache {}: {}", key, e);
            }
            let now = chrono::Local::now().naive_local();
            if let Err(e) = cache.mark_fetched(now) {
                warn!("failed to update {}: {}", LAST_FETCHED_FILE, e);
            }
        }
        Ok(payload)
    }
}
