//! Redis-backed JSON cache.
//!
//! Keys handed to [`RedisCache`] are relative (`tenant:host:riverdale.edu`);
//! the configured prefix is prepended on every call.

use redis::{AsyncCommands, Client, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::config::CacheConfig;

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: String,
    default_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RedisCache {
    /// Connects and verifies the server answers `PING`.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        let cache = Self {
            conn,
            prefix: config.key_prefix.clone(),
            default_ttl: config.default_ttl(),
        };
        cache.ping().await?;
        Ok(cache)
    }

    /// TTL from `CACHE_TTL_SECONDS`, for callers without their own.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn prefixed(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Reads and decodes a value. Errors are logged and read as a miss.
    #[instrument(skip(self), fields(cache.operation = "GET"))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let key = self.prefixed(key);
        let mut conn = self.conn.clone();

        let raw = match conn.get::<_, Option<String>>(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(cache.key = %key, error = %e, "Redis GET failed");
                return None;
            }
        };

        let Some(raw) = raw else {
            debug!(cache.key = %key, "miss");
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(cache.key = %key, "hit");
                Some(value)
            }
            Err(e) => {
                error!(cache.key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    #[instrument(skip(self, value), fields(cache.operation = "SETEX"))]
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = self.prefixed(key);
        let json = serde_json::to_string(value)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(&key, json, ttl.as_secs().max(1))
            .await?;
        debug!(cache.key = %key, cache.ttl_secs = ttl.as_secs(), "stored");
        Ok(())
    }

    /// Cache-aside lookup.
    ///
    /// On a miss `load` runs and a `Some` result is stored with `ttl`. A
    /// failed store is logged; the loaded value is still returned.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(Some(hit));
        }
        let loaded = load().await?;
        if let Some(value) = &loaded
            && let Err(e) = self.set_with_ttl(key, value, ttl).await
        {
            error!(cache.key = %key, error = %e, "Failed to populate cache");
        }
        Ok(loaded)
    }

    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let key = self.prefixed(key);
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key).await?;
        Ok(())
    }

    /// Deletes every key matching a relative glob pattern, walking the
    /// keyspace with `SCAN`. Returns the number of keys removed.
    #[instrument(skip(self), fields(cache.operation = "SCAN_DEL"))]
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let pattern = self.prefixed(pattern);
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                deleted += conn.del::<_, u64>(&keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(cache.pattern = %pattern, cache.deleted = deleted, "pattern invalidated");
        Ok(deleted)
    }

    pub async fn exists(&self, key: &str) -> bool {
        let key = self.prefixed(key);
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(&key).await.unwrap_or_else(|e| {
            error!(cache.key = %key, error = %e, "Redis EXISTS failed");
            false
        })
    }

    /// Remaining lifetime in seconds; `None` for missing or non-expiring keys.
    pub async fn ttl(&self, key: &str) -> Option<i64> {
        let key = self.prefixed(key);
        let mut conn = self.conn.clone();
        match conn.ttl::<_, i64>(&key).await {
            Ok(secs) if secs > 0 => Some(secs),
            Ok(_) => None,
            Err(e) => {
                error!(cache.key = %key, error = %e, "Redis TTL failed");
                None
            }
        }
    }
}
