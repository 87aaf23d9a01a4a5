//! Redis settings read from the environment.

use std::env;
use std::time::Duration;

pub const DEFAULT_PREFIX: &str = "campusflow";

/// Connection and key settings for [`crate::RedisCache`].
///
/// | Variable | Default |
/// |----------|---------|
/// | `REDIS_URL` | unset, caching disabled |
/// | `CACHE_TTL_SECONDS` | `300` |
/// | `CACHE_PREFIX` | `campusflow` |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl_seconds: u64,
    pub key_prefix: String,
}

impl CacheConfig {
    /// Returns `None` when `REDIS_URL` is unset or blank, which turns the
    /// cache off for the whole process.
    pub fn from_env() -> Option<Self> {
        let redis_url = env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty())?;
        Some(Self {
            redis_url,
            default_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            key_prefix: env::var("CACHE_PREFIX")
                .ok()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PREFIX.into()),
        })
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_converts_to_duration() {
        let config = CacheConfig {
            redis_url: "redis://127.0.0.1:6379".into(),
            default_ttl_seconds: 45,
            key_prefix: DEFAULT_PREFIX.into(),
        };
        assert_eq!(config.default_ttl(), Duration::from_secs(45));
    }
}
