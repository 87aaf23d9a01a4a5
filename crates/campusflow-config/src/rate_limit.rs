//! Token bucket limits for the API.
//!
//! Two buckets exist per client IP: a general one for every `/api` route and
//! a stricter one for `/api/auth` (login, signup, password reset). Buckets
//! refill one request every `*_PER_SECOND` seconds, the tower_governor
//! convention, so a larger value is a slower refill.
//!
//! - `RATE_LIMIT_GENERAL_PER_SECOND` (default 2)
//! - `RATE_LIMIT_GENERAL_BURST_SIZE` (default 30)
//! - `RATE_LIMIT_AUTH_PER_SECOND` (default 10)
//! - `RATE_LIMIT_AUTH_BURST_SIZE` (default 5)
//! - `RATE_LIMIT_TRUSTED_PROXIES`: comma separated proxy IPs whose
//!   forwarding headers are believed (default none)
//! - `RATE_LIMIT_ENABLED` (default true)

use std::net::IpAddr;

use governor::middleware::NoOpMiddleware;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::KeyExtractor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Seconds between replenished requests for general endpoints.
    pub general_per_second: u64,
    pub general_burst_size: u32,
    /// Seconds between replenished requests for auth endpoints (stricter).
    pub auth_per_second: u64,
    pub auth_burst_size: u32,
    /// Peers allowed to name the client through `X-Forwarded-For`,
    /// `X-Real-IP` or `Forwarded`. Everyone else is keyed by peer address.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general_per_second: 2,
            general_burst_size: 30,
            auth_per_second: 10,
            auth_burst_size: 5,
            trusted_proxies: Vec::new(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_proxies(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .filter_map(|ip| ip.trim().parse().ok())
        .collect()
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
                .unwrap_or(defaults.enabled),
            general_per_second: env_or("RATE_LIMIT_GENERAL_PER_SECOND", defaults.general_per_second),
            general_burst_size: env_or("RATE_LIMIT_GENERAL_BURST_SIZE", defaults.general_burst_size),
            auth_per_second: env_or("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: env_or("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
            trusted_proxies: std::env::var("RATE_LIMIT_TRUSTED_PROXIES")
                .map(|raw| parse_proxies(&raw))
                .unwrap_or(defaults.trusted_proxies),
        }
    }

    /// `GovernorConfig` for general API endpoints. Zero values are raised
    /// to one.
    #[must_use]
    pub fn general_governor_config<K: KeyExtractor>(
        &self,
        key_extractor: K,
    ) -> Option<GovernorConfig<K, NoOpMiddleware>> {
        GovernorConfigBuilder::default()
            .per_second(self.general_per_second.max(1))
            .burst_size(self.general_burst_size.max(1))
            .key_extractor(key_extractor)
            .finish()
    }

    /// `GovernorConfig` for authentication endpoints.
    #[must_use]
    pub fn auth_governor_config<K: KeyExtractor>(
        &self,
        key_extractor: K,
    ) -> Option<GovernorConfig<K, NoOpMiddleware>> {
        GovernorConfigBuilder::default()
            .per_second(self.auth_per_second.max(1))
            .burst_size(self.auth_burst_size.max(1))
            .key_extractor(key_extractor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use governor::clock::{Clock, DefaultClock};
    use tower_governor::key_extractor::PeerIpKeyExtractor;

    use super::*;

    type Config = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

    /// Drains the bucket for one client and reports how long until the
    /// next request is allowed.
    fn drain(config: &Config, burst: u32) -> Duration {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..burst {
            assert!(config.limiter().check_key(&ip).is_ok());
        }
        let denied = config.limiter().check_key(&ip).unwrap_err();
        denied.wait_time_from(DefaultClock::default().now())
    }

    #[test]
    fn defaults() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.general_per_second, 2);
        assert_eq!(config.general_burst_size, 30);
        assert_eq!(config.auth_per_second, 10);
        assert_eq!(config.auth_burst_size, 5);
        assert!(config.trusted_proxies.is_empty());
    }

    #[test]
    fn auth_bucket_refills_slower_than_general() {
        let config = RateLimitConfig::default();
        let general = config.general_governor_config(PeerIpKeyExtractor).unwrap();
        let auth = config.auth_governor_config(PeerIpKeyExtractor).unwrap();

        let general_wait = drain(&general, config.general_burst_size);
        let auth_wait = drain(&auth, config.auth_burst_size);

        assert!(general_wait <= Duration::from_secs(2));
        assert!(auth_wait > Duration::from_secs(8));
        assert!(auth_wait > general_wait);
    }

    #[test]
    fn zero_values_still_build() {
        let config = RateLimitConfig {
            general_per_second: 0,
            general_burst_size: 0,
            auth_per_second: 0,
            auth_burst_size: 0,
            ..RateLimitConfig::default()
        };
        assert!(config.general_governor_config(PeerIpKeyExtractor).is_some());
        assert!(config.auth_governor_config(PeerIpKeyExtractor).is_some());
    }

    #[test]
    fn proxies_skip_garbage() {
        assert_eq!(
            parse_proxies("10.0.0.5, nonsense,::1"),
            vec![
                "10.0.0.5".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ]
        );
    }
}
