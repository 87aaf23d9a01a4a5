//! Settings that drive tenant resolution.
//!
//! - `PLATFORM_BASE_DOMAIN`: apex domain tenants live under (informational,
//!   used to build subdomain URLs)
//! - `RESERVED_SUBDOMAINS`: labels that never resolve to a tenant
//!   (default `www,api,admin`)
//! - `TENANT_CACHE_TTL_SECONDS`: how long tenant lookups stay cached (default 60)

use std::env;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenancyConfig {
    pub base_domain: String,
    pub reserved_subdomains: Vec<String>,
    pub cache_ttl_seconds: u64,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            base_domain: "campusflow.local".to_string(),
            reserved_subdomains: vec!["www".into(), "api".into(), "admin".into()],
            cache_ttl_seconds: 60,
        }
    }
}

impl TenancyConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_domain: env::var("PLATFORM_BASE_DOMAIN").unwrap_or(defaults.base_domain),
            reserved_subdomains: env::var("RESERVED_SUBDOMAINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_ascii_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.reserved_subdomains),
            cache_ttl_seconds: env::var("TENANT_CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_seconds),
        }
    }

    pub fn is_reserved(&self, label: &str) -> bool {
        self.reserved_subdomains
            .iter()
            .any(|r| r.eq_ignore_ascii_case(label))
    }

    /// Public URL of a tenant's subdomain.
    pub fn tenant_url(&self, subdomain: &str) -> String {
        format!("https://{}.{}", subdomain, self.base_domain)
    }
}
