//! Cache key layout and invalidation helpers.
//!
//! All keys are relative; [`crate::RedisCache`] adds the configured prefix.

use crate::RedisCache;
use tracing::warn;
use uuid::Uuid;

fn build_key(parts: &[&str]) -> String {
    parts.join(":")
}

/// Tenant lookups made by the resolution middleware.
pub mod tenants {
    use super::*;

    pub fn by_id(tenant_id: Uuid) -> String {
        build_key(&["tenant", "id", &tenant_id.to_string()])
    }

    pub fn by_subdomain(subdomain: &str) -> String {
        build_key(&["tenant", "subdomain", &subdomain.to_ascii_lowercase()])
    }

    /// Custom-domain lookup keyed by the full host.
    pub fn by_host(host: &str) -> String {
        build_key(&["tenant", "host", &host.to_ascii_lowercase()])
    }

    /// Host and subdomain keys carry no tenant id, so any tenant change
    /// clears the whole family.
    pub fn invalidation_pattern() -> String {
        "tenant:*".into()
    }
}

/// Public pricing cards.
pub mod plans {
    use super::*;

    pub fn active_list() -> String {
        build_key(&["plans", "active"])
    }

    pub fn by_slug(slug: &str) -> String {
        build_key(&["plans", "slug", slug])
    }

    pub fn invalidation_pattern() -> String {
        "plans:*".into()
    }
}

pub mod settings {
    use super::*;

    pub fn public_list() -> String {
        build_key(&["settings", "public"])
    }
}

pub mod invalidate {
    use super::*;

    async fn pattern(cache: &RedisCache, pattern: &str) {
        if let Err(e) = cache.invalidate_pattern(pattern).await {
            warn!(error = %e, cache.pattern = %pattern, "Cache invalidation failed");
        }
    }

    /// Call after any write to a tenant or one of its domains.
    pub async fn tenant(cache: Option<&RedisCache>, tenant_id: Uuid) {
        let Some(cache) = cache else { return };
        if let Err(e) = cache.invalidate(&tenants::by_id(tenant_id)).await {
            warn!(error = %e, %tenant_id, "Failed to drop tenant cache entry");
        }
        pattern(cache, &tenants::invalidation_pattern()).await;
    }

    pub async fn plans(cache: Option<&RedisCache>) {
        let Some(cache) = cache else { return };
        pattern(cache, &plans::invalidation_pattern()).await;
    }

    pub async fn settings(cache: Option<&RedisCache>) {
        let Some(cache) = cache else { return };
        if let Err(e) = cache.invalidate(&settings::public_list()).await {
            warn!(error = %e, "Failed to drop public settings cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_keys_are_lowercased() {
        assert_eq!(tenants::by_host("Portal.Riverdale.EDU"), "tenant:host:portal.riverdale.edu");
        assert_eq!(tenants::by_subdomain("RiverDale"), "tenant:subdomain:riverdale");
        assert_eq!(
            tenants::by_id(Uuid::nil()),
            "tenant:id:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn patterns_cover_their_keys() {
        let pattern = tenants::invalidation_pattern();
        let prefix = pattern.trim_end_matches('*');
        assert!(tenants::by_host("x.edu").starts_with(prefix));
        assert!(tenants::by_id(Uuid::nil()).starts_with(prefix));
        assert!(plans::by_slug("basic").starts_with(plans::invalidation_pattern().trim_end_matches('*')));
    }
}
