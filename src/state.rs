use std::sync::Arc;

use campusflow_cache::{CacheConfig, RedisCache};
use campusflow_config::{CorsConfig, EmailConfig, JwtConfig, RateLimitConfig, TenancyConfig};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::middleware::rate_limit::RateLimiters;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub tenancy_config: TenancyConfig,
    /// `None` when `REDIS_URL` is unset or Redis was unreachable at boot.
    pub cache: Option<RedisCache>,
    /// `None` when rate limiting is disabled.
    pub rate_limiters: Option<Arc<RateLimiters>>,
}

impl AppState {
    /// State over an existing pool with every other setting read from the
    /// environment.
    pub fn new(db: PgPool, cache: Option<RedisCache>) -> Self {
        let rate_limit_config = RateLimitConfig::from_env();
        Self {
            db,
            jwt_config: JwtConfig::from_env(),
            email_config: EmailConfig::from_env(),
            cors_config: CorsConfig::from_env(),
            rate_limiters: RateLimiters::new(&rate_limit_config).map(Arc::new),
            rate_limit_config,
            tenancy_config: TenancyConfig::from_env(),
            cache,
        }
    }

    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tenancy_config", &self.tenancy_config)
            .field("rate_limit_config", &self.rate_limit_config)
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

async fn connect_cache() -> Option<RedisCache> {
    let config = CacheConfig::from_env()?;
    match RedisCache::connect(&config).await {
        Ok(cache) => {
            info!("Redis cache connected");
            Some(cache)
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, continuing without cache");
            None
        }
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let db = campusflow_db::init_db_pool().await?;
    let cache = connect_cache().await;
    Ok(AppState::new(db, cache))
}
