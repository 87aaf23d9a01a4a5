//! # CampusFlow Cache
//!
//! Optional Redis layer for the API. When `REDIS_URL` is unset the server
//! runs without it and every helper here that takes `Option<&RedisCache>`
//! becomes a no-op.
//!
//! - [`RedisCache`]: prefixed JSON get/set, cache-aside loading, pattern invalidation
//! - [`keys`]: key layout for tenant resolution, pricing and public settings
//! - [`middleware`]: `Cache-Control` layer and `ETag` middleware for public routes

pub mod config;
pub mod keys;
pub mod middleware;
pub mod redis;

pub use config::CacheConfig;
pub use keys::invalidate;
pub use middleware::{CacheControl, cache_control, etag_middleware};
pub use redis::{CacheError, RedisCache};
