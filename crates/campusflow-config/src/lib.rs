//! # CampusFlow Config
//!
//! Configuration structures loaded from environment variables.
//!
//! - [`jwt`]: token signing secret and lifetimes
//! - [`cors`]: allowed browser origins
//! - [`email`]: SMTP settings
//! - [`rate_limit`]: per-IP request quotas
//! - [`tenancy`]: tenant resolution settings
//!
//! ```ignore
//! use campusflow_config::{JwtConfig, TenancyConfig};
//!
//! let jwt = JwtConfig::from_env();
//! let tenancy = TenancyConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod jwt;
pub mod rate_limit;
pub mod tenancy;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;
pub use tenancy::TenancyConfig;
