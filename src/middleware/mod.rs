//! Request pipeline shared by every `/api` route.
//!
//! Layers run in this order, outermost first:
//!
//! 1. [`tenancy`]: tenant resolution, subscription gate, tenant response headers
//! 2. [`access`]: bearer authentication and portal checks
//! 3. [`audit`]: audit rows for writes
//! 4. [`rate_limit`]: per-IP token buckets, layered on the `/api` router
//!    itself so health checks and docs are never limited
//!
//! Handlers then use the extractors from [`auth`] and [`tenancy`]:
//!
//! ```ignore
//! use crate::middleware::auth::RequireUsersManage;
//! use crate::middleware::tenancy::TenantScope;
//!
//! async fn list_users(
//!     RequireUsersManage(user): RequireUsersManage,
//!     TenantScope(tenant_id): TenantScope,
//! ) -> Result<Json<Vec<User>>, AppError> {
//!     // only callers holding "users:manage", pinned to their college
//! }
//! ```

pub mod access;
pub mod audit;
pub mod auth;
pub mod rate_limit;
pub mod tenancy;
