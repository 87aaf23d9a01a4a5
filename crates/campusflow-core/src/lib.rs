//! # CampusFlow Core
//!
//! Foundational pieces shared by every CampusFlow crate:
//!
//! - [`errors`]: [`AppError`] and its JSON rendering
//! - [`pagination`]: query parameters and paginated envelopes
//! - [`password`]: bcrypt hashing
//! - [`permissions`]: permission strings embedded in access tokens
//! - [`codes`]: reference codes, slugs, file sizes and ages
//! - [`serde`]: lenient query string deserializers

pub mod codes;
pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod serde;

pub use errors::AppError;
pub use pagination::{Paginated, PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
