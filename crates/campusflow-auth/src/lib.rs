//! # CampusFlow Auth
//!
//! JWT claims plus token creation and verification.
//!
//! ```ignore
//! use campusflow_auth::{TokenSubject, create_access_token, verify_token};
//!
//! let token = create_access_token(
//!     TokenSubject {
//!         user_id,
//!         email: "teacher@riverdale.edu",
//!         tenant_id: Some(tenant_id),
//!         role: Some("teacher"),
//!         permissions: vec!["attendance:manage".into()],
//!     },
//!     &jwt_config,
//! )?;
//! let claims = verify_token(&token, &jwt_config)?;
//! ```

pub mod claims;
pub mod jwt;

pub use claims::{Claims, RefreshTokenClaims, SUPER_ADMIN_ROLE};
pub use jwt::{
    TokenSubject, create_access_token, create_refresh_token, verify_refresh_token, verify_token,
};
