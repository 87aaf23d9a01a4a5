//! # CampusFlow API
//!
//! Multi-tenant backend for running colleges as a SaaS. Each college is a
//! tenant; its users reach the API through the portal of their role.
//!
//! ## Request pipeline
//!
//! Every `/api` request passes, in order, through tenant resolution with
//! the subscription gate, portal access control, the audit trail and the
//! per-IP rate limits. See [`middleware`].
//!
//! ## Portals
//!
//! | Prefix | Who |
//! |--------|-----|
//! | `/api/company` | super admin |
//! | `/api/college`, `/api/billing`, `/api/subscription` | tenant admin |
//! | `/api/dept` | department admin |
//! | `/api/teacher` | teacher |
//! | `/api/student` | student |
//! | `/api/parent` | parent |
//! | `/api/account` | any signed-in user |
//! | `/api/auth`, `/api/pricing` | public |
//!
//! ## Layout
//!
//! ```text
//! src/
//! ├── middleware/   # rate limit, tenancy, access, audit, auth extractors
//! ├── modules/      # one folder per feature: model, service, controller, router
//! └── utils/        # constraint mapping, email, plan limits
//! ```
//!
//! API documentation is served at `/swagger-ui` and `/scalar`.

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;

pub use campusflow_auth;
pub use campusflow_cache;
pub use campusflow_config;
pub use campusflow_core;
pub use campusflow_db;
pub use campusflow_models;
