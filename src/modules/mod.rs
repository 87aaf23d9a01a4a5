//! Feature modules, one per portal area.
//!
//! Each module keeps the same layout: `model.rs` (DTOs and query params),
//! `service.rs` (SQL and rules), `controller.rs` (axum handlers with their
//! OpenAPI annotations) and `router.rs`.

pub mod academics;
pub mod account;
pub mod announcements;
pub mod audit;
pub mod auth;
pub mod billing;
pub mod department_portal;
pub mod fees;
pub mod health;
pub mod parent_portal;
pub mod platform;
pub mod student_portal;
pub mod teaching;
pub mod tenants;
pub mod timetable;
pub mod users;
