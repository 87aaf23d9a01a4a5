//! Shared helpers for services.
//!
//! - [`db`]: constraint violation mapping
//! - [`email`]: transactional mail via SMTP
//! - [`limits`]: plan limits and tenant usage counters

pub mod db;
pub mod email;
pub mod limits;
