//! Parent portal under `/api/parent`.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_parent_portal_router;
