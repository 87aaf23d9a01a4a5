//! Head-of-department portal under `/api/dept`.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_department_portal_router;
