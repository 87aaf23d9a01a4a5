//! Student portal under `/api/student`. Reads only the caller's own records.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_student_portal_router;
