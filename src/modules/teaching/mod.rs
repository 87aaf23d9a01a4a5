//! Teacher portal under `/api/teacher`.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_teaching_router;
pub use service::{AssessmentService, AssignmentService, AttendanceService, ClassService};
