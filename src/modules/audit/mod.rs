pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::{init_college_audit_router, init_company_audit_router};
pub use service::AuditService;
