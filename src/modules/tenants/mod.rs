pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::{init_company_dashboard_router, init_company_domains_router, init_tenants_router};
pub use service::TenantService;
