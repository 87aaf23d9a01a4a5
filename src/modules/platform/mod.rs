pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::{
    init_college_tickets_router, init_company_announcements_router, init_company_settings_router,
    init_company_tickets_router,
};
pub use service::{GlobalAnnouncementService, SettingService, TicketService};
