//! SaaS plans and the tenant's subscription to them.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::{
    init_billing_router, init_company_coupons_router, init_company_invoices_router,
    init_company_payments_router, init_company_plans_router, init_company_subscriptions_router,
    init_pricing_router, init_subscription_router,
};
pub use service::{CouponService, InvoiceService, PaymentService, PlanService, SubscriptionService};
