use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    cancel_subscription, change_plan, checkout, create_coupon, create_plan, delete_coupon,
    delete_plan, get_coupon, get_invoice, get_plan, get_pricing, get_subscription,
    list_all_invoices, list_coupons, list_invoices, list_payments, list_plans, list_pricing,
    list_subscriptions, refund_payment, set_subscription_status, update_coupon, update_plan,
    validate_coupon,
};

pub fn init_pricing_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pricing))
        .route("/{slug}", get(get_pricing))
}

pub fn init_subscription_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_subscription))
        .route("/checkout", post(checkout))
        .route("/change-plan", post(change_plan))
        .route("/cancel", post(cancel_subscription))
}

pub fn init_billing_router() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/invoices", get(list_invoices))
        .route("/invoices/{id}", get(get_invoice))
        .route("/coupons/validate", post(validate_coupon))
}

pub fn init_company_plans_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/{id}", get(get_plan).put(update_plan).delete(delete_plan))
}

pub fn init_company_coupons_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route("/{id}", get(get_coupon).put(update_coupon).delete(delete_coupon))
}

pub fn init_company_subscriptions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions))
        .route("/{id}/status", post(set_subscription_status))
}

pub fn init_company_payments_router() -> Router<AppState> {
    Router::new().route("/{id}/refund", post(refund_payment))
}

pub fn init_company_invoices_router() -> Router<AppState> {
    Router::new().route("/", get(list_all_invoices))
}
