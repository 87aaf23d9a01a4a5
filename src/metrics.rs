use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// `OBSERVABILITY_ENABLED`, on unless set to `false` or `0`.
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
            .unwrap_or(true)
    })
}

const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Installs the Prometheus recorder and its upkeep task.
pub fn init_metrics() -> Result<Option<PrometheusHandle>, BuildError> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &LATENCY_BUCKETS,
        )?
        .install_recorder()?;

    let upkeep = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep.run_upkeep();
        }
    });

    Ok(Some(handle))
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    gauge!("http_requests_active").increment(1.0);
    let response = next.run(req).await;
    gauge!("http_requests_active").decrement(1.0);

    let status = response.status().as_u16();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    let class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };
    counter!("http_requests_by_status", "status_category" => class).increment(1);

    response
}

/// Router for the separate `/metrics` listener.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

pub fn track_tenant_created(source: &'static str) {
    if is_observability_enabled() {
        counter!("tenants_created_total", "source" => source).increment(1);
    }
}

pub fn track_user_created(role: &str) {
    if is_observability_enabled() {
        counter!("users_created_total", "role" => role.to_string()).increment(1);
    }
}

pub fn track_login_success(role: &str) {
    if is_observability_enabled() {
        counter!("user_logins_total", "role" => role.to_string(), "status" => "success")
            .increment(1);
    }
}

pub fn track_login_failure(reason: &'static str) {
    if is_observability_enabled() {
        counter!("user_logins_total", "status" => "failure", "reason" => reason).increment(1);
    }
}

pub fn track_jwt_issued() {
    if is_observability_enabled() {
        counter!("jwt_tokens_issued_total").increment(1);
    }
}

/// `event` is one of checkout, change_plan, cancel, status_change.
pub fn track_subscription_event(event: &'static str, plan: &str) {
    if is_observability_enabled() {
        counter!("subscription_events_total", "event" => event, "plan" => plan.to_string())
            .increment(1);
    }
}

pub fn track_payment(status: &str, amount: f64) {
    if is_observability_enabled() {
        counter!("payments_total", "status" => status.to_string()).increment(1);
        histogram!("payment_amount").record(amount);
    }
}

pub fn track_access_denied(code: &'static str) {
    if is_observability_enabled() {
        counter!("access_denied_total", "code" => code).increment(1);
    }
}
