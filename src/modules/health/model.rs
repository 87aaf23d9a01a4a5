use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

pub const HEALTHY: &str = "healthy";
pub const UNHEALTHY: &str = "unhealthy";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentStatus {
    pub status: &'static str,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentStatus {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            status: HEALTHY,
            response_time_ms,
            error: None,
        }
    }

    pub fn unhealthy(response_time_ms: u64, error: String) -> Self {
        Self {
            status: UNHEALTHY,
            response_time_ms,
            error: Some(error),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: BTreeMap<&'static str, ComponentStatus>,
}

impl HealthReport {
    pub fn from_checks(checks: BTreeMap<&'static str, ComponentStatus>) -> Self {
        let status = if checks.values().all(ComponentStatus::is_healthy) {
            HEALTHY
        } else {
            UNHEALTHY
        };
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}
