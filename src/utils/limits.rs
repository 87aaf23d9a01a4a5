//! Plan limits and the usage counters on the tenant row.
//!
//! Callers reserve capacity inside the transaction that creates the counted
//! row: [`reserve_usage`] locks the tenant row, checks the limit and bumps
//! the counter, so two concurrent creates cannot both squeeze under it.

use anyhow::anyhow;
use campusflow_core::AppError;
use campusflow_models::{LimitKind, Tenant, TenantId};
use sqlx::PgConnection;
use tracing::instrument;

/// Locks and returns the tenant row for the rest of the transaction.
pub async fn lock_tenant(conn: &mut PgConnection, tenant_id: TenantId) -> Result<Tenant, AppError> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1 FOR UPDATE")
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Tenant not found")))
}

pub fn validate_tenant_limits(tenant: &Tenant, kind: LimitKind, count: f64) -> Result<(), AppError> {
    tenant
        .check_limit(kind, count)
        .map_err(AppError::bad_request)
}

#[instrument(skip(conn), fields(db.table = "tenants", db.operation = "UPDATE"))]
pub async fn increment_tenant_usage(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    kind: LimitKind,
    amount: i32,
) -> Result<(), AppError> {
    let column = kind.counter_column();
    sqlx::query(&format!(
        "UPDATE tenants SET {column} = {column} + $2, updated_at = NOW() WHERE id = $1"
    ))
    .bind(tenant_id)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

/// Decrements a counter, stopping at zero.
#[instrument(skip(conn), fields(db.table = "tenants", db.operation = "UPDATE"))]
pub async fn decrement_tenant_usage(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    kind: LimitKind,
    amount: i32,
) -> Result<(), AppError> {
    let column = kind.counter_column();
    sqlx::query(&format!(
        "UPDATE tenants SET {column} = GREATEST({column} - $2, 0), updated_at = NOW() WHERE id = $1"
    ))
    .bind(tenant_id)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

/// Locks the tenant, checks room for `count` more and takes it.
pub async fn reserve_usage(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    kind: LimitKind,
    count: i32,
) -> Result<(), AppError> {
    let tenant = lock_tenant(&mut *conn, tenant_id).await?;
    validate_tenant_limits(&tenant, kind, f64::from(count))?;
    increment_tenant_usage(conn, tenant_id, kind, count).await
}
