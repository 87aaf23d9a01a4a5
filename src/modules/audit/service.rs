use campusflow_core::{AppError, Paginated};
use campusflow_models::{AuditLog, AuditStatus, NewAuditLog, TenantId};
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::audit::model::AuditLogFilterParams;

pub struct AuditService;

impl AuditService {
    #[instrument(skip(db, entry), fields(db.table = "audit_logs", db.operation = "INSERT", audit.action = %entry.action))]
    pub async fn record(db: &PgPool, entry: NewAuditLog) -> Result<AuditLog, AppError> {
        let log = sqlx::query_as::<_, AuditLog>(
            r#"INSERT INTO audit_logs
                   (user_id, tenant_id, action, resource_type, resource_id, description,
                    ip_address, user_agent, changes, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(entry.user_id)
        .bind(entry.tenant_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.description)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.changes)
        .bind(entry.status.unwrap_or(AuditStatus::Success))
        .fetch_one(db)
        .await?;

        Ok(log)
    }

    /// Lists audit rows, newest first. `tenant_id = None` lists every tenant.
    #[instrument(skip(db), fields(db.table = "audit_logs", db.operation = "SELECT"))]
    pub async fn list(
        db: &PgPool,
        tenant_id: Option<TenantId>,
        filters: AuditLogFilterParams,
    ) -> Result<Paginated<AuditLog>, AppError> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::text IS NULL OR resource_type = $3)
              AND ($4::uuid IS NULL OR user_id = $4)"#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM audit_logs{WHERE}"))
            .bind(tenant_id)
            .bind(&filters.action)
            .bind(&filters.resource_type)
            .bind(filters.user_id)
            .fetch_one(db)
            .await?;

        let logs = sqlx::query_as::<_, AuditLog>(&format!(
            "SELECT * FROM audit_logs{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(&filters.action)
        .bind(&filters.resource_type)
        .bind(filters.user_id)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(logs, total, &filters.pagination))
    }
}
