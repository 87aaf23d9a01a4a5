//! Student fee ledger for the college portal.

use anyhow::anyhow;
use campusflow_core::{AppError, Paginated, codes::generate_unique_code};
use campusflow_models::{
    FeePayment, FeeStatus, TenantId, UserId, fees::RECEIPT_PREFIX, system_roles,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::modules::fees::model::{CreateFeeDto, FeeFilterParams, PayFeeDto, check_open};
use crate::utils::db::ensure_in_tenant;

const RECEIPT_LENGTH: usize = 8;
const RECEIPT_ATTEMPTS: usize = 5;

pub struct FeeService;

impl FeeService {
    #[instrument(skip(db, dto), fields(db.table = "fee_payments", db.operation = "INSERT"))]
    pub async fn create_fee(
        db: &PgPool,
        tenant_id: TenantId,
        dto: CreateFeeDto,
    ) -> Result<FeePayment, AppError> {
        let is_student = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND tenant_id = $2 AND role_id = $3)",
        )
        .bind(dto.student_id)
        .bind(tenant_id)
        .bind(system_roles::STUDENT)
        .fetch_one(db)
        .await?;
        if !is_student {
            return Err(AppError::bad_request(anyhow!("Student not found")));
        }
        if let Some(section_id) = dto.section_id {
            ensure_in_tenant(db, "sections", section_id, tenant_id, "Section not found").await?;
        }

        for _ in 0..RECEIPT_ATTEMPTS {
            let receipt = generate_unique_code(RECEIPT_PREFIX, RECEIPT_LENGTH);
            let inserted = sqlx::query_as::<_, FeePayment>(
                r#"INSERT INTO fee_payments
                       (tenant_id, student_id, section_id, fee_type, amount, due_date,
                        receipt_number, status, remarks)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                   RETURNING *"#,
            )
            .bind(tenant_id)
            .bind(dto.student_id)
            .bind(dto.section_id)
            .bind(dto.fee_type)
            .bind(dto.amount)
            .bind(dto.due_date)
            .bind(&receipt)
            .bind(FeeStatus::Pending)
            .bind(&dto.remarks)
            .fetch_one(db)
            .await;

            match inserted {
                Ok(fee) => {
                    info!(fee_id = %fee.id, receipt = %fee.receipt_number, "Fee created");
                    return Ok(fee);
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    warn!(receipt = %receipt, "Receipt number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::internal_error(
            "Could not allocate a unique receipt number".to_string(),
        ))
    }

    #[instrument(skip(db), fields(db.table = "fee_payments", db.operation = "SELECT"))]
    pub async fn list_fees(
        db: &PgPool,
        tenant_id: TenantId,
        filters: FeeFilterParams,
    ) -> Result<Paginated<FeePayment>, AppError> {
        const WHERE: &str = r#"
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR student_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::text IS NULL OR fee_type = $4)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM fee_payments {WHERE}"))
            .bind(tenant_id)
            .bind(filters.student_id)
            .bind(filters.status)
            .bind(filters.fee_type)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, FeePayment>(&format!(
            "SELECT * FROM fee_payments {WHERE} ORDER BY due_date DESC, created_at DESC {}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .bind(filters.fee_type)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(data, total, &filters.pagination))
    }

    #[instrument(skip(db), fields(db.table = "fee_payments", db.operation = "SELECT"))]
    pub async fn get_fee(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<FeePayment, AppError> {
        sqlx::query_as::<_, FeePayment>(
            "SELECT * FROM fee_payments WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Fee not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "fee_payments", db.operation = "UPDATE"))]
    pub async fn pay_fee(
        db: &PgPool,
        tenant_id: TenantId,
        id: Uuid,
        dto: PayFeeDto,
    ) -> Result<FeePayment, AppError> {
        let fee = Self::get_fee(db, tenant_id, id).await?;
        check_open(fee.status).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let paid = sqlx::query_as::<_, FeePayment>(
            r#"UPDATE fee_payments
               SET status = $1, payment_method = $2, transaction_id = $3,
                   payment_date = $4, updated_at = NOW()
               WHERE id = $5 AND tenant_id = $6
               RETURNING *"#,
        )
        .bind(FeeStatus::Paid)
        .bind(dto.payment_method)
        .bind(&dto.transaction_id)
        .bind(dto.payment_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(id)
        .bind(tenant_id)
        .fetch_one(db)
        .await?;

        info!(fee_id = %paid.id, "Fee paid");
        Ok(paid)
    }

    #[instrument(skip(db), fields(db.table = "fee_payments", db.operation = "UPDATE"))]
    pub async fn cancel_fee(db: &PgPool, tenant_id: TenantId, id: Uuid) -> Result<FeePayment, AppError> {
        let fee = Self::get_fee(db, tenant_id, id).await?;
        check_open(fee.status).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let cancelled = sqlx::query_as::<_, FeePayment>(
            r#"UPDATE fee_payments SET status = $1, updated_at = NOW()
               WHERE id = $2 AND tenant_id = $3
               RETURNING *"#,
        )
        .bind(FeeStatus::Cancelled)
        .bind(id)
        .bind(tenant_id)
        .fetch_one(db)
        .await?;

        Ok(cancelled)
    }

    /// Flips pending fees past their due date to overdue.
    #[instrument(skip(db), fields(db.table = "fee_payments", db.operation = "UPDATE"))]
    pub async fn mark_overdue(db: &PgPool, tenant_id: TenantId) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"UPDATE fee_payments SET status = $1, updated_at = NOW()
               WHERE tenant_id = $2 AND status = $3 AND due_date < $4"#,
        )
        .bind(FeeStatus::Overdue)
        .bind(tenant_id)
        .bind(FeeStatus::Pending)
        .bind(Utc::now().date_naive())
        .execute(db)
        .await?;

        info!(count = result.rows_affected(), "Fees marked overdue");
        Ok(result.rows_affected())
    }

    /// Every fee of one student, newest due date first.
    #[instrument(skip(db), fields(db.table = "fee_payments", db.operation = "SELECT"))]
    pub async fn for_student(
        db: &PgPool,
        tenant_id: TenantId,
        student_id: UserId,
    ) -> Result<Vec<FeePayment>, AppError> {
        let fees = sqlx::query_as::<_, FeePayment>(
            r#"SELECT * FROM fee_payments
               WHERE tenant_id = $1 AND student_id = $2
               ORDER BY due_date DESC"#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(db)
        .await?;

        Ok(fees)
    }
}
