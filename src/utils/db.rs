use anyhow::anyhow;
use campusflow_core::AppError;

/// Maps a unique violation to a 400 with `message`; any other
/// database error stays a 500.
pub fn unique_violation(message: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::bad_request(anyhow!(message))
        }
        _ => AppError::from(e),
    }
}

/// Maps a foreign key violation to a 400 with `message`.
pub fn foreign_key_violation(message: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::bad_request(anyhow!(message))
        }
        _ => AppError::from(e),
    }
}

/// Fails with a 400 carrying `message` unless `table` holds a row `id`
/// belonging to `tenant_id`.
///
/// `table` is always a literal from the caller, never user input.
pub async fn ensure_in_tenant(
    db: &sqlx::PgPool,
    table: &'static str,
    id: uuid::Uuid,
    tenant_id: campusflow_models::TenantId,
    message: &'static str,
) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1 AND tenant_id = $2)"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_one(db)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::bad_request(anyhow!(message)))
    }
}
