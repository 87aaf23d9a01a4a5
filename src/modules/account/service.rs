use anyhow::anyhow;
use campusflow_config::EmailConfig;
use campusflow_core::{AppError, hash_password, verify_password};
use campusflow_models::{UserId, UserWithRole, users::USER_COLUMNS};
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::modules::account::model::{ChangePasswordDto, UpdateProfileDto};
use crate::utils::email::EmailService;

pub struct AccountService;

impl AccountService {
    #[instrument(skip(db), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn get_profile(db: &PgPool, user_id: UserId) -> Result<UserWithRole, AppError> {
        sqlx::query_as::<_, UserWithRole>(&format!(
            "SELECT {USER_COLUMNS}, r.name AS role FROM users u \
             LEFT JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "users", db.operation = "UPDATE"))]
    pub async fn update_profile(
        db: &PgPool,
        user_id: UserId,
        dto: UpdateProfileDto,
    ) -> Result<UserWithRole, AppError> {
        let result = sqlx::query(
            r#"UPDATE users SET
                   first_name = COALESCE($2, first_name),
                   last_name = COALESCE($3, last_name),
                   phone = COALESCE($4, phone),
                   language_preference = COALESCE($5, language_preference),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(user_id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .bind(&dto.language_preference)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        Self::get_profile(db, user_id).await
    }

    /// Replaces the password after checking the current one, then mails a
    /// confirmation.
    #[instrument(skip(db, email_config, dto), fields(db.table = "users", db.operation = "UPDATE"))]
    pub async fn change_password(
        db: &PgPool,
        email_config: &EmailConfig,
        user_id: UserId,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let (email, first_name, current_hash) = sqlx::query_as::<_, (String, String, String)>(
            "SELECT email, first_name, password FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if !verify_password(&dto.current_password, &current_hash)? {
            return Err(AppError::bad_request(anyhow!(
                "Current password is incorrect"
            )));
        }
        if dto.current_password == dto.new_password {
            return Err(AppError::bad_request(anyhow!(
                "New password must differ from the current password"
            )));
        }

        let new_hash = hash_password(&dto.new_password)?;
        sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(&new_hash)
            .execute(db)
            .await?;

        info!(%user_id, "Password changed");

        let mailer = EmailService::new(email_config.clone());
        EmailService::send_or_log(
            "password_changed",
            mailer.send_password_reset_confirmation(&email, &first_name),
        )
        .await;

        Ok(())
    }
}
