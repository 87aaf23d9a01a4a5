use anyhow::anyhow;
use campusflow_config::EmailConfig;
use campusflow_core::{AppError, Paginated, hash_password};
use campusflow_models::{
    RoleInfo, RoleName, TenantId, UserId, UserWithRole, system_roles, users::USER_COLUMNS,
};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use crate::metrics::track_user_created;
use crate::modules::users::model::{CreateUserDto, UpdateUserDto, UserFilterParams};
use crate::utils::db::unique_violation;
use crate::utils::email::EmailService;
use crate::utils::limits::{decrement_tenant_usage, lock_tenant, reserve_usage};

const DUPLICATE_EMAIL: &str = "A user with this email already exists";

fn select_user_with_role() -> String {
    format!("SELECT {USER_COLUMNS}, r.name AS role FROM users u LEFT JOIN roles r ON r.id = u.role_id")
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db, email_config, dto), fields(db.table = "users", db.operation = "INSERT", user.role = %dto.role))]
    pub async fn create_user(
        db: &PgPool,
        email_config: &EmailConfig,
        tenant_id: TenantId,
        dto: CreateUserDto,
    ) -> Result<UserWithRole, AppError> {
        if !dto.role.is_assignable() {
            return Err(AppError::bad_request(anyhow!(
                "The super_admin role cannot be assigned"
            )));
        }

        let password = hash_password(&dto.password)?;
        let mut tx = db.begin().await?;

        if let Some(kind) = dto.role.limit_kind() {
            reserve_usage(&mut tx, tenant_id, kind, 1).await?;
        }

        let user_id = sqlx::query_scalar::<_, UserId>(
            r#"INSERT INTO users (tenant_id, role_id, email, password, first_name, last_name, phone)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(tenant_id)
        .bind(system_roles::id_for(dto.role))
        .bind(&dto.email)
        .bind(&password)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation(DUPLICATE_EMAIL))?;

        tx.commit().await?;
        track_user_created(dto.role.as_str());

        let college = sqlx::query_scalar::<_, String>("SELECT name FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_one(db)
            .await?;
        let mailer = EmailService::new(email_config.clone());
        EmailService::send_or_log(
            "welcome",
            mailer.send_welcome_email(dto.email.as_str(), &dto.first_name, &college),
        )
        .await;

        Self::get_user(db, tenant_id, user_id).await
    }

    #[instrument(skip(db), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn list_users(
        db: &PgPool,
        tenant_id: TenantId,
        filters: UserFilterParams,
    ) -> Result<Paginated<UserWithRole>, AppError> {
        const WHERE: &str = r#"
            WHERE u.tenant_id = $1
              AND ($2::text IS NULL OR r.name = $2)
              AND ($3::text IS NULL
                   OR u.first_name ILIKE '%' || $3 || '%'
                   OR u.last_name ILIKE '%' || $3 || '%'
                   OR u.email ILIKE '%' || $3 || '%')"#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users u LEFT JOIN roles r ON r.id = u.role_id{WHERE}"
        ))
        .bind(tenant_id)
        .bind(filters.role)
        .bind(&filters.search)
        .fetch_one(db)
        .await?;

        let users = sqlx::query_as::<_, UserWithRole>(&format!(
            "{}{WHERE} ORDER BY u.last_name, u.first_name{}",
            select_user_with_role(),
            filters.pagination.sql_suffix()
        ))
        .bind(tenant_id)
        .bind(filters.role)
        .bind(&filters.search)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(users, total, &filters.pagination))
    }

    #[instrument(skip(db), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn get_user(
        db: &PgPool,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<UserWithRole, AppError> {
        sqlx::query_as::<_, UserWithRole>(&format!(
            "{} WHERE u.id = $1 AND u.tenant_id = $2",
            select_user_with_role()
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    /// A user of the tenant holding one of `roles`, or a 400 with `message`.
    ///
    /// Used to validate references such as a department head or an
    /// enrolled student.
    pub async fn find_member(
        db: &PgPool,
        tenant_id: TenantId,
        user_id: UserId,
        roles: &[RoleName],
        message: &'static str,
    ) -> Result<UserWithRole, AppError> {
        let user = sqlx::query_as::<_, UserWithRole>(&format!(
            "{} WHERE u.id = $1 AND u.tenant_id = $2",
            select_user_with_role()
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?;

        user.filter(|u| u.role.is_some_and(|role| roles.contains(&role)))
            .ok_or_else(|| AppError::bad_request(anyhow!(message)))
    }

    /// Applies the changes; a role change moves the user between usage
    /// counters inside the same transaction.
    #[instrument(skip(db, dto), fields(db.table = "users", db.operation = "UPDATE"))]
    pub async fn update_user(
        db: &PgPool,
        tenant_id: TenantId,
        user_id: UserId,
        dto: UpdateUserDto,
    ) -> Result<UserWithRole, AppError> {
        if let Some(role) = dto.role
            && !role.is_assignable()
        {
            return Err(AppError::bad_request(anyhow!(
                "The super_admin role cannot be assigned"
            )));
        }

        let mut tx = db.begin().await?;
        lock_tenant(&mut tx, tenant_id).await?;
        let existing = Self::lock_user(&mut tx, tenant_id, user_id).await?;
        if existing.role == Some(RoleName::SuperAdmin) {
            return Err(AppError::forbidden("Platform administrators cannot be edited here".to_string()));
        }

        let new_role = dto.role.or(existing.role);
        if new_role != existing.role {
            if let Some(kind) = existing.role.and_then(|r| r.limit_kind()) {
                decrement_tenant_usage(&mut tx, tenant_id, kind, 1).await?;
            }
            if let Some(kind) = new_role.and_then(|r| r.limit_kind()) {
                reserve_usage(&mut tx, tenant_id, kind, 1).await?;
            }
        }

        sqlx::query(
            r#"UPDATE users SET
                   first_name = COALESCE($3, first_name),
                   last_name = COALESCE($4, last_name),
                   phone = COALESCE($5, phone),
                   role_id = $6,
                   is_active = COALESCE($7, is_active),
                   updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2"#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .bind(new_role.map(system_roles::id_for))
        .bind(dto.is_active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Self::get_user(db, tenant_id, user_id).await
    }

    #[instrument(skip(db), fields(db.table = "users", db.operation = "DELETE"))]
    pub async fn delete_user(
        db: &PgPool,
        tenant_id: TenantId,
        user_id: UserId,
        caller: UserId,
    ) -> Result<(), AppError> {
        if user_id == caller {
            return Err(AppError::bad_request(anyhow!(
                "You cannot delete your own account"
            )));
        }
        let mut tx = db.begin().await?;
        lock_tenant(&mut tx, tenant_id).await?;
        let existing = Self::lock_user(&mut tx, tenant_id, user_id).await?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(user_id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 1
            && let Some(kind) = existing.role.and_then(|r| r.limit_kind())
        {
            decrement_tenant_usage(&mut tx, tenant_id, kind, 1).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Re-reads the user under a row lock. Callers hold the tenant lock
    /// first so counter changes for the tenant are serialised.
    async fn lock_user(
        conn: &mut PgConnection,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<UserWithRole, AppError> {
        sqlx::query_as::<_, UserWithRole>(&format!(
            "{} WHERE u.id = $1 AND u.tenant_id = $2 FOR UPDATE OF u",
            select_user_with_role()
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db), fields(db.table = "roles", db.operation = "SELECT"))]
    pub async fn list_assignable_roles(db: &PgPool) -> Result<Vec<RoleInfo>, AppError> {
        let roles = sqlx::query_as::<_, RoleInfo>(
            "SELECT id, name, display_name FROM roles WHERE name <> $1 ORDER BY scope_level, name",
        )
        .bind(RoleName::SuperAdmin)
        .fetch_all(db)
        .await?;

        Ok(roles)
    }
}
