use anyhow::anyhow;
use campusflow_auth::{TokenSubject, create_access_token, create_refresh_token, verify_refresh_token};
use campusflow_config::{EmailConfig, JwtConfig, TenancyConfig};
use campusflow_core::{AppError, hash_password, verify_password};
use campusflow_models::{
    AuthUserSummary, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    NewAuditLog, RefreshTokenRequest, ResetPasswordRequest, Role, RoleName, SignupRequest,
    SubscriptionPlan, Tenant, TenantId, TenantSummary, UserCredentials, UserId, UserWithRole,
    system_roles, users::USER_COLUMNS,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::metrics::{
    track_jwt_issued, track_login_failure, track_login_success, track_subscription_event,
    track_tenant_created, track_user_created,
};
use crate::middleware::audit::{ClientInfo, create_audit_log};
use crate::modules::auth::model::{
    FORGOT_PASSWORD_MESSAGE, INVALID_CREDENTIALS, PasswordResetToken, RESET_TOKEN_TTL_MINUTES,
    SIGNUP_TRIAL_DAYS, TRIAL_PLAN_SLUG, generate_reset_token, hash_reset_token,
};
use crate::modules::tenants::service::TenantService;
use crate::utils::db::unique_violation;
use crate::utils::email::EmailService;

const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, jwt_config, dto, client), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn login(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: LoginRequest,
        client: &ClientInfo,
    ) -> Result<LoginResponse, AppError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            r#"SELECT u.id, u.tenant_id, u.email, u.password, u.is_active, r.name AS role
               FROM users u LEFT JOIN roles r ON r.id = u.role_id
               WHERE u.email = $1"#,
        )
        .bind(&dto.email)
        .fetch_optional(db)
        .await?;

        let Some(credentials) = credentials else {
            track_login_failure("unknown_user");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        };
        if !credentials.is_active {
            track_login_failure("inactive");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        if !verify_password(&dto.password, &credentials.password)? {
            track_login_failure("bad_password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(credentials.id)
            .execute(db)
            .await?;

        let response = Self::issue_tokens(db, jwt_config, credentials.id).await?;

        track_login_success(credentials.role.map_or("none", |r| r.as_str()));
        create_audit_log(
            db,
            NewAuditLog {
                user_id: Some(credentials.id),
                tenant_id: credentials.tenant_id,
                description: format!("{} signed in", credentials.email),
                ..client.event("login", "auth")
            },
        )
        .await;

        Ok(response)
    }

    #[instrument(skip(db, jwt_config, dto))]
    pub async fn refresh(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: RefreshTokenRequest,
    ) -> Result<LoginResponse, AppError> {
        let claims = verify_refresh_token(&dto.refresh_token, jwt_config)?;
        let user_id: UserId = claims.sub.parse().map_err(|_| {
            AppError::unauthorized("Invalid or expired refresh token".to_string())
        })?;

        let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;
        if active != Some(true) {
            return Err(AppError::unauthorized(
                "Invalid or expired refresh token".to_string(),
            ));
        }

        Self::issue_tokens(db, jwt_config, user_id).await
    }

    /// Signed-in user with role permissions and tenant summary.
    #[instrument(skip(db), fields(db.table = "users", db.operation = "SELECT"))]
    pub async fn profile(db: &PgPool, user_id: UserId) -> Result<AuthUserSummary, AppError> {
        let user = sqlx::query_as::<_, UserWithRole>(&format!(
            "SELECT {USER_COLUMNS}, r.name AS role FROM users u \
             LEFT JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        let permissions = match user.user.role_id {
            Some(role_id) => sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
                .bind(role_id)
                .fetch_optional(db)
                .await?
                .map(|role| role.permissions())
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let tenant = match user.user.tenant_id {
            Some(tenant_id) => sqlx::query_as::<_, TenantSummary>(
                "SELECT id, name, slug, subdomain, subscription_status FROM tenants WHERE id = $1",
            )
            .bind(tenant_id)
            .fetch_optional(db)
            .await?,
            None => None,
        };

        Ok(AuthUserSummary {
            id: user.user.id,
            email: user.user.email,
            first_name: user.user.first_name,
            last_name: user.user.last_name,
            role: user.role,
            permissions,
            tenant,
        })
    }

    /// Access and refresh tokens for `user_id`, with claims taken from the
    /// current role and tenant.
    pub async fn issue_tokens(
        db: &PgPool,
        jwt_config: &JwtConfig,
        user_id: UserId,
    ) -> Result<LoginResponse, AppError> {
        let user = Self::profile(db, user_id).await?;

        let access_token = create_access_token(
            TokenSubject {
                user_id: user.id.into_inner(),
                email: user.email.as_str(),
                tenant_id: user.tenant.as_ref().map(|t| t.id.into_inner()),
                role: user.role.map(|r| r.as_str()),
                permissions: user.permissions.clone(),
            },
            jwt_config,
        )?;
        let refresh_token =
            create_refresh_token(user.id.into_inner(), user.email.as_str(), jwt_config)?;
        track_jwt_issued();

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user,
        })
    }

    /// Onboards a college: tenant on the trial plan, its first administrator
    /// and the trial subscription, all in one transaction.
    #[instrument(skip(db, jwt_config, email_config, tenancy, dto), fields(tenant.name = %dto.college_name))]
    pub async fn signup(
        db: &PgPool,
        jwt_config: &JwtConfig,
        email_config: &EmailConfig,
        tenancy: &TenancyConfig,
        dto: SignupRequest,
    ) -> Result<LoginResponse, AppError> {
        let slug = TenantService::available_slug(db, &dto.college_name).await?;
        let subdomain = TenantService::pick_subdomain(dto.subdomain.as_deref(), &slug, tenancy)?;

        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE slug = $1",
        )
        .bind(TRIAL_PLAN_SLUG)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::internal_error("Trial plan is not configured".to_string()))?;

        let now = Utc::now();
        let trial_end = now + Duration::days(SIGNUP_TRIAL_DAYS);
        let college_email = dto.college_email.as_ref().unwrap_or(&dto.email);
        let password = hash_password(&dto.password)?;

        let mut tx = db.begin().await?;

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"INSERT INTO tenants
                   (name, slug, subdomain, email, phone, subscription_status, subscription_plan,
                    subscription_start_date, trial_end_date,
                    max_students, max_teachers, max_departments, max_storage_gb)
               VALUES ($1, $2, $3, $4, $5, 'trial', $6, $7, $8, $9, $10, $11, $12)
               RETURNING *"#,
        )
        .bind(&dto.college_name)
        .bind(&slug)
        .bind(&subdomain)
        .bind(college_email.as_str())
        .bind(&dto.phone)
        .bind(&plan.slug)
        .bind(now.date_naive())
        .bind(trial_end.date_naive())
        .bind(plan.max_students)
        .bind(plan.max_teachers)
        .bind(plan.max_departments)
        .bind(plan.max_storage_gb)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation(
            "A college with this name or subdomain already exists",
        ))?;

        let user_id = sqlx::query_scalar::<_, UserId>(
            r#"INSERT INTO users (tenant_id, role_id, email, password, first_name, last_name, phone)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(tenant.id)
        .bind(system_roles::id_for(RoleName::TenantAdmin))
        .bind(&dto.email)
        .bind(&password)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation("A user with this email already exists"))?;

        sqlx::query(
            r#"INSERT INTO tenant_subscriptions
                   (tenant_id, plan_id, status, start_date, trial_end_date, next_billing_date)
               VALUES ($1, $2, 'trial', $3, $4, $4)"#,
        )
        .bind(tenant.id)
        .bind(plan.id)
        .bind(now)
        .bind(trial_end)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tenant.id = %tenant.id, tenant.slug = %tenant.slug, "College signed up");
        track_tenant_created("signup");
        track_user_created(RoleName::TenantAdmin.as_str());
        track_subscription_event("trial_started", &plan.slug);

        let mailer = EmailService::new(email_config.clone());
        EmailService::send_or_log(
            "welcome",
            mailer.send_welcome_email(dto.email.as_str(), &dto.first_name, &tenant.name),
        )
        .await;

        Self::issue_tokens(db, jwt_config, user_id).await
    }

    /// Issues a reset link when the address belongs to an active user. The
    /// answer is the same either way.
    #[instrument(skip(db, email_config, dto), fields(db.table = "password_reset_tokens", db.operation = "INSERT"))]
    pub async fn forgot_password(
        db: &PgPool,
        email_config: &EmailConfig,
        dto: ForgotPasswordRequest,
    ) -> Result<MessageResponse, AppError> {
        let user = sqlx::query_as::<_, (UserId, String)>(
            "SELECT id, first_name FROM users WHERE email = $1 AND is_active = TRUE",
        )
        .bind(&dto.email)
        .fetch_optional(db)
        .await?;

        if let Some((user_id, first_name)) = user {
            let token = generate_reset_token();
            let mut tx = db.begin().await?;
            sqlx::query(
                "UPDATE password_reset_tokens SET used = TRUE WHERE user_id = $1 AND used = FALSE",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(hash_reset_token(&token))
            .bind(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES))
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            let mailer = EmailService::new(email_config.clone());
            EmailService::send_or_log(
                "password_reset",
                mailer.send_password_reset_email(dto.email.as_str(), &first_name, &token),
            )
            .await;
        }

        Ok(MessageResponse::new(FORGOT_PASSWORD_MESSAGE))
    }

    #[instrument(skip(db, email_config, dto, client), fields(db.table = "password_reset_tokens", db.operation = "UPDATE"))]
    pub async fn reset_password(
        db: &PgPool,
        email_config: &EmailConfig,
        dto: ResetPasswordRequest,
        client: &ClientInfo,
    ) -> Result<MessageResponse, AppError> {
        let mut tx = db.begin().await?;

        let token = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT id, user_id, expires_at, used FROM password_reset_tokens WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(hash_reset_token(&dto.token))
        .fetch_optional(&mut *tx)
        .await?
        .filter(|t| t.is_usable(Utc::now()))
        .ok_or_else(|| AppError::bad_request(anyhow!(INVALID_RESET_TOKEN)))?;

        let password = hash_password(&dto.new_password)?;
        let (email, first_name, tenant_id) =
            sqlx::query_as::<_, (String, String, Option<TenantId>)>(
                r#"UPDATE users SET password = $2, updated_at = NOW()
                   WHERE id = $1
                   RETURNING email, first_name, tenant_id"#,
            )
            .bind(token.user_id)
            .bind(&password)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1")
            .bind(token.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let mailer = EmailService::new(email_config.clone());
        EmailService::send_or_log(
            "password_reset_confirmation",
            mailer.send_password_reset_confirmation(&email, &first_name),
        )
        .await;

        create_audit_log(
            db,
            NewAuditLog {
                user_id: Some(token.user_id),
                tenant_id,
                resource_id: Some(token.user_id.to_string()),
                description: "Password reset with emailed token".to_string(),
                ..client.event("password_reset", "users")
            },
        )
        .await;

        Ok(MessageResponse::new("Password has been reset successfully"))
    }

    pub async fn logout(
        db: &PgPool,
        user_id: UserId,
        tenant_id: Option<TenantId>,
        client: &ClientInfo,
    ) -> MessageResponse {
        create_audit_log(
            db,
            NewAuditLog {
                user_id: Some(user_id),
                tenant_id,
                description: "Signed out".to_string(),
                ..client.event("logout", "auth")
            },
        )
        .await;

        MessageResponse::new("Logged out successfully")
    }
}
