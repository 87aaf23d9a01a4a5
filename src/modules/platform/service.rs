use anyhow::anyhow;
use campusflow_cache::{RedisCache, invalidate, keys};
use campusflow_core::{AppError, Paginated, codes::generate_unique_code};
use campusflow_models::{
    GlobalAnnouncement, GlobalAnnouncementType, Priority, SettingDataType, SettingView,
    SupportTicket, SystemSetting, TenantId, TicketCategory, TicketComment, TicketWithComments,
    UserId, platform::TICKET_PREFIX,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::modules::platform::model::{
    CreateCommentDto, CreateGlobalAnnouncementDto, CreateSettingDto, CreateTicketDto,
    TicketFilterParams, UpdateGlobalAnnouncementDto, UpdateSettingDto, UpdateTicketDto,
    check_window,
};
use crate::utils::db::unique_violation;

pub struct TicketService;

impl TicketService {
    async fn next_ticket_number(db: &PgPool) -> Result<String, AppError> {
        loop {
            let candidate = generate_unique_code(TICKET_PREFIX, 8);
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM support_tickets WHERE ticket_number = $1)",
            )
            .bind(&candidate)
            .fetch_one(db)
            .await?;
            if !taken {
                return Ok(candidate);
            }
        }
    }

    #[instrument(skip(db, dto), fields(db.table = "support_tickets", db.operation = "INSERT"))]
    pub async fn create_ticket(
        db: &PgPool,
        tenant_id: TenantId,
        created_by: UserId,
        dto: CreateTicketDto,
    ) -> Result<SupportTicket, AppError> {
        let ticket_number = Self::next_ticket_number(db).await?;
        let ticket = sqlx::query_as::<_, SupportTicket>(
            r#"INSERT INTO support_tickets
                   (ticket_number, tenant_id, created_by, subject, description, category, priority)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(&ticket_number)
        .bind(tenant_id)
        .bind(created_by)
        .bind(&dto.subject)
        .bind(&dto.description)
        .bind(dto.category.unwrap_or(TicketCategory::General))
        .bind(dto.priority.unwrap_or(Priority::Medium))
        .fetch_one(db)
        .await
        .map_err(unique_violation("Ticket number collision, please retry"))?;

        info!(ticket.number = %ticket.ticket_number, %tenant_id, "Support ticket opened");
        Ok(ticket)
    }

    /// Tickets newest first. `tenant_id` pins the list to one college; when
    /// `None` the filter's own tenant is used, if any.
    #[instrument(skip(db), fields(db.table = "support_tickets", db.operation = "SELECT"))]
    pub async fn list_tickets(
        db: &PgPool,
        tenant_id: Option<TenantId>,
        filters: TicketFilterParams,
    ) -> Result<Paginated<SupportTicket>, AppError> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR priority = $3)"#;

        let tenant = tenant_id.map(TenantId::into_inner).or(filters.tenant_id);

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM support_tickets{WHERE}"))
                .bind(tenant)
                .bind(filters.status)
                .bind(filters.priority)
                .fetch_one(db)
                .await?;

        let tickets = sqlx::query_as::<_, SupportTicket>(&format!(
            "SELECT * FROM support_tickets{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(tenant)
        .bind(filters.status)
        .bind(filters.priority)
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(tickets, total, &filters.pagination))
    }

    async fn find_ticket(
        db: &PgPool,
        ticket_id: Uuid,
        tenant_id: Option<TenantId>,
    ) -> Result<SupportTicket, AppError> {
        sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)",
        )
        .bind(ticket_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Ticket not found")))
    }

    /// A ticket with its thread. Colleges (`tenant_id` set) never see
    /// internal notes.
    #[instrument(skip(db), fields(db.table = "support_tickets", db.operation = "SELECT"))]
    pub async fn get_ticket(
        db: &PgPool,
        ticket_id: Uuid,
        tenant_id: Option<TenantId>,
    ) -> Result<TicketWithComments, AppError> {
        let ticket = Self::find_ticket(db, ticket_id, tenant_id).await?;
        let include_internal = tenant_id.is_none();

        let comments = sqlx::query_as::<_, TicketComment>(
            r#"SELECT * FROM ticket_comments
               WHERE ticket_id = $1 AND ($2 OR is_internal = FALSE)
               ORDER BY created_at"#,
        )
        .bind(ticket_id)
        .bind(include_internal)
        .fetch_all(db)
        .await?;

        Ok(TicketWithComments { ticket, comments })
    }

    #[instrument(skip(db, dto), fields(db.table = "ticket_comments", db.operation = "INSERT"))]
    pub async fn add_comment(
        db: &PgPool,
        ticket_id: Uuid,
        tenant_id: Option<TenantId>,
        author_id: UserId,
        dto: CreateCommentDto,
    ) -> Result<TicketComment, AppError> {
        Self::find_ticket(db, ticket_id, tenant_id).await?;
        let is_internal = tenant_id.is_none() && dto.is_internal;

        let comment = sqlx::query_as::<_, TicketComment>(
            r#"INSERT INTO ticket_comments (ticket_id, author_id, message, is_internal)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(ticket_id)
        .bind(author_id)
        .bind(&dto.message)
        .bind(is_internal)
        .fetch_one(db)
        .await?;

        sqlx::query("UPDATE support_tickets SET updated_at = NOW() WHERE id = $1")
            .bind(ticket_id)
            .execute(db)
            .await?;

        Ok(comment)
    }

    /// Status, priority and assignment changes from the company portal.
    /// Reaching `resolved` or `closed` stamps the matching timestamp once.
    #[instrument(skip(db, dto), fields(db.table = "support_tickets", db.operation = "UPDATE"))]
    pub async fn update_ticket(
        db: &PgPool,
        ticket_id: Uuid,
        dto: UpdateTicketDto,
    ) -> Result<SupportTicket, AppError> {
        if let Some(assignee) = dto.assigned_to {
            let is_staff = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND tenant_id IS NULL)",
            )
            .bind(assignee)
            .fetch_one(db)
            .await?;
            if !is_staff {
                return Err(AppError::bad_request(anyhow!(
                    "Tickets can only be assigned to platform administrators"
                )));
            }
        }

        sqlx::query_as::<_, SupportTicket>(
            r#"UPDATE support_tickets SET
                   status = COALESCE($2, status),
                   priority = COALESCE($3, priority),
                   assigned_to = COALESCE($4, assigned_to),
                   resolved_at = CASE WHEN $2 = 'resolved' THEN COALESCE(resolved_at, NOW()) ELSE resolved_at END,
                   closed_at = CASE WHEN $2 = 'closed' THEN COALESCE(closed_at, NOW()) ELSE closed_at END,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(ticket_id)
        .bind(dto.status)
        .bind(dto.priority)
        .bind(dto.assigned_to)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Ticket not found")))
    }
}

pub struct SettingService;

impl SettingService {
    #[instrument(skip(db), fields(db.table = "system_settings", db.operation = "SELECT"))]
    pub async fn list_settings(db: &PgPool) -> Result<Vec<SettingView>, AppError> {
        let settings =
            sqlx::query_as::<_, SystemSetting>("SELECT * FROM system_settings ORDER BY key")
                .fetch_all(db)
                .await?;
        Ok(settings.into_iter().map(SettingView::from).collect())
    }

    /// Settings flagged public, served to every signed-in user. Cached when
    /// Redis is available.
    #[instrument(skip(db, cache))]
    pub async fn public_settings(
        db: &PgPool,
        cache: Option<&RedisCache>,
    ) -> Result<Vec<SettingView>, AppError> {
        let load = || async {
            sqlx::query_as::<_, SystemSetting>(
                "SELECT * FROM system_settings WHERE is_public = TRUE ORDER BY key",
            )
            .fetch_all(db)
            .await
            .map(Some)
        };

        let settings = match cache {
            Some(cache) => {
                cache
                    .get_or_load(&keys::settings::public_list(), cache.default_ttl(), load)
                    .await?
            }
            None => load().await?,
        };

        Ok(settings
            .unwrap_or_default()
            .into_iter()
            .map(SettingView::from)
            .collect())
    }

    #[instrument(skip(db), fields(db.table = "system_settings", db.operation = "SELECT"))]
    pub async fn get_setting(db: &PgPool, key: &str) -> Result<SettingView, AppError> {
        sqlx::query_as::<_, SystemSetting>("SELECT * FROM system_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(db)
            .await?
            .map(SettingView::from)
            .ok_or_else(|| AppError::not_found(anyhow!("Setting not found")))
    }

    #[instrument(skip(db, cache, dto), fields(db.table = "system_settings", db.operation = "INSERT", setting.key = %dto.key))]
    pub async fn create_setting(
        db: &PgPool,
        cache: Option<&RedisCache>,
        dto: CreateSettingDto,
    ) -> Result<SettingView, AppError> {
        let setting = sqlx::query_as::<_, SystemSetting>(
            r#"INSERT INTO system_settings (key, value, description, data_type, is_public)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(&dto.key)
        .bind(&dto.value)
        .bind(&dto.description)
        .bind(dto.data_type.unwrap_or(SettingDataType::Text))
        .bind(dto.is_public.unwrap_or(false))
        .fetch_one(db)
        .await
        .map_err(unique_violation("A setting with this key already exists"))?;

        invalidate::settings(cache).await;
        Ok(setting.into())
    }

    #[instrument(skip(db, cache, dto), fields(db.table = "system_settings", db.operation = "UPDATE"))]
    pub async fn update_setting(
        db: &PgPool,
        cache: Option<&RedisCache>,
        key: &str,
        dto: UpdateSettingDto,
    ) -> Result<SettingView, AppError> {
        let setting = sqlx::query_as::<_, SystemSetting>(
            r#"UPDATE system_settings SET
                   value = COALESCE($2, value),
                   description = COALESCE($3, description),
                   data_type = COALESCE($4, data_type),
                   is_public = COALESCE($5, is_public),
                   updated_at = NOW()
               WHERE key = $1
               RETURNING *"#,
        )
        .bind(key)
        .bind(&dto.value)
        .bind(&dto.description)
        .bind(dto.data_type)
        .bind(dto.is_public)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Setting not found")))?;

        invalidate::settings(cache).await;
        Ok(setting.into())
    }

    #[instrument(skip(db, cache), fields(db.table = "system_settings", db.operation = "DELETE"))]
    pub async fn delete_setting(
        db: &PgPool,
        cache: Option<&RedisCache>,
        key: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM system_settings WHERE key = $1")
            .bind(key)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Setting not found")));
        }

        invalidate::settings(cache).await;
        Ok(())
    }
}

pub struct GlobalAnnouncementService;

impl GlobalAnnouncementService {
    #[instrument(skip(db), fields(db.table = "global_announcements", db.operation = "SELECT"))]
    pub async fn list_announcements(db: &PgPool) -> Result<Vec<GlobalAnnouncement>, AppError> {
        let announcements = sqlx::query_as::<_, GlobalAnnouncement>(
            "SELECT * FROM global_announcements ORDER BY start_date DESC",
        )
        .fetch_all(db)
        .await?;
        Ok(announcements)
    }

    /// Announcements a member of `tenant_id` should see right now.
    #[instrument(skip(db), fields(db.table = "global_announcements", db.operation = "SELECT"))]
    pub async fn visible_for(
        db: &PgPool,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<GlobalAnnouncement>, AppError> {
        let now = Utc::now();
        let candidates = sqlx::query_as::<_, GlobalAnnouncement>(
            r#"SELECT * FROM global_announcements
               WHERE is_active = TRUE AND start_date <= $1
               ORDER BY start_date DESC"#,
        )
        .bind(now)
        .fetch_all(db)
        .await?;

        Ok(candidates
            .into_iter()
            .filter(|a| a.is_visible(now) && a.targets(tenant_id))
            .collect())
    }

    #[instrument(skip(db), fields(db.table = "global_announcements", db.operation = "SELECT"))]
    pub async fn get_announcement(db: &PgPool, id: Uuid) -> Result<GlobalAnnouncement, AppError> {
        sqlx::query_as::<_, GlobalAnnouncement>("SELECT * FROM global_announcements WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Announcement not found")))
    }

    #[instrument(skip(db, dto), fields(db.table = "global_announcements", db.operation = "INSERT"))]
    pub async fn create_announcement(
        db: &PgPool,
        created_by: UserId,
        dto: CreateGlobalAnnouncementDto,
    ) -> Result<GlobalAnnouncement, AppError> {
        let start_date = dto.start_date.unwrap_or_else(Utc::now);
        check_window(start_date, dto.end_date).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let targets = dto.target_tenant_ids.unwrap_or_default();
        let target_all = dto.target_all_tenants.unwrap_or(targets.is_empty());
        if !target_all && targets.is_empty() {
            warn!("Announcement targets no tenant");
        }

        let announcement = sqlx::query_as::<_, GlobalAnnouncement>(
            r#"INSERT INTO global_announcements
                   (title, message, announcement_type, start_date, end_date, is_active,
                    show_on_login, target_all_tenants, target_tenant_ids, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(&dto.title)
        .bind(&dto.message)
        .bind(dto.announcement_type.unwrap_or(GlobalAnnouncementType::Info))
        .bind(start_date)
        .bind(dto.end_date)
        .bind(dto.is_active.unwrap_or(true))
        .bind(dto.show_on_login.unwrap_or(false))
        .bind(target_all)
        .bind(&targets)
        .bind(created_by)
        .fetch_one(db)
        .await?;

        Ok(announcement)
    }

    #[instrument(skip(db, dto), fields(db.table = "global_announcements", db.operation = "UPDATE"))]
    pub async fn update_announcement(
        db: &PgPool,
        id: Uuid,
        dto: UpdateGlobalAnnouncementDto,
    ) -> Result<GlobalAnnouncement, AppError> {
        let existing = Self::get_announcement(db, id).await?;
        let start_date = dto.start_date.unwrap_or(existing.start_date);
        let end_date = dto.end_date.or(existing.end_date);
        check_window(start_date, end_date).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let announcement = sqlx::query_as::<_, GlobalAnnouncement>(
            r#"UPDATE global_announcements SET
                   title = COALESCE($2, title),
                   message = COALESCE($3, message),
                   announcement_type = COALESCE($4, announcement_type),
                   start_date = $5,
                   end_date = $6,
                   is_active = COALESCE($7, is_active),
                   show_on_login = COALESCE($8, show_on_login),
                   target_all_tenants = COALESCE($9, target_all_tenants),
                   target_tenant_ids = COALESCE($10, target_tenant_ids),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&dto.title)
        .bind(&dto.message)
        .bind(dto.announcement_type)
        .bind(start_date)
        .bind(end_date)
        .bind(dto.is_active)
        .bind(dto.show_on_login)
        .bind(dto.target_all_tenants)
        .bind(&dto.target_tenant_ids)
        .fetch_one(db)
        .await?;

        Ok(announcement)
    }

    #[instrument(skip(db), fields(db.table = "global_announcements", db.operation = "DELETE"))]
    pub async fn delete_announcement(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM global_announcements WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Announcement not found")));
        }
        Ok(())
    }
}
