/// Report service - intake, admin review and the moderation side effects
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Report, ReportStatus, User};
use crate::moderation::{ModerationAction, ReportDraft, ReviewPlan};
use crate::services::RelationService;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const REPORT_COLUMNS: &str = "id, reporter_id, target_type, target_id, reason, custom_reason, \
     details, status, reviewed_by, admin_note, created_at, updated_at";

const DUPLICATE_REPORT: &str = "You already reported this content";

/// Admin review request
#[derive(Debug, Clone, Default)]
pub struct ReviewRequest {
    pub status: Option<ReportStatus>,
    pub admin_note: Option<String>,
}

/// Apply `action` inside the review transaction
async fn apply_action(conn: &mut PgConnection, action: ModerationAction) -> Result<()> {
    let (sql, id, kind) = match action {
        ModerationAction::HideComment(id) => (
            "UPDATE comments SET is_hidden = TRUE, updated_at = NOW() WHERE id = $1",
            id,
            "Comment",
        ),
        ModerationAction::HideReply(id) => (
            "UPDATE replies SET is_hidden = TRUE, updated_at = NOW() WHERE id = $1",
            id,
            "Reply",
        ),
        ModerationAction::SoftBanUser { user_id, until } => {
            let updated = sqlx::query(
                r#"
                UPDATE users SET is_soft_banned = TRUE, soft_ban_expires = $2, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .bind(until)
            .execute(&mut *conn)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(AppError::not_found_by_id("User", user_id));
            }
            return Ok(());
        }
    };

    let updated = sqlx::query(sql).bind(id).execute(&mut *conn).await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::not_found_by_id(kind, id));
    }
    Ok(())
}

pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find(&self, report_id: Uuid) -> Result<Report> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("report", report_id))
    }

    pub async fn create(&self, draft: ReportDraft) -> Result<Report> {
        let target = draft.target;

        if !RelationService::new(self.pool.clone())
            .target_exists(target)
            .await?
        {
            return Err(AppError::NotFound(format!("{} not found", target.target_type())));
        }

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reports
                WHERE reporter_id = $1 AND target_type = $2 AND target_id = $3
            )
            "#,
        )
        .bind(draft.reporter_id)
        .bind(target.target_type())
        .bind(target.id())
        .fetch_one(&self.pool)
        .await?;
        if duplicate {
            return Err(AppError::BadRequest(DUPLICATE_REPORT.to_string()));
        }

        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reports (reporter_id, target_type, target_id, reason, custom_reason, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(draft.reporter_id)
        .bind(target.target_type())
        .bind(target.id())
        .bind(draft.reason)
        .bind(&draft.custom_reason)
        .bind(&draft.details)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err)
                if db_err.constraint() == Some("reports_reporter_target_key") =>
            {
                AppError::BadRequest(DUPLICATE_REPORT.to_string())
            }
            _ => AppError::from(err),
        })?;

        metrics::record_report(target.target_type().as_str());
        tracing::info!(
            report_id = %report.id,
            reporter_id = %report.reporter_id,
            target_type = %report.target_type,
            target_id = %report.target_id,
            "report filed"
        );
        Ok(report)
    }

    /// Update status and note; `action_taken` applies its side effect in
    /// the same transaction
    pub async fn review(&self, report_id: Uuid, admin: &User, request: ReviewRequest) -> Result<Report> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1 FOR UPDATE"
        ))
        .bind(report_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("report", report_id))?;

        let plan = ReviewPlan::new(
            current.status,
            request.status,
            request.admin_note,
            current.target(),
            Utc::now(),
        )?;

        if let Some(action) = plan.action {
            apply_action(&mut *tx, action).await?;
        }

        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            UPDATE reports SET status = $2, admin_note = $3, reviewed_by = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(report_id)
        .bind(plan.status)
        .bind(&plan.admin_note)
        .bind(admin.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(action) = plan.action {
            metrics::record_moderation_action(action.label());
        }
        tracing::info!(
            report_id = %report.id,
            admin_id = %admin.id,
            status = %report.status,
            action = plan.action.map(|a| a.label()).unwrap_or("none"),
            "report reviewed"
        );
        Ok(report)
    }

    pub async fn list(&self, status: Option<ReportStatus>) -> Result<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM reports
            WHERE ($1::report_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    /// Reporters may read their own reports; admins read any
    pub async fn get(&self, report_id: Uuid, viewer: &User) -> Result<Report> {
        let report = self.find(report_id).await?;
        if report.reporter_id != viewer.id && !viewer.is_admin() {
            return Err(AppError::Forbidden(
                "You do not have permission to perform this operation".to_string(),
            ));
        }
        Ok(report)
    }

    pub async fn delete(&self, report_id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found_by_id("report", report_id));
        }
        tracing::info!(report_id = %report_id, "report deleted");
        Ok(())
    }
}
