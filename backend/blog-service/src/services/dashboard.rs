/// Admin moderation dashboard aggregates
use crate::error::Result;
use crate::moderation::TargetType;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const DELETED_PLACEHOLDER: &str = "[deleted]";

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_reports: i64,
    pub pending: i64,
    pub reviewed: i64,
    pub action_taken: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopReporter {
    pub id: Uuid,
    pub username: String,
    pub count: i64,
}

#[derive(Debug, FromRow)]
struct TargetCount {
    target_type: TargetType,
    target_id: Uuid,
    count: i64,
}

#[derive(Debug, FromRow)]
struct TargetSnapshot {
    content: String,
    is_hidden: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedTarget {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub count: i64,
    pub content: String,
    pub is_hidden: bool,
}

impl ReportedTarget {
    fn new(target: TargetCount, snapshot: Option<TargetSnapshot>) -> Self {
        let (content, is_hidden) = match snapshot {
            Some(s) => (s.content, s.is_hidden),
            None => (DELETED_PLACEHOLDER.to_string(), true),
        };
        Self {
            id: target.target_id,
            target_type: target.target_type,
            count: target.count,
            content,
            is_hidden,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub summary: ReportSummary,
    pub top_reporters: Vec<TopReporter>,
    pub most_reported: Vec<ReportedTarget>,
}

pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load(&self) -> Result<Dashboard> {
        let summary = sqlx::query_as::<_, ReportSummary>(
            r#"
            SELECT COUNT(*) AS total_reports,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'reviewed') AS reviewed,
                   COUNT(*) FILTER (WHERE status = 'action_taken') AS action_taken
            FROM reports
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let top_reporters = sqlx::query_as::<_, TopReporter>(
            r#"
            SELECT u.id, u.username, COUNT(*) AS count
            FROM reports r
            JOIN users u ON u.id = r.reporter_id
            GROUP BY u.id, u.username
            ORDER BY count DESC, u.username ASC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let targets = sqlx::query_as::<_, TargetCount>(
            r#"
            SELECT target_type, target_id, COUNT(*) AS count
            FROM reports
            GROUP BY target_type, target_id
            ORDER BY count DESC, MAX(created_at) DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut most_reported = Vec::with_capacity(targets.len());
        for target in targets {
            let snapshot = self.snapshot(target.target_type, target.target_id).await?;
            most_reported.push(ReportedTarget::new(target, snapshot));
        }

        Ok(Dashboard {
            summary,
            top_reporters,
            most_reported,
        })
    }

    /// Current content of a reported entity; users show their username
    /// and soft-ban flag
    async fn snapshot(&self, target_type: TargetType, id: Uuid) -> Result<Option<TargetSnapshot>> {
        let sql = match target_type {
            TargetType::Comment => "SELECT content, is_hidden FROM comments WHERE id = $1",
            TargetType::Reply => "SELECT content, is_hidden FROM replies WHERE id = $1",
            TargetType::User => {
                "SELECT username AS content, is_soft_banned AS is_hidden FROM users WHERE id = $1"
            }
        };

        let snapshot = sqlx::query_as::<_, TargetSnapshot>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_target_renders_as_deleted() {
        let target = TargetCount {
            target_type: TargetType::Comment,
            target_id: Uuid::nil(),
            count: 3,
        };
        let row = ReportedTarget::new(target, None);
        assert_eq!(row.content, "[deleted]");
        assert!(row.is_hidden);

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "Comment");
        assert_eq!(json["isHidden"], true);
    }
}
