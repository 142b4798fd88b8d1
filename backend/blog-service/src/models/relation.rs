use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::moderation::{BlockEntry, MuteEntry, Target, TargetType};

#[derive(Debug, Clone, FromRow)]
pub struct MuteRow {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: String,
    pub muted_at: DateTime<Utc>,
}

impl From<MuteRow> for MuteEntry {
    fn from(row: MuteRow) -> Self {
        MuteEntry {
            target: Target::from_parts(row.target_type, row.target_id),
            reason: row.reason,
            muted_at: row.muted_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BlockRow {
    pub blocked_id: Uuid,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
}

impl From<BlockRow> for BlockEntry {
    fn from(row: BlockRow) -> Self {
        BlockEntry {
            blocked_id: row.blocked_id,
            reason: row.reason,
            blocked_at: row.blocked_at,
        }
    }
}

/// Row of `GET /blocks`
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockedUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
}
