use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::moderation::target::{Target, TargetType};

/// Report status enum with state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    ActionTaken,
}

impl ReportStatus {
    /// Validate state transition
    ///
    /// `pending -> reviewed | action_taken`, `reviewed -> action_taken`, and a
    /// terminal status may be re-applied to edit the admin note.
    pub fn can_transition_to(&self, new_status: ReportStatus) -> bool {
        matches!(
            (self, new_status),
            (ReportStatus::Pending, ReportStatus::Reviewed)
                | (ReportStatus::Pending, ReportStatus::ActionTaken)
                | (ReportStatus::Reviewed, ReportStatus::ActionTaken)
                | (ReportStatus::Reviewed, ReportStatus::Reviewed)
                | (ReportStatus::ActionTaken, ReportStatus::ActionTaken)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::ActionTaken => "action_taken",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_reason")]
pub enum ReportReason {
    #[sqlx(rename = "Spam or misleading")]
    #[serde(rename = "Spam or misleading")]
    Spam,
    #[sqlx(rename = "Harassment or bullying")]
    #[serde(rename = "Harassment or bullying")]
    Harassment,
    #[sqlx(rename = "Hate speech or discrimination")]
    #[serde(rename = "Hate speech or discrimination")]
    HateSpeech,
    #[sqlx(rename = "Inappropriate or sexual content")]
    #[serde(rename = "Inappropriate or sexual content")]
    Inappropriate,
    Other,
}

/// Stored report
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub custom_reason: Option<String>,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<Uuid>,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn target(&self) -> Target {
        Target::from_parts(self.target_type, self.target_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_status_transitions() {
        assert!(ReportStatus::Pending.can_transition_to(ReportStatus::Reviewed));
        assert!(ReportStatus::Pending.can_transition_to(ReportStatus::ActionTaken));
        assert!(ReportStatus::Reviewed.can_transition_to(ReportStatus::ActionTaken));
        assert!(ReportStatus::Reviewed.can_transition_to(ReportStatus::Reviewed));
        assert!(ReportStatus::ActionTaken.can_transition_to(ReportStatus::ActionTaken));

        assert!(!ReportStatus::ActionTaken.can_transition_to(ReportStatus::Reviewed));
        assert!(!ReportStatus::ActionTaken.can_transition_to(ReportStatus::Pending));
        assert!(!ReportStatus::Reviewed.can_transition_to(ReportStatus::Pending));
        assert!(!ReportStatus::Pending.can_transition_to(ReportStatus::Pending));
    }

    #[test]
    fn test_reason_wire_format() {
        let reason: ReportReason = serde_json::from_str("\"Harassment or bullying\"").unwrap();
        assert_eq!(reason, ReportReason::Harassment);
        assert_eq!(serde_json::to_string(&ReportReason::Other).unwrap(), "\"Other\"");
        assert!(serde_json::from_str::<ReportReason>("\"Boring\"").is_err());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::ActionTaken).unwrap(),
            "\"action_taken\""
        );
    }
}
