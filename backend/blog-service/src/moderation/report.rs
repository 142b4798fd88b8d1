//! Report intake rules and the side effects of reviewing a report

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::target::Target;
use crate::error::{AppError, Result};
use crate::models::report::{ReportReason, ReportStatus};

pub const SOFT_BAN_DAYS: i64 = 7;
const CUSTOM_REASON_MAX: usize = 200;
const DETAILS_MAX: usize = 500;

/// A report that passed input validation, ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDraft {
    pub reporter_id: Uuid,
    pub target: Target,
    pub reason: ReportReason,
    pub custom_reason: Option<String>,
    pub details: Option<String>,
}

impl ReportDraft {
    /// Check everything that does not need the database
    pub fn validate(
        reporter_id: Uuid,
        target: Target,
        reason: ReportReason,
        custom_reason: Option<String>,
        details: Option<String>,
    ) -> Result<Self> {
        if target == Target::User(reporter_id) {
            return Err(AppError::BadRequest("You cannot report yourself".to_string()));
        }

        let custom_reason = custom_reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let custom_reason = match (reason, custom_reason) {
            (ReportReason::Other, None) => {
                return Err(AppError::BadRequest(
                    "Please provide a custom reason when selecting 'Other'".to_string(),
                ))
            }
            (ReportReason::Other, Some(text)) => {
                if text.chars().count() > CUSTOM_REASON_MAX {
                    return Err(AppError::BadRequest(format!(
                        "Custom reason cannot exceed {} characters",
                        CUSTOM_REASON_MAX
                    )));
                }
                Some(text)
            }
            (_, Some(_)) => {
                return Err(AppError::BadRequest(
                    "Custom reason is only allowed when reason is 'Other'".to_string(),
                ))
            }
            (_, None) => None,
        };

        let details = details
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(text) = &details {
            if text.chars().count() > DETAILS_MAX {
                return Err(AppError::BadRequest(format!(
                    "Details cannot exceed {} characters",
                    DETAILS_MAX
                )));
            }
        }

        Ok(Self {
            reporter_id,
            target,
            reason,
            custom_reason,
            details,
        })
    }
}

/// What an `action_taken` review does to the reported entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    HideComment(Uuid),
    HideReply(Uuid),
    SoftBanUser { user_id: Uuid, until: DateTime<Utc> },
}

impl ModerationAction {
    pub fn for_target(target: Target, now: DateTime<Utc>) -> Self {
        match target {
            Target::Comment(id) => ModerationAction::HideComment(id),
            Target::Reply(id) => ModerationAction::HideReply(id),
            Target::User(user_id) => ModerationAction::SoftBanUser {
                user_id,
                until: now + Duration::days(SOFT_BAN_DAYS),
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModerationAction::HideComment(_) => "hide_comment",
            ModerationAction::HideReply(_) => "hide_reply",
            ModerationAction::SoftBanUser { .. } => "soft_ban_user",
        }
    }
}

/// Outcome of validating an admin review request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPlan {
    pub status: ReportStatus,
    pub admin_note: String,
    pub action: Option<ModerationAction>,
}

impl ReviewPlan {
    /// Status defaults to `reviewed`, the note to an empty string
    pub fn new(
        current: ReportStatus,
        requested: Option<ReportStatus>,
        admin_note: Option<String>,
        target: Target,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let status = requested.unwrap_or(ReportStatus::Reviewed);
        if !current.can_transition_to(status) {
            return Err(AppError::BadRequest(format!(
                "Invalid transition: {} -> {}",
                current, status
            )));
        }

        let action = match status {
            ReportStatus::ActionTaken => Some(ModerationAction::for_target(target, now)),
            _ => None,
        };

        Ok(Self {
            status,
            admin_note: admin_note.unwrap_or_default(),
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_report_rejected() {
        let me = Uuid::new_v4();
        let err = ReportDraft::validate(me, Target::User(me), ReportReason::Spam, None, None)
            .unwrap_err();
        assert_eq!(err, AppError::BadRequest("You cannot report yourself".into()));

        // Reporting a comment whose id happens to equal the reporter id is fine
        assert!(
            ReportDraft::validate(me, Target::Comment(me), ReportReason::Spam, None, None).is_ok()
        );
    }

    #[test]
    fn test_custom_reason_rules() {
        let me = Uuid::new_v4();
        let target = Target::Comment(Uuid::new_v4());

        assert!(ReportDraft::validate(me, target, ReportReason::Other, None, None).is_err());
        assert!(
            ReportDraft::validate(me, target, ReportReason::Other, Some("   ".into()), None)
                .is_err()
        );
        assert!(ReportDraft::validate(
            me,
            target,
            ReportReason::Spam,
            Some("why".into()),
            None
        )
        .is_err());
        assert!(ReportDraft::validate(
            me,
            target,
            ReportReason::Other,
            Some("x".repeat(201)),
            None
        )
        .is_err());

        let draft = ReportDraft::validate(
            me,
            target,
            ReportReason::Other,
            Some("  off topic  ".into()),
            Some("x".repeat(500)),
        )
        .unwrap();
        assert_eq!(draft.custom_reason.as_deref(), Some("off topic"));
    }

    #[test]
    fn test_details_limit() {
        let me = Uuid::new_v4();
        let target = Target::Reply(Uuid::new_v4());
        assert!(ReportDraft::validate(
            me,
            target,
            ReportReason::Harassment,
            None,
            Some("x".repeat(501))
        )
        .is_err());
    }

    #[test]
    fn test_review_defaults() {
        let plan = ReviewPlan::new(
            ReportStatus::Pending,
            None,
            None,
            Target::Comment(Uuid::new_v4()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(plan.status, ReportStatus::Reviewed);
        assert_eq!(plan.admin_note, "");
        assert!(plan.action.is_none());
    }

    #[test]
    fn test_action_uses_stored_target() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let plan = ReviewPlan::new(
            ReportStatus::Reviewed,
            Some(ReportStatus::ActionTaken),
            Some("spam account".into()),
            Target::User(user),
            now,
        )
        .unwrap();
        assert_eq!(
            plan.action,
            Some(ModerationAction::SoftBanUser {
                user_id: user,
                until: now + Duration::days(7)
            })
        );

        let reply = Uuid::new_v4();
        let plan = ReviewPlan::new(
            ReportStatus::Pending,
            Some(ReportStatus::ActionTaken),
            None,
            Target::Reply(reply),
            now,
        )
        .unwrap();
        assert_eq!(plan.action, Some(ModerationAction::HideReply(reply)));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = ReviewPlan::new(
            ReportStatus::ActionTaken,
            Some(ReportStatus::Reviewed),
            None,
            Target::Comment(Uuid::new_v4()),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AppError::BadRequest("Invalid transition: action_taken -> reviewed".into())
        );
    }
}
