//! Per-user mute and block lists
//!
//! Both registries are in-memory views over one user's stored entries.
//! `toggle` decides whether an entry is added or removed and returns the
//! delta so the caller can persist exactly that change.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::target::Target;
use crate::error::AppError;

pub const DEFAULT_REASON: &str = "No reason provided";
const REASON_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle<E> {
    Added(E),
    Removed(E),
}

impl<E> Toggle<E> {
    pub fn is_added(&self) -> bool {
        matches!(self, Toggle::Added(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("You cannot mute yourself")]
    SelfMute,
    #[error("You cannot block yourself")]
    SelfBlock,
    #[error("You cannot block an admin account")]
    AdminTarget,
    #[error("Reason cannot exceed 50 characters")]
    ReasonTooLong,
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AdminTarget => AppError::Forbidden(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

/// Trim, default and bound a user supplied reason
pub fn normalize_reason(reason: Option<&str>) -> Result<String, RegistryError> {
    let trimmed = reason.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_REASON.to_string());
    }
    if trimmed.chars().count() > REASON_MAX {
        return Err(RegistryError::ReasonTooLong);
    }
    Ok(trimmed.to_string())
}

// =====================================================================
// Mutes
// =====================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteEntry {
    #[serde(flatten)]
    pub target: Target,
    pub reason: String,
    pub muted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct MuteRegistry {
    owner: Uuid,
    entries: Vec<MuteEntry>,
}

impl MuteRegistry {
    pub fn new(owner: Uuid, entries: Vec<MuteEntry>) -> Self {
        Self { owner, entries }
    }

    pub fn entries(&self) -> &[MuteEntry] {
        &self.entries
    }

    pub fn contains(&self, target: Target) -> bool {
        self.entries.iter().any(|e| e.target == target)
    }

    pub fn toggle(
        &mut self,
        target: Target,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Toggle<MuteEntry>, RegistryError> {
        if target == Target::User(self.owner) {
            return Err(RegistryError::SelfMute);
        }

        if let Some(removed) = self.remove(target) {
            return Ok(Toggle::Removed(removed));
        }

        let entry = MuteEntry {
            target,
            reason: normalize_reason(reason)?,
            muted_at: now,
        };
        self.entries.push(entry.clone());
        Ok(Toggle::Added(entry))
    }

    pub fn remove(&mut self, target: Target) -> Option<MuteEntry> {
        let pos = self.entries.iter().position(|e| e.target == target)?;
        Some(self.entries.remove(pos))
    }

    /// Split entries by kind for the `GET /mutes` response
    pub fn grouped(&self) -> MutedLists {
        let mut lists = MutedLists::default();
        for entry in &self.entries {
            match entry.target {
                Target::User(_) => lists.muted_users.push(entry.clone()),
                Target::Comment(_) => lists.muted_comments.push(entry.clone()),
                Target::Reply(_) => lists.muted_replies.push(entry.clone()),
            }
        }
        lists
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutedLists {
    pub muted_users: Vec<MuteEntry>,
    pub muted_comments: Vec<MuteEntry>,
    pub muted_replies: Vec<MuteEntry>,
}

// =====================================================================
// Blocks
// =====================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEntry {
    pub blocked_id: Uuid,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    owner: Uuid,
    entries: Vec<BlockEntry>,
}

impl BlockRegistry {
    pub fn new(owner: Uuid, entries: Vec<BlockEntry>) -> Self {
        Self { owner, entries }
    }

    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.blocked_id == user_id)
    }

    /// Block or unblock `target_id`
    ///
    /// Unblocking is always allowed; adding a block to an admin is not.
    pub fn toggle(
        &mut self,
        target_id: Uuid,
        target_is_admin: bool,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Toggle<BlockEntry>, RegistryError> {
        if target_id == self.owner {
            return Err(RegistryError::SelfBlock);
        }

        if let Some(pos) = self.entries.iter().position(|e| e.blocked_id == target_id) {
            return Ok(Toggle::Removed(self.entries.remove(pos)));
        }

        if target_is_admin {
            return Err(RegistryError::AdminTarget);
        }

        let entry = BlockEntry {
            blocked_id: target_id,
            reason: normalize_reason(reason)?,
            blocked_at: now,
        };
        self.entries.push(entry.clone());
        Ok(Toggle::Added(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_normalization() {
        assert_eq!(normalize_reason(None).unwrap(), DEFAULT_REASON);
        assert_eq!(normalize_reason(Some("   ")).unwrap(), DEFAULT_REASON);
        assert_eq!(normalize_reason(Some("  rude ")).unwrap(), "rude");
        assert_eq!(normalize_reason(Some(&"x".repeat(50))).unwrap().len(), 50);
        assert_eq!(
            normalize_reason(Some(&"x".repeat(51))),
            Err(RegistryError::ReasonTooLong)
        );
    }

    #[test]
    fn test_mute_toggle_twice_restores_state() {
        let owner = Uuid::new_v4();
        let existing = MuteEntry {
            target: Target::User(Uuid::new_v4()),
            reason: "spam".into(),
            muted_at: Utc::now(),
        };
        let mut registry = MuteRegistry::new(owner, vec![existing.clone()]);
        let target = Target::Comment(Uuid::new_v4());

        let first = registry.toggle(target, Some("noise"), Utc::now()).unwrap();
        assert!(first.is_added());
        assert!(registry.contains(target));

        let second = registry.toggle(target, None, Utc::now()).unwrap();
        assert!(!second.is_added());
        assert_eq!(registry.entries(), &[existing]);
    }

    #[test]
    fn test_mute_self_rejected() {
        let owner = Uuid::new_v4();
        let mut registry = MuteRegistry::new(owner, vec![]);
        assert_eq!(
            registry.toggle(Target::User(owner), None, Utc::now()),
            Err(RegistryError::SelfMute)
        );
    }

    #[test]
    fn test_same_id_different_kind_is_distinct() {
        let id = Uuid::new_v4();
        let mut registry = MuteRegistry::new(Uuid::new_v4(), vec![]);
        registry.toggle(Target::Comment(id), None, Utc::now()).unwrap();
        let result = registry.toggle(Target::Reply(id), None, Utc::now()).unwrap();
        assert!(result.is_added());
        assert_eq!(registry.entries().len(), 2);

        let grouped = registry.grouped();
        assert_eq!(grouped.muted_comments.len(), 1);
        assert_eq!(grouped.muted_replies.len(), 1);
        assert!(grouped.muted_users.is_empty());
    }

    #[test]
    fn test_block_toggle_and_admin_guard() {
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        let mut registry = BlockRegistry::new(owner, vec![]);

        assert_eq!(
            registry.toggle(owner, false, None, Utc::now()),
            Err(RegistryError::SelfBlock)
        );
        assert_eq!(
            registry.toggle(target, true, None, Utc::now()),
            Err(RegistryError::AdminTarget)
        );

        let added = registry.toggle(target, false, None, Utc::now()).unwrap();
        match added {
            Toggle::Added(entry) => assert_eq!(entry.reason, DEFAULT_REASON),
            other => panic!("expected Added, got {:?}", other),
        }

        // A user promoted to admin after being blocked can still be unblocked
        let removed = registry.toggle(target, true, None, Utc::now()).unwrap();
        assert!(!removed.is_added());
        assert!(registry.entries().is_empty());
    }

    #[test]
    fn test_registry_error_statuses() {
        assert!(matches!(
            AppError::from(RegistryError::AdminTarget),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(RegistryError::SelfMute),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn test_mute_entry_serialization() {
        let id = Uuid::new_v4();
        let entry = MuteEntry {
            target: Target::Reply(id),
            reason: DEFAULT_REASON.into(),
            muted_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["targetType"], "Reply");
        assert_eq!(json["targetId"], id.to_string());
        assert!(json.get("mutedAt").is_some());
    }
}
