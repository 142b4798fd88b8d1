/// Mute/block persistence, interaction guards and per-viewer visibility
use crate::db::{reaction_repo, relation_repo};
use crate::error::{AppError, Result};
use crate::models::{BlockedUser, Role, User};
use crate::moderation::registry::MutedLists;
use crate::moderation::{
    BlockEntry, BlockRegistry, MuteEntry, MuteRegistry, Target, Toggle, ViewerContext,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

pub struct RelationService {
    pool: PgPool,
}

impl RelationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the visibility filter for `viewer`
    pub async fn viewer_context(
        &self,
        viewer: Option<&User>,
        include_hidden: bool,
    ) -> Result<ViewerContext> {
        let Some(user) = viewer else {
            return Ok(ViewerContext::anonymous());
        };

        let mutes = relation_repo::list_mutes(&self.pool, user.id).await?;
        let blocked = relation_repo::mutual_blocks(&self.pool, user.id).await?;

        let mut ctx = ViewerContext {
            viewer: Some(user.id),
            is_admin: user.is_admin(),
            blocked_users: blocked.into_iter().collect(),
            ..ViewerContext::default()
        };
        for row in mutes {
            match MuteEntry::from(row).target {
                Target::User(id) => ctx.muted_users.insert(id),
                Target::Comment(id) => ctx.muted_comments.insert(id),
                Target::Reply(id) => ctx.muted_replies.insert(id),
            };
        }

        Ok(ctx.with_hidden(include_hidden))
    }

    /// Reject an interaction between users when either blocked the other
    pub async fn ensure_not_blocked(&self, actor: Uuid, owner: Uuid) -> Result<()> {
        if actor == owner {
            return Ok(());
        }

        match relation_repo::block_status(&self.pool, actor, owner).await? {
            (true, _) => Err(AppError::Forbidden(
                "You have blocked this user. Interaction denied".to_string(),
            )),
            (_, true) => Err(AppError::Forbidden(
                "This user has blocked you. Interaction denied".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Users count only while active
    pub async fn target_exists(&self, target: Target) -> Result<bool> {
        let sql = match target {
            Target::User(_) => "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active = TRUE)",
            Target::Comment(_) => "SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)",
            Target::Reply(_) => "SELECT EXISTS (SELECT 1 FROM replies WHERE id = $1)",
        };
        let exists: bool = sqlx::query_scalar(sql)
            .bind(target.id())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    // =================================================================
    // Mutes
    // =================================================================

    async fn mute_registry(&self, user_id: Uuid) -> Result<MuteRegistry> {
        let rows = relation_repo::list_mutes(&self.pool, user_id).await?;
        Ok(MuteRegistry::new(
            user_id,
            rows.into_iter().map(MuteEntry::from).collect(),
        ))
    }

    pub async fn toggle_mute(
        &self,
        user_id: Uuid,
        target: Target,
        reason: Option<&str>,
    ) -> Result<Toggle<MuteEntry>> {
        let mut registry = self.mute_registry(user_id).await?;

        // Unmuting a deleted target must still work
        if !registry.contains(target) && !self.target_exists(target).await? {
            return Err(AppError::NotFound(format!("{} not found", target.target_type())));
        }

        let outcome = registry.toggle(target, reason, Utc::now())?;
        match &outcome {
            Toggle::Added(entry) => relation_repo::insert_mute(&self.pool, user_id, entry).await?,
            Toggle::Removed(entry) => {
                relation_repo::delete_mute(&self.pool, user_id, entry).await?;
            }
        }

        tracing::info!(
            user_id = %user_id,
            target_type = %target.target_type(),
            target_id = %target.id(),
            muted = outcome.is_added(),
            "mute toggled"
        );
        Ok(outcome)
    }

    pub async fn unmute(&self, user_id: Uuid, target: Target) -> Result<MuteEntry> {
        let mut registry = self.mute_registry(user_id).await?;
        let entry = registry
            .remove(target)
            .ok_or_else(|| AppError::NotFound("Mute entry not found".to_string()))?;
        relation_repo::delete_mute(&self.pool, user_id, &entry).await?;
        Ok(entry)
    }

    pub async fn muted_lists(&self, user_id: Uuid) -> Result<MutedLists> {
        Ok(self.mute_registry(user_id).await?.grouped())
    }

    // =================================================================
    // Blocks
    // =================================================================

    /// Toggle a block; adding one also severs engagement in both directions
    pub async fn toggle_block(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Toggle<BlockEntry>> {
        if target_id == user_id {
            return Err(AppError::BadRequest("You cannot block yourself".to_string()));
        }

        let target_role: Option<Role> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = $1 AND is_active = TRUE")
                .bind(target_id)
                .fetch_optional(&self.pool)
                .await?;

        let rows = relation_repo::list_blocks(&self.pool, user_id).await?;
        let mut registry =
            BlockRegistry::new(user_id, rows.into_iter().map(BlockEntry::from).collect());

        let target_is_admin = match target_role {
            Some(role) => role == Role::Admin,
            None if registry.contains(target_id) => false,
            None => {
                return Err(AppError::NotFound("Target user does not exist".to_string()));
            }
        };

        let outcome = registry.toggle(target_id, target_is_admin, reason, Utc::now())?;
        match &outcome {
            Toggle::Added(entry) => {
                let mut tx = self.pool.begin().await?;
                relation_repo::insert_block(&mut *tx, user_id, entry).await?;
                let reactions = reaction_repo::sever_reactions(&mut *tx, user_id, target_id).await?;
                let saved = relation_repo::sever_saved_posts(&mut *tx, user_id, target_id).await?;
                tx.commit().await?;

                tracing::info!(
                    blocker_id = %user_id,
                    blocked_id = %target_id,
                    reactions_removed = reactions,
                    saved_posts_removed = saved,
                    "user blocked"
                );
            }
            Toggle::Removed(_) => {
                relation_repo::delete_block(&self.pool, user_id, target_id).await?;
                tracing::info!(blocker_id = %user_id, blocked_id = %target_id, "user unblocked");
            }
        }

        Ok(outcome)
    }

    pub async fn blocked_users(&self, user_id: Uuid) -> Result<Vec<BlockedUser>> {
        Ok(relation_repo::list_blocked_users(&self.pool, user_id).await?)
    }
}
