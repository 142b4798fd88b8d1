/// Comment service - comment CRUD, reactions and visibility-filtered reads
use crate::db::{reaction_repo, Reactable};
use crate::error::{AppError, Result};
use crate::middleware::permissions::{check_comment_modification, ContentAction};
use crate::models::comment::COMMENT_SELECT;
use crate::models::{Comment, ReactionKind, User};
use crate::moderation::ViewerContext;
use crate::pagination::{Page, PageRequest};
use crate::services::RelationService;
use sqlx::PgPool;
use uuid::Uuid;

fn require_content(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest(
            "A comment must have a content".to_string(),
        ));
    }
    Ok(content)
}

pub struct CommentService {
    pool: PgPool,
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment =
            sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
                .bind(comment_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(comment)
    }

    async fn load(&self, comment_id: Uuid) -> Result<Comment> {
        self.find(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found_by_id("comment", comment_id))
    }

    /// Single read; hidden or muted comments are reported as missing
    pub async fn get(&self, comment_id: Uuid, ctx: &ViewerContext) -> Result<Comment> {
        let comment = self.load(comment_id).await?;
        if !ctx.can_see(&comment) {
            return Err(AppError::not_found_by_id("comment", comment_id));
        }
        Ok(comment)
    }

    pub async fn create(&self, post_id: Uuid, author: &User, content: &str) -> Result<Comment> {
        let content = require_content(content)?;

        let post_author: Uuid = sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found_by_id("post", post_id))?;

        RelationService::new(self.pool.clone())
            .ensure_not_blocked(author.id, post_author)
            .await?;

        let comment_id: Uuid = sqlx::query_scalar(
            "INSERT INTO comments (content, post_id, author_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(content)
        .bind(post_id)
        .bind(author.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(comment_id = %comment_id, post_id = %post_id, author_id = %author.id, "comment created");
        self.load(comment_id).await
    }

    pub async fn update(&self, comment_id: Uuid, actor: &User, content: &str) -> Result<Comment> {
        let content = require_content(content)?;
        let comment = self.load(comment_id).await?;
        check_comment_modification(actor, &comment, ContentAction::Update)?;

        sqlx::query("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1")
            .bind(comment_id)
            .bind(content)
            .execute(&self.pool)
            .await?;

        self.load(comment_id).await
    }

    /// Replies go with the comment (`ON DELETE CASCADE`)
    pub async fn delete(&self, comment_id: Uuid, actor: &User) -> Result<()> {
        let comment = self.load(comment_id).await?;
        check_comment_modification(actor, &comment, ContentAction::Delete)?;

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(comment_id = %comment_id, actor_id = %actor.id, "comment deleted");
        Ok(())
    }

    pub async fn react(&self, comment_id: Uuid, user_id: Uuid, kind: ReactionKind) -> Result<Comment> {
        let comment = self.load(comment_id).await?;
        RelationService::new(self.pool.clone())
            .ensure_not_blocked(user_id, comment.author_id)
            .await?;

        reaction_repo::toggle_reaction(&self.pool, Reactable::Comment, comment_id, user_id, kind)
            .await?;
        self.load(comment_id).await
    }

    // =================================================================
    // Listings
    // =================================================================

    pub async fn for_post(
        &self,
        post_id: Uuid,
        ctx: &ViewerContext,
        req: PageRequest,
    ) -> Result<Page<Comment>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(AppError::not_found_by_id("post", post_id));
        }

        let comments = self.visible_for_post(post_id, ctx).await?;
        Ok(Page::from_vec("comments", req, comments))
    }

    /// Every visible comment on a post, newest first
    pub async fn visible_for_post(&self, post_id: Uuid, ctx: &ViewerContext) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at DESC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ctx.filter(comments))
    }

    pub async fn all(&self, ctx: &ViewerContext, req: PageRequest) -> Result<Page<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} ORDER BY c.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::from_vec("comments", req, ctx.filter(comments)))
    }

    pub async fn by_user(
        &self,
        user_id: Uuid,
        ctx: &ViewerContext,
        req: PageRequest,
    ) -> Result<Page<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.author_id = $1 ORDER BY c.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::from_vec("comments", req, ctx.filter(comments)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_content_rejected() {
        assert_eq!(
            require_content("   "),
            Err(AppError::BadRequest("A comment must have a content".into()))
        );
        assert_eq!(require_content("  hi "), Ok("hi"));
    }
}
