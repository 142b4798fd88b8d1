/// Reply service - nested replies under comments, including the threaded view
use crate::db::{reaction_repo, Reactable};
use crate::error::{AppError, Result};
use crate::middleware::permissions::{check_reply_modification, ContentAction};
use crate::models::reply::REPLY_SELECT;
use crate::models::{ReactionKind, Reply, User};
use crate::moderation::{build_reply_tree, TreeNode, ViewerContext};
use crate::pagination::{Page, PageRequest};
use crate::services::RelationService;
use sqlx::PgPool;
use uuid::Uuid;

fn require_content(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("A reply must have a content".to_string()));
    }
    Ok(content)
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRef {
    post_id: Uuid,
    author_id: Uuid,
}

pub struct ReplyService {
    pool: PgPool,
}

impl ReplyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, reply_id: Uuid) -> Result<Option<Reply>> {
        let reply = sqlx::query_as::<_, Reply>(&format!("{REPLY_SELECT} WHERE r.id = $1"))
            .bind(reply_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reply)
    }

    async fn load(&self, reply_id: Uuid) -> Result<Reply> {
        self.find(reply_id)
            .await?
            .ok_or_else(|| AppError::not_found_by_id("reply", reply_id))
    }

    async fn comment_ref(&self, comment_id: Uuid) -> Result<CommentRef> {
        sqlx::query_as::<_, CommentRef>("SELECT post_id, author_id FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found_by_id("comment", comment_id))
    }

    pub async fn get(&self, reply_id: Uuid, ctx: &ViewerContext) -> Result<Reply> {
        let reply = self.load(reply_id).await?;
        if !ctx.can_see(&reply) {
            return Err(AppError::not_found_by_id("reply", reply_id));
        }
        Ok(reply)
    }

    pub async fn create(
        &self,
        comment_id: Uuid,
        parent_reply: Option<Uuid>,
        author: &User,
        content: &str,
    ) -> Result<Reply> {
        let content = require_content(content)?;
        let comment = self.comment_ref(comment_id).await?;

        let relations = RelationService::new(self.pool.clone());
        relations
            .ensure_not_blocked(author.id, comment.author_id)
            .await?;

        if let Some(parent_id) = parent_reply {
            let (parent_comment, parent_author): (Uuid, Uuid) =
                sqlx::query_as("SELECT comment_id, author_id FROM replies WHERE id = $1")
                    .bind(parent_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| AppError::not_found_by_id("reply", parent_id))?;

            if parent_comment != comment_id {
                return Err(AppError::BadRequest(
                    "Parent reply must belong to the same comment".to_string(),
                ));
            }

            // Answering a reply is an interaction with its author too
            relations
                .ensure_not_blocked(author.id, parent_author)
                .await?;
        }

        let reply_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO replies (content, comment_id, post_id, parent_reply_id, author_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(content)
        .bind(comment_id)
        .bind(comment.post_id)
        .bind(parent_reply)
        .bind(author.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            reply_id = %reply_id,
            comment_id = %comment_id,
            parent_reply_id = ?parent_reply,
            "reply created"
        );
        self.load(reply_id).await
    }

    pub async fn update(&self, reply_id: Uuid, actor: &User, content: &str) -> Result<Reply> {
        let content = require_content(content)?;
        let reply = self.load(reply_id).await?;
        check_reply_modification(actor, &reply, ContentAction::Update)?;

        sqlx::query("UPDATE replies SET content = $2, updated_at = NOW() WHERE id = $1")
            .bind(reply_id)
            .bind(content)
            .execute(&self.pool)
            .await?;

        self.load(reply_id).await
    }

    /// Children of a deleted reply become roots (`ON DELETE SET NULL`)
    pub async fn delete(&self, reply_id: Uuid, actor: &User) -> Result<()> {
        let reply = self.load(reply_id).await?;
        check_reply_modification(actor, &reply, ContentAction::Delete)?;

        sqlx::query("DELETE FROM replies WHERE id = $1")
            .bind(reply_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(reply_id = %reply_id, actor_id = %actor.id, "reply deleted");
        Ok(())
    }

    pub async fn react(&self, reply_id: Uuid, user_id: Uuid, kind: ReactionKind) -> Result<Reply> {
        let reply = self.load(reply_id).await?;
        RelationService::new(self.pool.clone())
            .ensure_not_blocked(user_id, reply.author_id)
            .await?;

        reaction_repo::toggle_reaction(&self.pool, Reactable::Reply, reply_id, user_id, kind)
            .await?;
        self.load(reply_id).await
    }

    // =================================================================
    // Listings
    // =================================================================

    /// Visible replies of a comment, oldest first
    pub async fn for_comment(&self, comment_id: Uuid, ctx: &ViewerContext) -> Result<Vec<Reply>> {
        self.comment_ref(comment_id).await?;

        let replies = sqlx::query_as::<_, Reply>(&format!(
            "{REPLY_SELECT} WHERE r.comment_id = $1 ORDER BY r.created_at ASC"
        ))
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ctx.filter(replies))
    }

    /// Threaded view; filtering happens before assembly so a hidden
    /// parent promotes its visible children to roots
    pub async fn tree(&self, comment_id: Uuid, ctx: &ViewerContext) -> Result<Vec<TreeNode<Reply>>> {
        let replies = self.for_comment(comment_id, ctx).await?;
        Ok(build_reply_tree(replies, None))
    }

    pub async fn all(&self, ctx: &ViewerContext, req: PageRequest) -> Result<Page<Reply>> {
        let replies = sqlx::query_as::<_, Reply>(&format!(
            "{REPLY_SELECT} ORDER BY r.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::from_vec("replies", req, ctx.filter(replies)))
    }

    pub async fn by_user(
        &self,
        user_id: Uuid,
        ctx: &ViewerContext,
        req: PageRequest,
    ) -> Result<Page<Reply>> {
        let replies = sqlx::query_as::<_, Reply>(&format!(
            "{REPLY_SELECT} WHERE r.author_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::from_vec("replies", req, ctx.filter(replies)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_content_rejected() {
        assert!(require_content("\n\t").is_err());
        assert_eq!(require_content(" ok"), Ok("ok"));
    }
}
