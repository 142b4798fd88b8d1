use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::user::Role;
use crate::moderation::{Moderated, TargetType};

pub const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.post_id, p.author_id AS post_author_id,
           c.author_id, u.username AS author_username, u.name AS author_name,
           u.image AS author_image, u.role AS author_role,
           c.like_count, c.dislike_count,
           ARRAY(SELECT r.user_id FROM comment_reactions r
                 WHERE r.comment_id = c.id AND r.kind = 'like') AS likes,
           ARRAY(SELECT r.user_id FROM comment_reactions r
                 WHERE r.comment_id = c.id AND r.kind = 'dislike') AS dislikes,
           c.is_hidden, c.created_at, c.updated_at
    FROM comments c
    JOIN posts p ON p.id = c.post_id
    JOIN users u ON u.id = c.author_id
"#;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    #[serde(rename = "post")]
    pub post_id: Uuid,
    pub post_author_id: Uuid,
    #[serde(rename = "author")]
    pub author_id: Uuid,
    pub author_username: String,
    pub author_name: String,
    pub author_image: Option<String>,
    pub author_role: Role,
    pub like_count: i64,
    pub dislike_count: i64,
    pub likes: Vec<Uuid>,
    pub dislikes: Vec<Uuid>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Moderated for Comment {
    fn item_id(&self) -> Uuid {
        self.id
    }

    fn author_id(&self) -> Uuid {
        self.author_id
    }

    fn kind(&self) -> TargetType {
        TargetType::Comment
    }

    fn is_hidden(&self) -> bool {
        self.is_hidden
    }
}

/// Distinct comment author on a post
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub image: Option<String>,
}
