use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::user::Role;
use crate::moderation::{Moderated, TargetType, Threaded};

pub const REPLY_SELECT: &str = r#"
    SELECT r.id, r.content, r.comment_id, c.author_id AS comment_author_id,
           r.post_id, p.author_id AS post_author_id, r.parent_reply_id,
           r.author_id, u.username AS author_username, u.name AS author_name,
           u.image AS author_image, u.role AS author_role,
           r.like_count, r.dislike_count,
           ARRAY(SELECT x.user_id FROM reply_reactions x
                 WHERE x.reply_id = r.id AND x.kind = 'like') AS likes,
           ARRAY(SELECT x.user_id FROM reply_reactions x
                 WHERE x.reply_id = r.id AND x.kind = 'dislike') AS dislikes,
           r.is_hidden, r.created_at, r.updated_at
    FROM replies r
    JOIN comments c ON c.id = r.comment_id
    JOIN posts p ON p.id = r.post_id
    JOIN users u ON u.id = r.author_id
"#;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub content: String,
    #[serde(rename = "comment")]
    pub comment_id: Uuid,
    pub comment_author_id: Uuid,
    #[serde(rename = "post")]
    pub post_id: Uuid,
    pub post_author_id: Uuid,
    #[serde(rename = "parentReply")]
    pub parent_reply_id: Option<Uuid>,
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

impl Moderated for Reply {
    fn item_id(&self) -> Uuid {
        self.id
    }

    fn author_id(&self) -> Uuid {
        self.author_id
    }

    fn kind(&self) -> TargetType {
        TargetType::Reply
    }

    fn is_hidden(&self) -> bool {
        self.is_hidden
    }
}

impl Threaded for Reply {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_reply_id
    }
}
