/// Authorization module for blog-service
///
/// Ownership and role checks for modifying posts, comments and replies.
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Comment, Post, Reply, Role, User};

/// Result type for permission checks
pub type PermissionResult = Result<(), AppError>;

/// Modification being attempted; only affects error wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentAction {
    Update,
    Delete,
}

impl ContentAction {
    fn verb(&self) -> &'static str {
        match self {
            ContentAction::Update => "update",
            ContentAction::Delete => "delete",
        }
    }
}

/// Posts are modified by their author or any admin
pub fn check_post_modification(actor: &User, post: &Post) -> PermissionResult {
    if post.author_id == actor.id || actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have permission to perform this operation".to_string(),
        ))
    }
}

/// Shared rule for comments and replies
///
/// An admin may act on their own content or on a regular user's, never on
/// another admin's. A regular user must be one of `owners`.
fn check_thread_item(
    actor: &User,
    author_id: Uuid,
    author_role: Role,
    owners: &[Uuid],
    action: ContentAction,
    noun: &str,
) -> PermissionResult {
    if actor.is_admin() {
        if author_id == actor.id || author_role != Role::Admin {
            return Ok(());
        }
        return Err(AppError::Forbidden(format!(
            "Admins cannot {} {} from other admins",
            action.verb(),
            noun
        )));
    }

    if owners.contains(&actor.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not allowed to perform this action".to_string(),
        ))
    }
}

/// Comment author or the author of the post it sits on
pub fn check_comment_modification(
    actor: &User,
    comment: &Comment,
    action: ContentAction,
) -> PermissionResult {
    check_thread_item(
        actor,
        comment.author_id,
        comment.author_role,
        &[comment.author_id, comment.post_author_id],
        action,
        "comments",
    )
}

/// Reply author, the parent comment's author, or the post author
pub fn check_reply_modification(
    actor: &User,
    reply: &Reply,
    action: ContentAction,
) -> PermissionResult {
    check_thread_item(
        actor,
        reply.author_id,
        reply.author_role,
        &[reply.author_id, reply.comment_author_id, reply.post_author_id],
        action,
        "replies",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".into(),
            username: "tester".into(),
            email: "tester@example.com".into(),
            password_hash: String::new(),
            phone: None,
            date_of_birth: None,
            country: "NZ".into(),
            bio: "bio".into(),
            about: None,
            image: None,
            banner: None,
            role,
            is_active: true,
            is_soft_banned: false,
            soft_ban_expires: None,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn comment(author: &User, post_author: Uuid) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            content: "hello".into(),
            post_id: Uuid::new_v4(),
            post_author_id: post_author,
            author_id: author.id,
            author_username: author.username.clone(),
            author_name: author.name.clone(),
            author_image: None,
            author_role: author.role,
            like_count: 0,
            dislike_count: 0,
            likes: vec![],
            dislikes: vec![],
            is_hidden: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_comment_author_and_post_author_may_modify() {
        let author = user(Role::User);
        let post_author = user(Role::User);
        let stranger = user(Role::User);
        let c = comment(&author, post_author.id);

        assert!(check_comment_modification(&author, &c, ContentAction::Update).is_ok());
        assert!(check_comment_modification(&post_author, &c, ContentAction::Delete).is_ok());
        assert_eq!(
            check_comment_modification(&stranger, &c, ContentAction::Delete),
            Err(AppError::Forbidden(
                "You are not allowed to perform this action".into()
            ))
        );
    }

    #[test]
    fn test_admins_cannot_touch_other_admins_content() {
        let admin = user(Role::Admin);
        let other_admin = user(Role::Admin);
        let regular = user(Role::User);

        let admins_comment = comment(&other_admin, regular.id);
        assert_eq!(
            check_comment_modification(&admin, &admins_comment, ContentAction::Update),
            Err(AppError::Forbidden(
                "Admins cannot update comments from other admins".into()
            ))
        );

        let own = comment(&admin, regular.id);
        assert!(check_comment_modification(&admin, &own, ContentAction::Delete).is_ok());

        let users_comment = comment(&regular, other_admin.id);
        assert!(check_comment_modification(&admin, &users_comment, ContentAction::Delete).is_ok());
    }

    #[test]
    fn test_admin_post_override() {
        let admin = user(Role::Admin);
        let author = user(Role::User);
        let stranger = user(Role::User);
        let post = Post {
            id: Uuid::new_v4(),
            title: "t".into(),
            slug: "t".into(),
            description: None,
            img: None,
            category: "general".into(),
            tags: vec!["rust".into()],
            author_id: author.id,
            author_username: author.username.clone(),
            author_image: None,
            views: 0,
            like_count: 0,
            dislike_count: 0,
            likes: vec![],
            dislikes: vec![],
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(check_post_modification(&author, &post).is_ok());
        assert!(check_post_modification(&admin, &post).is_ok());
        assert!(check_post_modification(&stranger, &post).is_err());
    }
}
