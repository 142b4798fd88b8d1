//! Read-time filtering of comments and replies for a particular viewer
//!
//! An item is hidden from a viewer when
//! - its own id is in the viewer's muted set for its kind,
//! - its author is muted, or blocked in either direction,
//! - moderation hid it and the viewer is not an admin reviewing hidden content.

use std::collections::HashSet;
use uuid::Uuid;

use super::target::TargetType;

/// Anything that can appear in a comment or reply listing
pub trait Moderated {
    fn item_id(&self) -> Uuid;
    fn author_id(&self) -> Uuid;
    fn kind(&self) -> TargetType;
    fn is_hidden(&self) -> bool;
}

/// Everything needed to decide what one viewer may see
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerContext {
    pub viewer: Option<Uuid>,
    pub is_admin: bool,
    pub include_hidden: bool,
    pub muted_users: HashSet<Uuid>,
    pub muted_comments: HashSet<Uuid>,
    pub muted_replies: HashSet<Uuid>,
    /// Users the viewer blocked plus users who blocked the viewer
    pub blocked_users: HashSet<Uuid>,
}

impl ViewerContext {
    /// Context for unauthenticated requests
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Admins may ask for hidden items; the flag is ignored for everyone else
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    fn shows_hidden(&self) -> bool {
        self.is_admin && self.include_hidden
    }

    pub fn can_see<T: Moderated>(&self, item: &T) -> bool {
        if item.is_hidden() && !self.shows_hidden() {
            return false;
        }

        let muted_items = match item.kind() {
            TargetType::Comment => &self.muted_comments,
            TargetType::Reply => &self.muted_replies,
            TargetType::User => &self.muted_users,
        };
        if muted_items.contains(&item.item_id()) {
            return false;
        }

        let author = item.author_id();
        !(self.muted_users.contains(&author) || self.blocked_users.contains(&author))
    }

    pub fn filter<T: Moderated>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.can_see(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: Uuid,
        author: Uuid,
        kind: TargetType,
        hidden: bool,
    }

    impl Moderated for Item {
        fn item_id(&self) -> Uuid {
            self.id
        }
        fn author_id(&self) -> Uuid {
            self.author
        }
        fn kind(&self) -> TargetType {
            self.kind
        }
        fn is_hidden(&self) -> bool {
            self.hidden
        }
    }

    fn comment(author: Uuid) -> Item {
        Item {
            id: Uuid::new_v4(),
            author,
            kind: TargetType::Comment,
            hidden: false,
        }
    }

    #[test]
    fn test_muted_comment_excluded_regardless_of_author() {
        let author = Uuid::new_v4();
        let c1 = comment(author);
        let c2 = comment(author);

        let mut ctx = ViewerContext::anonymous();
        ctx.viewer = Some(Uuid::new_v4());
        ctx.muted_comments.insert(c1.id);

        let visible = ctx.filter(vec![c1.clone(), c2.clone()]);
        assert_eq!(visible, vec![c2]);
    }

    #[test]
    fn test_muted_ids_are_scoped_by_kind() {
        let mut reply = comment(Uuid::new_v4());
        reply.kind = TargetType::Reply;

        let mut ctx = ViewerContext::anonymous();
        ctx.muted_comments.insert(reply.id);
        assert!(ctx.can_see(&reply));

        ctx.muted_replies.insert(reply.id);
        assert!(!ctx.can_see(&reply));
    }

    #[test]
    fn test_muted_and_blocked_authors_excluded() {
        let muted = Uuid::new_v4();
        let blocked = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut ctx = ViewerContext::anonymous();
        ctx.muted_users.insert(muted);
        ctx.blocked_users.insert(blocked);

        let items = vec![comment(muted), comment(blocked), comment(other)];
        let visible = ctx.filter(items);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].author, other);
    }

    #[test]
    fn test_hidden_items_only_for_admins_who_ask() {
        let mut hidden = comment(Uuid::new_v4());
        hidden.hidden = true;

        assert!(!ViewerContext::anonymous().can_see(&hidden));
        assert!(!ViewerContext::anonymous().with_hidden(true).can_see(&hidden));

        let admin = ViewerContext {
            is_admin: true,
            ..ViewerContext::default()
        };
        assert!(!admin.can_see(&hidden));
        assert!(admin.with_hidden(true).can_see(&hidden));
    }

    #[test]
    fn test_anonymous_sees_everything_visible() {
        let items = vec![comment(Uuid::new_v4()), comment(Uuid::new_v4())];
        assert_eq!(ViewerContext::anonymous().filter(items.clone()), items);
    }
}
