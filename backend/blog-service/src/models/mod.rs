/// Data models for blog-service
///
/// Row types map one-to-one onto the tables in `migrations/`; response
/// views (`UserProfile`, `UserDetails`, ...) control what leaves the API.
pub mod category;
pub mod comment;
pub mod contact;
pub mod post;
pub mod reaction;
pub mod relation;
pub mod reply;
pub mod report;
pub mod subscriber;
pub mod user;

pub use category::Category;
pub use comment::{Comment, CommentAuthor};
pub use contact::Contact;
pub use post::{CategoryCount, NumericFilter, Post, PostSort, TagCount};
pub use reaction::ReactionKind;
pub use relation::{BlockRow, BlockedUser, MuteRow};
pub use reply::Reply;
pub use report::{Report, ReportReason, ReportStatus};
pub use subscriber::{Subscriber, SubscriberStatus, TokenPurpose};
pub use user::{MonthlyStat, Role, User, UserDetails, UserProfile, UserSummary};
