/// Business logic layer for blog-service
///
/// This module provides high-level operations:
/// - Auth and user services: accounts, sessions, profiles, saved posts
/// - Content services: posts, comments, replies, categories
/// - Moderation services: reports, mutes/blocks, admin dashboard
/// - Outbound integrations: SMTP email, Mailchimp, upload signing
pub mod auth;
pub mod categories;
pub mod comments;
pub mod contacts;
pub mod dashboard;
pub mod email;
pub mod mailchimp;
pub mod newsletter;
pub mod posts;
pub mod relations;
pub mod replies;
pub mod reports;
pub mod upload;
pub mod users;

// Re-export commonly used services
pub use auth::{AuthService, Registration, Session};
pub use categories::CategoryService;
pub use comments::CommentService;
pub use contacts::{ContactService, ContactUpdate, NewContact};
pub use dashboard::DashboardService;
pub use email::{EmailMessage, EmailService};
pub use mailchimp::{ListOutcome, MailchimpClient};
pub use newsletter::NewsletterService;
pub use posts::{NewPost, PostFilter, PostService, PostUpdate, ReactionFilter};
pub use relations::RelationService;
pub use replies::ReplyService;
pub use reports::{ReportService, ReviewRequest};
pub use upload::{UploadAuth, UploadSigner};
pub use users::{NewUser, UserService, UserUpdate};
