//! Integration Tests: accounts, reports, blocks and reply threads
//!
//! Coverage:
//! - Registration and login by username or email
//! - Duplicate report rejection and the action-taken side effects
//! - Blocking severs reactions and denies further interaction, including
//!   answers to the blocking user's replies
//! - Reply threads promote children of hidden replies to roots
//!
//! Architecture:
//! - Uses testcontainers for PostgreSQL database
//! - Drives the service layer directly with real SQL

mod common;

use blog_service::models::{ReactionKind, ReportReason, ReportStatus, Role};
use blog_service::moderation::{ReportDraft, Target, ViewerContext};
use blog_service::services::{
    AuthService, CommentService, NewPost, NewUser, PostService, Registration, RelationService,
    ReplyService, ReportService, ReviewRequest, UserService,
};
use blog_service::AppError;
use crypto_core::JwtManager;
use serial_test::serial;

fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        description: Some("body".to_string()),
        img: None,
        category: None,
        tags: vec!["rust".to_string()],
    }
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_register_then_login_by_username_or_email() {
    let pool = common::setup_test_db().await.expect("test db");
    let jwt = JwtManager::new(common::TEST_JWT_SECRET, 3600);
    let auth = AuthService::new(pool.clone(), &jwt);

    let username = common::unique("writer");
    let session = auth
        .register(Registration {
            user: NewUser {
                name: "Integration Writer".to_string(),
                username: username.clone(),
                email: format!("{}@Example.com", username),
                password_hash: String::new(),
                phone: None,
                date_of_birth: None,
                country: "Nowhere".to_string(),
                bio: "writes things".to_string(),
                about: None,
                image: None,
                banner: None,
            },
            password: "Passw0rd!".to_string(),
            password_confirm: "Passw0rd!".to_string(),
        })
        .await
        .expect("register");

    assert_eq!(session.user.role, Role::User);
    assert_eq!(session.user.email, format!("{}@example.com", username));
    let claims = jwt.validate_token(&session.token).expect("valid token");
    assert_eq!(claims.user_id().expect("uuid sub"), session.user.id);

    let by_name = auth
        .login(Some(&username), Some("Passw0rd!"))
        .await
        .expect("login by username");
    assert_eq!(by_name.user.id, session.user.id);

    let by_email = auth
        .login(Some(&session.user.email), Some("Passw0rd!"))
        .await
        .expect("login by email");
    assert_eq!(by_email.user.id, session.user.id);

    let err = auth
        .login(Some(&username), Some("Wrong0rd!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = auth.login(Some(&username), None).await.unwrap_err();
    assert_eq!(
        err,
        AppError::BadRequest("Please provide username/email and password".to_string())
    );
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_comment_report_lifecycle() {
    let pool = common::setup_test_db().await.expect("test db");
    let author = common::seed_user(&pool, &common::unique("author")).await;
    let reporter = common::seed_user(&pool, &common::unique("report")).await;
    let admin = common::seed_admin(&pool, &common::unique("admin")).await;

    let post = PostService::new(pool.clone())
        .create(author.id, new_post("Reported thread"))
        .await
        .expect("post");
    let comments = CommentService::new(pool.clone());
    let comment = comments
        .create(post.id, &author, "rude words")
        .await
        .expect("comment");

    let reports = ReportService::new(pool.clone());
    let draft = || {
        ReportDraft::validate(
            reporter.id,
            Target::Comment(comment.id),
            ReportReason::Harassment,
            None,
            Some("see thread".to_string()),
        )
        .expect("valid draft")
    };

    let report = reports.create(draft()).await.expect("first report");
    assert_eq!(report.status, ReportStatus::Pending);

    let err = reports.create(draft()).await.unwrap_err();
    assert_eq!(
        err,
        AppError::BadRequest("You already reported this content".to_string())
    );

    let reviewed = reports
        .review(
            report.id,
            &admin,
            ReviewRequest {
                status: Some(ReportStatus::ActionTaken),
                admin_note: Some("hidden".to_string()),
            },
        )
        .await
        .expect("review");
    assert_eq!(reviewed.status, ReportStatus::ActionTaken);
    assert_eq!(reviewed.reviewed_by, Some(admin.id));

    // Hidden for everyone except an admin who asks for it
    let err = comments
        .get(comment.id, &ViewerContext::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let relations = RelationService::new(pool.clone());
    let admin_view = relations
        .viewer_context(Some(&admin), true)
        .await
        .expect("admin ctx");
    let hidden = comments.get(comment.id, &admin_view).await.expect("admin sees");
    assert!(hidden.is_hidden);

    // Terminal status cannot move back
    let err = reports
        .review(
            report.id,
            &admin,
            ReviewRequest {
                status: Some(ReportStatus::Reviewed),
                admin_note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_user_report_action_soft_bans() {
    let pool = common::setup_test_db().await.expect("test db");
    let offender = common::seed_user(&pool, &common::unique("troll")).await;
    let reporter = common::seed_user(&pool, &common::unique("victim")).await;
    let admin = common::seed_admin(&pool, &common::unique("admin")).await;

    let reports = ReportService::new(pool.clone());
    let report = reports
        .create(
            ReportDraft::validate(
                reporter.id,
                Target::User(offender.id),
                ReportReason::Spam,
                None,
                None,
            )
            .expect("draft"),
        )
        .await
        .expect("report");

    reports
        .review(
            report.id,
            &admin,
            ReviewRequest {
                status: Some(ReportStatus::ActionTaken),
                admin_note: None,
            },
        )
        .await
        .expect("review");

    let banned = UserService::new(pool.clone())
        .find_active(offender.id)
        .await
        .expect("query")
        .expect("still active");
    assert!(banned.is_soft_banned);
    assert!(banned.soft_ban_expires.is_some());
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_block_severs_reactions_and_denies_interaction() {
    let pool = common::setup_test_db().await.expect("test db");
    let owner = common::seed_user(&pool, &common::unique("owner")).await;
    let fan = common::seed_user(&pool, &common::unique("fan")).await;

    let posts = PostService::new(pool.clone());
    let post = posts
        .create(owner.id, new_post("Blocked later"))
        .await
        .expect("post");

    let liked = posts
        .react(post.id, fan.id, ReactionKind::Like)
        .await
        .expect("like");
    assert_eq!(liked.like_count, 1);
    assert!(liked.likes.contains(&fan.id));

    let relations = RelationService::new(pool.clone());
    let outcome = relations
        .toggle_block(owner.id, fan.id, Some("spam"))
        .await
        .expect("block");
    assert!(outcome.is_added());

    let after = posts.get(post.id).await.expect("post");
    assert_eq!(after.like_count, 0);
    assert!(!after.likes.contains(&fan.id));

    let err = posts
        .react(post.id, fan.id, ReactionKind::Like)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AppError::Forbidden("This user has blocked you. Interaction denied".to_string())
    );

    let err = CommentService::new(pool.clone())
        .create(post.id, &fan, "let me in")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let blocked = relations.blocked_users(owner.id).await.expect("list");
    assert_eq!(blocked.len(), 1);

    let outcome = relations
        .toggle_block(owner.id, fan.id, None)
        .await
        .expect("unblock");
    assert!(!outcome.is_added());
    posts
        .react(post.id, fan.id, ReactionKind::Like)
        .await
        .expect("like after unblock");
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_reply_tree_promotes_children_of_muted_reply() {
    let pool = common::setup_test_db().await.expect("test db");
    let author = common::seed_user(&pool, &common::unique("author")).await;
    let reader = common::seed_user(&pool, &common::unique("reader")).await;

    let post = PostService::new(pool.clone())
        .create(author.id, new_post("Threaded"))
        .await
        .expect("post");
    let comment = CommentService::new(pool.clone())
        .create(post.id, &author, "root comment")
        .await
        .expect("comment");

    let replies = ReplyService::new(pool.clone());
    let top = replies
        .create(comment.id, None, &author, "top")
        .await
        .expect("top");
    let middle = replies
        .create(comment.id, Some(top.id), &author, "middle")
        .await
        .expect("middle");
    let leaf = replies
        .create(comment.id, Some(middle.id), &author, "leaf")
        .await
        .expect("leaf");

    let relations = RelationService::new(pool.clone());
    let anonymous = ViewerContext::anonymous();
    let tree = replies.tree(comment.id, &anonymous).await.expect("tree");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].item.id, top.id);
    assert_eq!(tree[0].size(), 3);

    relations
        .toggle_mute(reader.id, Target::Reply(middle.id), None)
        .await
        .expect("mute");
    let ctx = relations
        .viewer_context(Some(&reader), false)
        .await
        .expect("ctx");

    let tree = replies.tree(comment.id, &ctx).await.expect("tree");
    let roots: Vec<_> = tree.iter().map(|node| node.item.id).collect();
    assert_eq!(roots, vec![top.id, leaf.id]);
    assert!(tree.iter().all(|node| node.replies.is_empty()));

    // A parent from another comment is rejected
    let other = CommentService::new(pool.clone())
        .create(post.id, &author, "second comment")
        .await
        .expect("comment");
    let err = replies
        .create(other.id, Some(top.id), &author, "misplaced")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AppError::BadRequest("Parent reply must belong to the same comment".to_string())
    );
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_blocked_user_cannot_answer_blockers_reply() {
    let pool = common::setup_test_db().await.expect("test db");
    let author = common::seed_user(&pool, &common::unique("author")).await;
    let replier = common::seed_user(&pool, &common::unique("replier")).await;
    let stranger = common::seed_user(&pool, &common::unique("stranger")).await;

    let post = PostService::new(pool.clone())
        .create(author.id, new_post("Crowded thread"))
        .await
        .expect("post");
    let comment = CommentService::new(pool.clone())
        .create(post.id, &author, "open question")
        .await
        .expect("comment");

    let replies = ReplyService::new(pool.clone());
    let answer = replies
        .create(comment.id, None, &replier, "an answer")
        .await
        .expect("answer");

    RelationService::new(pool.clone())
        .toggle_block(replier.id, stranger.id, None)
        .await
        .expect("block");

    let err = replies
        .create(comment.id, Some(answer.id), &stranger, "but actually")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AppError::Forbidden("This user has blocked you. Interaction denied".to_string())
    );

    // The comment author has no block, so a top-level reply still works
    let own = replies
        .create(comment.id, None, &stranger, "separate point")
        .await
        .expect("top-level reply");
    assert_eq!(own.parent_reply_id, None);

    // The blocker is denied in the other direction as well
    let mine = replies
        .create(comment.id, None, &stranger, "another point")
        .await
        .expect("second reply");
    let err = replies
        .create(comment.id, Some(mine.id), &replier, "no thanks")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AppError::Forbidden("You have blocked this user. Interaction denied".to_string())
    );
}
