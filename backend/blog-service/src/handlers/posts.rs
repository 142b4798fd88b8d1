/// Post handlers - CRUD, listings, reactions and view counting
use crate::error::{AppError, Result};
use crate::handlers::{viewer_context, VisibilityQuery, DEFAULT_PAGE_LIMIT, USER_PAGE_LIMIT};
use crate::middleware::{ActiveUser, AdminUser, AuthUser, MaybeUser};
use crate::models::{Comment, NumericFilter, Post, PostSort, ReactionKind};
use crate::pagination::PageQuery;
use crate::services::{
    CommentService, NewPost, PostFilter, PostService, PostUpdate, ReactionFilter, UserService,
};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(max = 200, message = "A post title must not exceed 200 characters"))]
    pub title: String,
    pub desc: Option<String>,
    pub img: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(max = 200, message = "A post title must not exceed 200 characters"))]
    pub title: Option<String>,
    pub desc: Option<String>,
    pub img: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Query parameters of `GET /posts`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
    /// Author username
    pub author: Option<String>,
    pub category: Option<String>,
    pub featured: Option<String>,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub numeric_filter: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A post with the comments visible to the caller
#[derive(Debug, Serialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

async fn with_comments(
    pool: &PgPool,
    post: Post,
    user: &MaybeUser,
    visibility: &VisibilityQuery,
) -> Result<PostDetails> {
    let ctx = viewer_context(pool, user.0.as_ref(), visibility).await?;
    let comments = CommentService::new(pool.clone())
        .visible_for_post(post.id, &ctx)
        .await?;
    Ok(PostDetails { post, comments })
}

// =====================================================================
// CRUD
// =====================================================================

pub async fn list_posts(
    pool: web::Data<PgPool>,
    query: web::Query<PostListQuery>,
) -> Result<HttpResponse> {
    let author_id = match non_blank(query.author.as_ref()) {
        Some(username) => Some(
            UserService::new((**pool).clone())
                .find_id_by_username(&username)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "There is no user found with the given username → {}",
                        username
                    ))
                })?,
        ),
        None => None,
    };

    let filter = PostFilter {
        author_id,
        category: non_blank(query.category.as_ref()).map(|c| c.to_lowercase()),
        featured: query.featured.as_deref().map(|f| f == "true"),
        search: non_blank(query.search.as_ref()),
        tag: non_blank(query.tag.as_ref()).map(|t| t.to_lowercase()),
        numeric: query
            .numeric_filter
            .as_deref()
            .map(NumericFilter::parse_list)
            .unwrap_or_default(),
        sort: PostSort::parse(query.sort.as_deref()),
    };
    let page = PageQuery {
        page: query.page.clone(),
        limit: query.limit.clone(),
    }
    .resolve(DEFAULT_PAGE_LIMIT);

    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.list(&filter, page).await?))
}

pub async fn create_post(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();

    let service = PostService::new((**pool).clone());
    let post = service
        .create(
            user.0.id,
            NewPost {
                title: req.title,
                description: req.desc,
                img: req.img,
                category: req.category,
                tags: req.tags,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(post))
}

/// Counts a view, then returns the post with its visible comments
pub async fn get_post(
    pool: web::Data<PgPool>,
    user: MaybeUser,
    post_id: web::Path<Uuid>,
    visibility: web::Query<VisibilityQuery>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let post = service.increment_views(*post_id).await?;
    let details = with_comments(&pool, post, &user, &visibility).await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn get_post_by_slug(
    pool: web::Data<PgPool>,
    user: MaybeUser,
    slug: web::Path<String>,
    visibility: web::Query<VisibilityQuery>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let post = service.increment_views_by_slug(&slug).await?;
    let details = with_comments(&pool, post, &user, &visibility).await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn update_post(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();

    let service = PostService::new((**pool).clone());
    let post = service
        .update(
            *post_id,
            &user.0,
            PostUpdate {
                title: req.title,
                description: req.desc,
                img: req.img,
                category: req.category,
                tags: req.tags,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    service.delete(*post_id, &user.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn update_views(
    pool: web::Data<PgPool>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.increment_views(*post_id).await?))
}

pub async fn feature_post(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.toggle_featured(*post_id).await?))
}

pub async fn like_post(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let post = service.react(*post_id, user.0.id, ReactionKind::Like).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn dislike_post(
    pool: web::Data<PgPool>,
    user: ActiveUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let post = service
        .react(*post_id, user.0.id, ReactionKind::Dislike)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

// =====================================================================
// Fixed listings
// =====================================================================

pub async fn recent_posts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.recent().await?))
}

pub async fn trending_posts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.trending().await?))
}

pub async fn featured_posts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.featured().await?))
}

pub async fn top_posts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.top().await?))
}

pub async fn most_read_posts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.most_read().await?))
}

pub async fn random_posts(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.random().await?))
}

pub async fn related_posts(
    pool: web::Data<PgPool>,
    query: web::Query<RelatedQuery>,
) -> Result<HttpResponse> {
    let tags = parse_tags(query.tags.as_deref());
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.related(&tags).await?))
}

pub async fn my_posts(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.by_author(user.0.id).await?))
}

pub async fn my_liked_posts(pool: web::Data<PgPool>, user: ActiveUser) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let posts = service.reacted_by(user.0.id, ReactionFilter::Liked).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn my_disliked_posts(
    pool: web::Data<PgPool>,
    user: ActiveUser,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let posts = service
        .reacted_by(user.0.id, ReactionFilter::Disliked)
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn posts_by_user(
    pool: web::Data<PgPool>,
    _user: ActiveUser,
    user_id: web::Path<Uuid>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let posts = service
        .page_by_author(*user_id, page.resolve(USER_PAGE_LIMIT))
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn posts_liked_by_user(
    pool: web::Data<PgPool>,
    _user: ActiveUser,
    user_id: web::Path<Uuid>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let posts = service
        .page_reacted_by(*user_id, ReactionFilter::Liked, page.resolve(USER_PAGE_LIMIT))
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn posts_disliked_by_user(
    pool: web::Data<PgPool>,
    _user: ActiveUser,
    user_id: web::Path<Uuid>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let posts = service
        .page_reacted_by(
            *user_id,
            ReactionFilter::Disliked,
            page.resolve(USER_PAGE_LIMIT),
        )
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn tag_cloud(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.tag_cloud().await?))
}

pub async fn posts_by_tag(
    pool: web::Data<PgPool>,
    tag: web::Path<String>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.by_tag(&tag).await?))
}

pub async fn posts_by_category(
    pool: web::Data<PgPool>,
    category: web::Path<String>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.by_category(&category).await?))
}

pub async fn count_by_category(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.count_by_category().await?))
}

/// Full-text search over title, description and tags
pub async fn search_posts(
    pool: web::Data<PgPool>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let q = non_blank(query.q.as_ref())
        .ok_or_else(|| AppError::BadRequest("Please provide a search query".to_string()))?;
    let page = PageQuery {
        page: query.page.clone(),
        limit: query.limit.clone(),
    }
    .resolve(DEFAULT_PAGE_LIMIT);

    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.search(&q, page).await?))
}

pub async fn comment_authors(
    pool: web::Data<PgPool>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    Ok(HttpResponse::Ok().json(service.comment_authors(*post_id).await?))
}

pub async fn saved_count(
    pool: web::Data<PgPool>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone());
    let count = service.saved_count(*post_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "savedCount": count })))
}

/// Visible comments on one post, for authenticated readers
pub async fn post_comments(
    pool: web::Data<PgPool>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    visibility: web::Query<VisibilityQuery>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let ctx = viewer_context(&pool, Some(&user.0), &visibility).await?;
    let service = CommentService::new((**pool).clone());
    let comments = service
        .for_post(*post_id, &ctx, page.resolve(DEFAULT_PAGE_LIMIT))
        .await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .route("/my-posts", web::get().to(my_posts))
            .route("/random-posts", web::get().to(random_posts))
            .route("/recent-posts", web::get().to(recent_posts))
            .route("/top-posts", web::get().to(top_posts))
            .route("/most-read", web::get().to(most_read_posts))
            .route("/trends", web::get().to(trending_posts))
            .route("/featured-posts", web::get().to(featured_posts))
            .route("/related-posts", web::get().to(related_posts))
            .route("/liked-posts", web::get().to(my_liked_posts))
            .route("/disliked-posts", web::get().to(my_disliked_posts))
            .route("/count-by-category", web::get().to(count_by_category))
            .route("/tags", web::get().to(tag_cloud))
            .route("/search", web::get().to(search_posts))
            .route("/tags/{tag}", web::get().to(posts_by_tag))
            .route("/category/{category}", web::get().to(posts_by_category))
            .route("/comments/{id}/users", web::get().to(comment_authors))
            .route("/comments/{id}", web::get().to(post_comments))
            .route("/user/{userId}/liked-posts", web::get().to(posts_liked_by_user))
            .route(
                "/user/{userId}/disliked-posts",
                web::get().to(posts_disliked_by_user),
            )
            .route("/{userId}/user", web::get().to(posts_by_user))
            .route("/{id}/saved-count", web::get().to(saved_count))
            .route("/{slug}/details", web::get().to(get_post_by_slug))
            .route("/{id}/feature-post", web::patch().to(feature_post))
            .route("/{id}/views", web::patch().to(update_views))
            .route("/{id}/like", web::patch().to(like_post))
            .route("/{id}/dislike", web::patch().to(dislike_post))
            .service(
                web::resource("/{postId}/comments")
                    .route(web::get().to(super::comments::list_post_comments))
                    .route(web::post().to(super::comments::create_post_comment)),
            )
            .service(
                web::resource("")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_post))
                    .route(web::patch().to(update_post))
                    .route(web::delete().to(delete_post)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_tags_are_normalized() {
        assert_eq!(
            parse_tags(Some(" Rust, ,WEB ,rust")),
            vec!["rust".to_string(), "web".to_string(), "rust".to_string()]
        );
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn test_list_query_reads_camel_case() {
        let query = web::Query::<PostListQuery>::from_query(
            "author=jane&numericFilter=views%3E%3D10&sort=popular&page=2",
        )
        .unwrap()
        .into_inner();
        assert_eq!(query.author.as_deref(), Some("jane"));
        assert_eq!(query.numeric_filter.as_deref(), Some("views>=10"));
        assert_eq!(PostSort::parse(query.sort.as_deref()), PostSort::Popular);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        assert_eq!(non_blank(Some(&"  ".to_string())), None);
        assert_eq!(non_blank(Some(&" go ".to_string())), Some("go".to_string()));
    }
}
