/// Post service - handles post creation, listing, reactions and feature flags
use crate::db::{reaction_repo, Reactable};
use crate::error::{AppError, Result};
use crate::middleware::permissions::check_post_modification;
use crate::models::comment::CommentAuthor;
use crate::models::post::{normalize_tags, resolve_slug, slugify, POST_SELECT};
use crate::models::{CategoryCount, NumericFilter, Post, PostSort, ReactionKind, TagCount, User};
use crate::pagination::{Page, PageRequest};
use crate::services::RelationService;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const POST_FROM: &str = " FROM posts p JOIN users u ON u.id = p.author_id";

/// Filters accepted by `GET /posts`
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub author_id: Option<Uuid>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub numeric: Vec<NumericFilter>,
    pub sort: PostSort,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: Option<String>,
    pub img: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub img: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Which reaction set a listing is drawn from
#[derive(Debug, Clone, Copy)]
pub enum ReactionFilter {
    Liked,
    Disliked,
}

impl ReactionFilter {
    fn kind(&self) -> ReactionKind {
        match self {
            ReactionFilter::Liked => ReactionKind::Like,
            ReactionFilter::Disliked => ReactionKind::Dislike,
        }
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    qb.push(" WHERE TRUE");

    if let Some(author_id) = filter.author_id {
        qb.push(" AND p.author_id = ").push_bind(author_id);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND p.category = ").push_bind(category.clone());
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND p.is_featured = ").push_bind(featured);
    }
    if let Some(search) = &filter.search {
        qb.push(" AND p.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
    if let Some(tag) = &filter.tag {
        qb.push(" AND ")
            .push_bind(tag.trim().to_lowercase())
            .push(" = ANY(p.tags)");
    }
    for term in &filter.numeric {
        qb.push(format!(" AND {} {} ", term.column, term.op.sql()))
            .push_bind(term.value);
    }
    if filter.sort == PostSort::Trending {
        qb.push(" AND p.created_at >= NOW() - INTERVAL '7 days'");
    }
}

pub struct PostService {
    pool: PgPool,
}

impl PostService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, tail: &str) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} {tail}"))
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn fetch_for(&self, tail: &str, id: Uuid) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} {tail}"))
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    pub async fn find(&self, post_id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE p.id = $1"))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    pub async fn get(&self, post_id: Uuid) -> Result<Post> {
        self.find(post_id)
            .await?
            .ok_or_else(|| AppError::not_found_by_id("post", post_id))
    }

    // =================================================================
    // Writes
    // =================================================================

    async fn free_slug(&self, title: &str, exclude: Option<Uuid>) -> Result<String> {
        let base = slugify(title);
        let taken: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT slug FROM posts
            WHERE (slug = $1 OR slug LIKE $2 ESCAPE '\')
              AND ($3::UUID IS NULL OR id <> $3)
            "#,
        )
        .bind(&base)
        .bind(format!("{}-%", escape_like(&base)))
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        Ok(resolve_slug(&base, &taken))
    }

    pub async fn create(&self, author_id: Uuid, new_post: NewPost) -> Result<Post> {
        let title = new_post.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("A post must have a title".to_string()));
        }
        let tags = normalize_tags(&new_post.tags)?;
        let slug = self.free_slug(title, None).await?;

        let post_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, slug, description, img, category, tags, author_id)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'general'), $6, $7)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(&slug)
        .bind(&new_post.description)
        .bind(&new_post.img)
        .bind(new_post.category.as_deref().map(str::trim).filter(|c| !c.is_empty()))
        .bind(&tags)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(post_id = %post_id, author_id = %author_id, slug = %slug, "post created");
        self.get(post_id).await
    }

    pub async fn update(&self, post_id: Uuid, actor: &User, update: PostUpdate) -> Result<Post> {
        let post = self.get(post_id).await?;
        check_post_modification(actor, &post)?;

        let title = match update.title.as_deref().map(str::trim) {
            Some("") => {
                return Err(AppError::BadRequest("A post must have a title".to_string()));
            }
            other => other.map(str::to_string),
        };
        let slug = match &title {
            Some(t) => Some(self.free_slug(t, Some(post_id)).await?),
            None => None,
        };
        let tags = match &update.tags {
            Some(tags) => Some(normalize_tags(tags)?),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                img = COALESCE($5, img),
                category = COALESCE($6, category),
                tags = COALESCE($7, tags),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(title)
        .bind(slug)
        .bind(update.description)
        .bind(update.img)
        .bind(update.category)
        .bind(tags)
        .execute(&self.pool)
        .await?;

        self.get(post_id).await
    }

    pub async fn delete(&self, post_id: Uuid, actor: &User) -> Result<()> {
        let post = self.get(post_id).await?;
        check_post_modification(actor, &post)?;

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(post_id = %post_id, actor_id = %actor.id, "post deleted");
        Ok(())
    }

    pub async fn increment_views(&self, post_id: Uuid) -> Result<Post> {
        let updated = sqlx::query("UPDATE posts SET views = views + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found_by_id("post", post_id));
        }
        self.get(post_id).await
    }

    pub async fn increment_views_by_slug(&self, slug: &str) -> Result<Post> {
        let post_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE posts SET views = views + 1 WHERE slug = $1 RETURNING id",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        match post_id {
            Some(id) => self.get(id).await,
            None => Err(AppError::NotFound(format!(
                "There is no post found with the given SLUG → {}",
                slug
            ))),
        }
    }

    pub async fn toggle_featured(&self, post_id: Uuid) -> Result<Post> {
        let updated = sqlx::query(
            "UPDATE posts SET is_featured = NOT is_featured, updated_at = NOW() WHERE id = $1",
        )
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found_by_id("post", post_id));
        }
        self.get(post_id).await
    }

    /// Like or dislike with swap semantics
    pub async fn react(&self, post_id: Uuid, user_id: Uuid, kind: ReactionKind) -> Result<Post> {
        let post = self.get(post_id).await?;
        RelationService::new(self.pool.clone())
            .ensure_not_blocked(user_id, post.author_id)
            .await?;

        reaction_repo::toggle_reaction(&self.pool, Reactable::Post, post_id, user_id, kind).await?;
        self.get(post_id).await
    }

    // =================================================================
    // Listings
    // =================================================================

    pub async fn list(&self, filter: &PostFilter, req: PageRequest) -> Result<Page<Post>> {
        let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){POST_FROM}"));
        push_filters(&mut count_qb, filter);
        let counts: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_filters(&mut qb, filter);
        qb.push(format!(" ORDER BY {}", filter.sort.order_by()));
        qb.push(" LIMIT ").push_bind(req.limit);
        qb.push(" OFFSET ").push_bind(req.offset());

        let posts = qb.build_query_as::<Post>().fetch_all(&self.pool).await?;
        Ok(Page::new("posts", req, counts, posts))
    }

    pub async fn recent(&self) -> Result<Vec<Post>> {
        self.fetch("ORDER BY p.created_at DESC LIMIT 8").await
    }

    pub async fn trending(&self) -> Result<Vec<Post>> {
        self.fetch("ORDER BY p.views DESC, p.created_at DESC LIMIT 10").await
    }

    pub async fn featured(&self) -> Result<Vec<Post>> {
        self.fetch("WHERE p.is_featured = TRUE ORDER BY p.created_at DESC").await
    }

    pub async fn top(&self) -> Result<Vec<Post>> {
        self.fetch("ORDER BY p.like_count DESC, p.created_at DESC LIMIT 3").await
    }

    pub async fn most_read(&self) -> Result<Vec<Post>> {
        self.fetch("ORDER BY p.views DESC, p.created_at DESC LIMIT 4").await
    }

    pub async fn random(&self) -> Result<Vec<Post>> {
        self.fetch("ORDER BY RANDOM() LIMIT 3").await
    }

    /// 20 newest posts sharing at least one tag
    pub async fn related(&self, tags: &[String]) -> Result<Vec<Post>> {
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_SELECT} WHERE p.tags && $1 ORDER BY p.created_at DESC LIMIT 20"
        ))
        .bind(&tags)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        self.fetch_for("WHERE p.author_id = $1 ORDER BY p.created_at DESC", author_id)
            .await
    }

    /// Every post the user reacted to with `filter`, newest reaction first
    pub async fn reacted_by(&self, user_id: Uuid, filter: ReactionFilter) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            {POST_SELECT}
            JOIN post_reactions pr ON pr.post_id = p.id
            WHERE pr.user_id = $1 AND pr.kind = $2
            ORDER BY pr.created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(filter.kind())
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn page_by_author(&self, author_id: Uuid, req: PageRequest) -> Result<Page<Post>> {
        let counts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;

        let posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_SELECT} WHERE p.author_id = $1 ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(author_id)
        .bind(req.limit)
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new("posts", req, counts, posts))
    }

    pub async fn page_reacted_by(
        &self,
        user_id: Uuid,
        filter: ReactionFilter,
        req: PageRequest,
    ) -> Result<Page<Post>> {
        let counts: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM post_reactions WHERE user_id = $1 AND kind = $2",
        )
        .bind(user_id)
        .bind(filter.kind())
        .fetch_one(&self.pool)
        .await?;

        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            {POST_SELECT}
            JOIN post_reactions pr ON pr.post_id = p.id
            WHERE pr.user_id = $1 AND pr.kind = $2
            ORDER BY pr.created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(filter.kind())
        .bind(req.limit)
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new("posts", req, counts, posts))
    }

    pub async fn by_tag(&self, tag: &str) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_SELECT} WHERE $1 = ANY(p.tags) ORDER BY p.created_at DESC"
        ))
        .bind(tag.trim().to_lowercase())
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_SELECT} WHERE p.category = $1 ORDER BY p.created_at DESC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// Distinct tags with the number of posts carrying each
    pub async fn tag_cloud(&self) -> Result<Vec<TagCount>> {
        let tags = sqlx::query_as::<_, TagCount>(
            r#"
            SELECT tag, COUNT(*) AS count
            FROM posts, UNNEST(tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    pub async fn count_by_category(&self) -> Result<Vec<CategoryCount>> {
        let counts = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT c.name AS category, COUNT(p.id) AS count
            FROM categories c
            LEFT JOIN posts p ON p.category = c.name
            GROUP BY c.name, c.created_at
            ORDER BY c.created_at ASC, c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Full-text search over title and description, best match first
    pub async fn search(&self, q: &str, req: PageRequest) -> Result<Page<Post>> {
        let q = q.trim();
        if q.is_empty() {
            return Ok(Page::new("posts", req, 0, Vec::new()));
        }

        let counts: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE search_vector @@ plainto_tsquery('english', $1)",
        )
        .bind(q)
        .fetch_one(&self.pool)
        .await?;

        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            {POST_SELECT}
            WHERE p.search_vector @@ plainto_tsquery('english', $1)
            ORDER BY ts_rank(p.search_vector, plainto_tsquery('english', $1)) DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(q)
        .bind(req.limit)
        .bind(req.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new("posts", req, counts, posts))
    }

    pub async fn comment_authors(&self, post_id: Uuid) -> Result<Vec<CommentAuthor>> {
        let authors = sqlx::query_as::<_, CommentAuthor>(
            r#"
            SELECT DISTINCT u.id, u.name, u.username, u.email, u.image
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }

    pub async fn saved_count(&self, post_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_posts WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::CompareOp;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_filters_render_whitelisted_sql() {
        let filter = PostFilter {
            author_id: Some(Uuid::nil()),
            tag: Some("Rust".into()),
            numeric: vec![NumericFilter {
                column: "p.views",
                op: CompareOp::Gte,
                value: 10,
            }],
            sort: PostSort::Trending,
            ..PostFilter::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM posts p");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();

        assert!(sql.contains("p.author_id = $1"));
        assert!(sql.contains("$2 = ANY(p.tags)"));
        assert!(sql.contains("p.views >= $3"));
        assert!(sql.contains("INTERVAL '7 days'"));
    }
}
