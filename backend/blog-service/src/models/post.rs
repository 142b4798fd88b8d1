use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Post projection shared by every post query; reaction sets are folded
/// into arrays so a post reads like a single document
pub const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.description, p.img, p.category, p.tags,
           p.author_id, u.username AS author_username, u.image AS author_image,
           p.views, p.like_count, p.dislike_count,
           ARRAY(SELECT r.user_id FROM post_reactions r
                 WHERE r.post_id = p.id AND r.kind = 'like'
                 ORDER BY r.created_at) AS likes,
           ARRAY(SELECT r.user_id FROM post_reactions r
                 WHERE r.post_id = p.id AND r.kind = 'dislike'
                 ORDER BY r.created_at) AS dislikes,
           p.is_featured, p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(rename = "desc")]
    pub description: Option<String>,
    pub img: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(rename = "author")]
    pub author_id: Uuid,
    pub author_username: String,
    pub author_image: Option<String>,
    pub views: i64,
    pub like_count: i64,
    pub dislike_count: i64,
    pub likes: Vec<Uuid>,
    pub dislikes: Vec<Uuid>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

// =====================================================================
// Listing filters
// =====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    Popular,
    /// Most viewed among posts from the last seven days
    Trending,
}

impl PostSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("oldest") => PostSort::Oldest,
            Some("popular") => PostSort::Popular,
            Some("trending") => PostSort::Trending,
            _ => PostSort::Newest,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            PostSort::Newest => "p.created_at DESC, p.id DESC",
            PostSort::Oldest => "p.created_at ASC, p.id ASC",
            PostSort::Popular | PostSort::Trending => "p.views DESC, p.created_at DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Eq,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// One `field<op>value` term of the `numericFilter` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericFilter {
    pub column: &'static str,
    pub op: CompareOp,
    pub value: i64,
}

impl NumericFilter {
    /// Parse `views>=10,likeCount<5`
    ///
    /// Terms naming an unknown field or carrying a non-numeric value are
    /// dropped.
    pub fn parse_list(raw: &str) -> Vec<NumericFilter> {
        raw.split(',').filter_map(Self::parse_term).collect()
    }

    fn parse_term(term: &str) -> Option<NumericFilter> {
        let term = term.trim();
        let split = term.find(['<', '>', '='])?;
        let (field, rest) = term.split_at(split);

        let column = match field.trim() {
            "views" => "p.views",
            "likeCount" => "p.like_count",
            "dislikeCount" => "p.dislike_count",
            _ => return None,
        };

        let (op, value) = [
            (">=", CompareOp::Gte),
            ("<=", CompareOp::Lte),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
            ("=", CompareOp::Eq),
        ]
        .into_iter()
        .find_map(|(token, op)| rest.strip_prefix(token).map(|v| (op, v)))?;

        let value = value.trim().parse::<i64>().ok()?;
        Some(NumericFilter { column, op, value })
    }
}

// =====================================================================
// Slugs and tags
// =====================================================================

/// Lowercase, ASCII-alphanumeric words joined by `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "post".to_string()
    } else {
        slug
    }
}

/// First free slug among `base`, `base-1`, `base-2`, ...
pub fn resolve_slug(base: &str, taken: &[String]) -> String {
    let taken: HashSet<&str> = taken.iter().map(String::as_str).collect();
    if !taken.contains(base) {
        return base.to_string();
    }

    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| format!("{}-{}", base, Uuid::new_v4()))
}

/// Trim, lowercase and dedupe, keeping first-seen order
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let normalized: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if normalized.is_empty() {
        return Err(AppError::BadRequest(
            "A post must have at least one tag".to_string(),
        ));
    }
    Ok(normalized)
}
