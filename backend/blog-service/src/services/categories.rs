use crate::error::{AppError, Result};
use crate::models::Category;
use sqlx::PgPool;
use uuid::Uuid;

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::BadRequest("A category must have a name".to_string()));
    }
    Ok(name)
}

pub struct CategoryService {
    pool: PgPool,
}

impl CategoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY created_at ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn get(&self, category_id: Uuid) -> Result<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("category", category_id))
    }

    /// Names are unique (`categories_name_key`)
    pub async fn create(&self, name: &str, description: Option<String>) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(normalize_name(name)?)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn update(
        &self,
        category_id: Uuid,
        name: Option<&str>,
        description: Option<String>,
    ) -> Result<Category> {
        let name = name.map(normalize_name).transpose()?;

        sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(category_id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("category", category_id))
    }

    pub async fn delete(&self, category_id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found_by_id("category", category_id));
        }
        Ok(())
    }
}
