/// User service - accounts, profiles, saved posts and admin user management
use crate::error::{AppError, Result};
use crate::models::post::POST_SELECT;
use crate::models::user::USER_COLUMNS;
use crate::models::{MonthlyStat, Post, Role, User};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Validated registration input with the password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: String,
    pub bio: String,
    pub about: Option<String>,
    pub image: Option<String>,
    pub banner: Option<String>,
}

/// Partial update; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: Option<String>,
    pub bio: Option<String>,
    pub about: Option<String>,
    pub image: Option<String>,
    pub banner: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, username, email, password_hash, phone, date_of_birth,
                               country, bio, about, image, banner)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.username)
        .bind(new_user.email.to_lowercase())
        .bind(&new_user.password_hash)
        .bind(&new_user.phone)
        .bind(new_user.date_of_birth)
        .bind(&new_user.country)
        .bind(&new_user.bio)
        .bind(&new_user.about)
        .bind(&new_user.image)
        .bind(&new_user.banner)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Active user by id
    pub async fn find_active(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_active(&self, user_id: Uuid) -> Result<User> {
        self.find_active(user_id)
            .await?
            .ok_or_else(|| AppError::not_found_by_id("user", user_id))
    }

    /// Active user whose username or email equals `identifier`
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE (username = $1 OR email = LOWER($1)) AND is_active = TRUE
            "#
        ))
        .bind(identifier.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1) AND is_active = TRUE"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_id_by_username(&self, username: &str) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE username = $1 AND is_active = TRUE",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Clear an expired soft ban
    pub async fn lift_soft_ban(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_soft_banned = FALSE, soft_ban_expires = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user_id, "soft ban expired and lifted");
        Ok(())
    }

    pub async fn update(&self, user_id: Uuid, update: UserUpdate) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                email = COALESCE(LOWER($4), email),
                phone = COALESCE($5, phone),
                date_of_birth = COALESCE($6, date_of_birth),
                country = COALESCE($7, country),
                bio = COALESCE($8, bio),
                about = COALESCE($9, about),
                image = COALESCE($10, image),
                banner = COALESCE($11, banner),
                role = COALESCE($12, role),
                is_active = COALESCE($13, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(update.name)
        .bind(update.username)
        .bind(update.email)
        .bind(update.phone)
        .bind(update.date_of_birth)
        .bind(update.country)
        .bind(update.bio)
        .bind(update.about)
        .bind(update.image)
        .bind(update.banner)
        .bind(update.role)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("user", user_id))?;

        Ok(user)
    }

    pub async fn clear_image(&self, user_id: Uuid) -> Result<User> {
        self.clear_column(user_id, "image").await
    }

    pub async fn clear_banner(&self, user_id: Uuid) -> Result<User> {
        self.clear_column(user_id, "banner").await
    }

    async fn clear_column(&self, user_id: Uuid, column: &'static str) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET {column} = NULL, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("user", user_id))
    }

    /// Soft-delete the account and remove everything it authored
    pub async fn deactivate(&self, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found_by_id("user", user_id));
        }

        sqlx::query("DELETE FROM replies WHERE author_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE author_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM posts WHERE author_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = %user_id, "account deactivated");
        Ok(())
    }

    // =================================================================
    // Passwords
    // =================================================================

    /// Store a new hash; `changed_at` is backdated by a second so a token
    /// issued right after the change stays valid
    pub async fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                password_hash = $2,
                password_changed_at = NOW() - INTERVAL '1 second',
                password_reset_token = NULL,
                password_reset_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found_by_id("user", user_id))
    }

    pub async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: Option<&str>,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET password_reset_token = $2, password_reset_expires = $3
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE password_reset_token = $1 AND password_reset_expires > NOW()
              AND is_active = TRUE
            "#
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // =================================================================
    // Saved posts
    // =================================================================

    /// Returns `true` when the post is now saved
    pub async fn toggle_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(AppError::not_found_by_id("post", post_id));
        }

        let removed = sqlx::query("DELETE FROM saved_posts WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO saved_posts (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    pub async fn saved_post_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT post_id FROM saved_posts WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn saved_posts(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            {POST_SELECT}
            JOIN saved_posts s ON s.post_id = p.id
            WHERE s.user_id = $1
            ORDER BY s.created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    // =================================================================
    // Admin
    // =================================================================

    /// All active users, or the five newest when `newest_only`
    pub async fn list(&self, newest_only: bool) -> Result<Vec<User>> {
        let limit = if newest_only { "LIMIT 5" } else { "" };
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = TRUE ORDER BY created_at DESC {limit}"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Registrations per month over the last year
    pub async fn stats(&self) -> Result<Vec<MonthlyStat>> {
        let stats = sqlx::query_as::<_, MonthlyStat>(
            r#"
            SELECT EXTRACT(MONTH FROM created_at)::INT AS month, COUNT(*) AS total
            FROM users
            WHERE created_at >= NOW() - INTERVAL '1 year'
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found_by_id("user", user_id));
        }
        tracing::info!(user_id = %user_id, "user deleted by admin");
        Ok(())
    }
}
