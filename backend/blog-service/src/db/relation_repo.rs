use crate::models::{BlockRow, BlockedUser, MuteRow};
use crate::moderation::{BlockEntry, MuteEntry};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

// =====================================================================
// Mutes
// =====================================================================

pub async fn list_mutes(pool: &PgPool, user_id: Uuid) -> Result<Vec<MuteRow>, sqlx::Error> {
    sqlx::query_as::<_, MuteRow>(
        r#"
        SELECT target_type, target_id, reason, muted_at
        FROM user_mutes
        WHERE user_id = $1
        ORDER BY muted_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_mute(
    pool: &PgPool,
    user_id: Uuid,
    entry: &MuteEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_mutes (user_id, target_type, target_id, reason, muted_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, target_type, target_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(entry.target.target_type())
    .bind(entry.target.id())
    .bind(&entry.reason)
    .bind(entry.muted_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_mute(
    pool: &PgPool,
    user_id: Uuid,
    entry: &MuteEntry,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM user_mutes
        WHERE user_id = $1 AND target_type = $2 AND target_id = $3
        "#,
    )
    .bind(user_id)
    .bind(entry.target.target_type())
    .bind(entry.target.id())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =====================================================================
// Blocks
// =====================================================================

/// Users `user_id` has blocked
pub async fn list_blocks(pool: &PgPool, user_id: Uuid) -> Result<Vec<BlockRow>, sqlx::Error> {
    sqlx::query_as::<_, BlockRow>(
        r#"
        SELECT blocked_id, reason, blocked_at
        FROM user_blocks
        WHERE blocker_id = $1
        ORDER BY blocked_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Union of users `user_id` blocked and users who blocked `user_id`
pub async fn mutual_blocks(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT blocked_id FROM user_blocks WHERE blocker_id = $1
        UNION
        SELECT blocker_id FROM user_blocks WHERE blocked_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// `(actor blocked owner, owner blocked actor)`
pub async fn block_status(
    pool: &PgPool,
    actor: Uuid,
    owner: Uuid,
) -> Result<(bool, bool), sqlx::Error> {
    let row: (bool, bool) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM user_blocks WHERE blocker_id = $1 AND blocked_id = $2),
            EXISTS (SELECT 1 FROM user_blocks WHERE blocker_id = $2 AND blocked_id = $1)
        "#,
    )
    .bind(actor)
    .bind(owner)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_blocked_users(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<BlockedUser>, sqlx::Error> {
    sqlx::query_as::<_, BlockedUser>(
        r#"
        SELECT u.id, u.username, u.email, u.name, u.image, b.reason, b.blocked_at
        FROM user_blocks b
        JOIN users u ON u.id = b.blocked_id
        WHERE b.blocker_id = $1
        ORDER BY b.blocked_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_block(
    conn: &mut PgConnection,
    blocker_id: Uuid,
    entry: &BlockEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_blocks (blocker_id, blocked_id, reason, blocked_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (blocker_id, blocked_id) DO NOTHING
        "#,
    )
    .bind(blocker_id)
    .bind(entry.blocked_id)
    .bind(&entry.reason)
    .bind(entry.blocked_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn delete_block(
    pool: &PgPool,
    blocker_id: Uuid,
    blocked_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_blocks WHERE blocker_id = $1 AND blocked_id = $2")
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Drop saved posts that either user saved from the other's authorship
pub async fn sever_saved_posts(
    conn: &mut PgConnection,
    a: Uuid,
    b: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM saved_posts s
        USING posts p
        WHERE s.post_id = p.id
          AND ((s.user_id = $1 AND p.author_id = $2)
            OR (s.user_id = $2 AND p.author_id = $1))
        "#,
    )
    .bind(a)
    .bind(b)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
