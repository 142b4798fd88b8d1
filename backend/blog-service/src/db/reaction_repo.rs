use crate::models::ReactionKind;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Entity kinds that carry like/dislike reactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reactable {
    Post,
    Comment,
    Reply,
}

impl Reactable {
    pub const ALL: [Reactable; 3] = [Reactable::Post, Reactable::Comment, Reactable::Reply];

    fn table(&self) -> &'static str {
        match self {
            Reactable::Post => "posts",
            Reactable::Comment => "comments",
            Reactable::Reply => "replies",
        }
    }

    fn reaction_table(&self) -> &'static str {
        match self {
            Reactable::Post => "post_reactions",
            Reactable::Comment => "comment_reactions",
            Reactable::Reply => "reply_reactions",
        }
    }

    fn key_column(&self) -> &'static str {
        match self {
            Reactable::Post => "post_id",
            Reactable::Comment => "comment_id",
            Reactable::Reply => "reply_id",
        }
    }
}

/// Apply a like/dislike press and return the user's resulting reaction
///
/// The item row is locked for the duration so concurrent presses on the
/// same item serialize and the counters match the reaction rows.
pub async fn toggle_reaction(
    pool: &PgPool,
    target: Reactable,
    item_id: Uuid,
    user_id: Uuid,
    pressed: ReactionKind,
) -> Result<Option<ReactionKind>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(&format!(
        "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
        target.table()
    ))
    .bind(item_id)
    .fetch_one(&mut *tx)
    .await?;

    let current: Option<ReactionKind> = sqlx::query_scalar(&format!(
        "SELECT kind FROM {} WHERE {} = $1 AND user_id = $2",
        target.reaction_table(),
        target.key_column()
    ))
    .bind(item_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let next = pressed.apply_to(current);
    match next {
        Some(kind) => {
            sqlx::query(&format!(
                r#"
                INSERT INTO {table} ({key}, user_id, kind)
                VALUES ($1, $2, $3)
                ON CONFLICT ({key}, user_id)
                DO UPDATE SET kind = EXCLUDED.kind, created_at = NOW()
                "#,
                table = target.reaction_table(),
                key = target.key_column()
            ))
            .bind(item_id)
            .bind(user_id)
            .bind(kind)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE {} = $1 AND user_id = $2",
                target.reaction_table(),
                target.key_column()
            ))
            .bind(item_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    recompute_counters(&mut *tx, target, &[item_id]).await?;
    tx.commit().await?;

    Ok(next)
}

/// Reset `like_count`/`dislike_count` of `item_ids` from the reaction rows
pub async fn recompute_counters(
    conn: &mut PgConnection,
    target: Reactable,
    item_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"
        UPDATE {table} t SET
            like_count = (SELECT COUNT(*) FROM {reactions} r
                          WHERE r.{key} = t.id AND r.kind = 'like'),
            dislike_count = (SELECT COUNT(*) FROM {reactions} r
                             WHERE r.{key} = t.id AND r.kind = 'dislike')
        WHERE t.id = ANY($1)
        "#,
        table = target.table(),
        reactions = target.reaction_table(),
        key = target.key_column()
    ))
    .bind(item_ids)
    .execute(conn)
    .await?;

    Ok(())
}

/// Remove every reaction `a` left on content by `b` and vice versa, then
/// fix the counters of the affected items
pub async fn sever_reactions(
    conn: &mut PgConnection,
    a: Uuid,
    b: Uuid,
) -> Result<u64, sqlx::Error> {
    let mut removed = 0;

    for target in Reactable::ALL {
        let affected: Vec<Uuid> = sqlx::query_scalar(&format!(
            r#"
            DELETE FROM {reactions} r
            USING {table} t
            WHERE r.{key} = t.id
              AND ((r.user_id = $1 AND t.author_id = $2)
                OR (r.user_id = $2 AND t.author_id = $1))
            RETURNING t.id
            "#,
            reactions = target.reaction_table(),
            table = target.table(),
            key = target.key_column()
        ))
        .bind(a)
        .bind(b)
        .fetch_all(&mut *conn)
        .await?;

        removed += affected.len() as u64;
        if !affected.is_empty() {
            recompute_counters(&mut *conn, target, &affected).await?;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_line_up() {
        for target in Reactable::ALL {
            let singular = target.key_column().trim_end_matches("_id");
            assert!(target.reaction_table().starts_with(singular));
        }
        assert_eq!(Reactable::Reply.table(), "replies");
    }
}
