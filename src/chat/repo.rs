use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::ChatExchange;

impl ChatExchange {
    pub async fn append(
        db: &PgPool,
        user_id: Uuid,
        message: &str,
        response: &str,
    ) -> anyhow::Result<ChatExchange> {
        let row = sqlx::query_as::<_, ChatExchange>(
            r#"
            INSERT INTO chat_messages (id, user_id, message, response)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, message, response, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(message)
        .bind(response)
        .fetch_one(db)
        .await
        .context("insert chat message")?;
        Ok(row)
    }

    /// Oldest first, so the app can render the conversation top to bottom.
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<ChatExchange>> {
        let rows = sqlx::query_as::<_, ChatExchange>(
            r#"
            SELECT id, user_id, message, response, created_at
            FROM chat_messages
            WHERE user_id = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list chat messages")?;
        Ok(rows)
    }
}
