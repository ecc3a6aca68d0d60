use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// One user message and the coach's answer. Append-only.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatExchange {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub message: String,
    pub response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
