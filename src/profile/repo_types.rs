use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Optional body metrics and goals attached to a user.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub age: Option<i32>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub goal: Option<String>,
    pub lifestyle: Option<String>,
}
