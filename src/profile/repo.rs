use sqlx::PgPool;
use uuid::Uuid;

use super::{dto::UpdateProfileRequest, repo_types::UserProfile};

impl UserProfile {
    pub async fn find(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, age, height, weight, goal, lifestyle
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Insert or patch; fields left out of the request keep their stored value.
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        req: &UpdateProfileRequest,
    ) -> anyhow::Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, age, height, weight, goal, lifestyle)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                age       = COALESCE(EXCLUDED.age, user_profiles.age),
                height    = COALESCE(EXCLUDED.height, user_profiles.height),
                weight    = COALESCE(EXCLUDED.weight, user_profiles.weight),
                goal      = COALESCE(EXCLUDED.goal, user_profiles.goal),
                lifestyle = COALESCE(EXCLUDED.lifestyle, user_profiles.lifestyle)
            RETURNING user_id, age, height, weight, goal, lifestyle
            "#,
        )
        .bind(user_id)
        .bind(req.age)
        .bind(req.height)
        .bind(req.weight)
        .bind(req.goal.as_deref())
        .bind(req.lifestyle.as_deref())
        .fetch_one(db)
        .await?;
        Ok(profile)
    }
}
