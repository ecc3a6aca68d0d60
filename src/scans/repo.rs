use anyhow::Context;
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    dto::{FeedbackInput, UpdateScanRequest},
    repo_types::{ScanFeedback, ScanRecord},
};
use crate::ai::NutritionEstimate;

const SCAN_COLUMNS: &str = "id, user_id, image_key, food_items, calories, protein, carbs, fats, \
     health_score, dietary_tags, ai_insights, meal_type, created_at";

impl ScanRecord {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        image_key: &str,
        estimate: &NutritionEstimate,
    ) -> anyhow::Result<ScanRecord> {
        let scan = sqlx::query_as::<_, ScanRecord>(&format!(
            r#"
            INSERT INTO food_scans
                (id, user_id, image_key, food_items, calories, protein, carbs, fats,
                 health_score, dietary_tags, ai_insights)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SCAN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(image_key)
        .bind(Json(&estimate.items))
        .bind(estimate.calories)
        .bind(estimate.protein)
        .bind(estimate.carbs)
        .bind(estimate.fats)
        .bind(&estimate.health_score)
        .bind(&estimate.dietary_tags)
        .bind(&estimate.ai_insights)
        .fetch_one(db)
        .await
        .context("insert scan")?;
        Ok(scan)
    }

    /// Newest first.
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRecord>(&format!(
            r#"
            SELECT {SCAN_COLUMNS}
            FROM food_scans
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list scans")?;
        Ok(rows)
    }

    pub async fn find_owned(
        db: &PgPool,
        user_id: Uuid,
        scan_id: Uuid,
    ) -> anyhow::Result<Option<ScanRecord>> {
        let row = sqlx::query_as::<_, ScanRecord>(&format!(
            "SELECT {SCAN_COLUMNS} FROM food_scans WHERE id = $1 AND user_id = $2"
        ))
        .bind(scan_id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find scan")?;
        Ok(row)
    }

    /// Applies a partial update and optional feedback in one transaction.
    /// Returns `None` when the scan does not exist or belongs to someone else.
    pub async fn update_owned(
        db: &PgPool,
        user_id: Uuid,
        scan_id: Uuid,
        req: &UpdateScanRequest,
    ) -> anyhow::Result<Option<(ScanRecord, Option<ScanFeedback>)>> {
        let mut tx = db.begin().await.context("begin tx")?;

        let scan = sqlx::query_as::<_, ScanRecord>(&format!(
            r#"
            UPDATE food_scans SET
                meal_type  = COALESCE($3, meal_type),
                food_items = COALESCE($4, food_items),
                calories   = COALESCE($5, calories),
                protein    = COALESCE($6, protein),
                carbs      = COALESCE($7, carbs),
                fats       = COALESCE($8, fats)
            WHERE id = $1 AND user_id = $2
            RETURNING {SCAN_COLUMNS}
            "#
        ))
        .bind(scan_id)
        .bind(user_id)
        .bind(req.meal_type.as_deref())
        .bind(req.detected_foods.clone().map(Json))
        .bind(req.total_calories)
        .bind(req.total_protein)
        .bind(req.total_carbs)
        .bind(req.total_fats)
        .fetch_optional(&mut *tx)
        .await
        .context("update scan")?;

        let Some(scan) = scan else {
            return Ok(None);
        };

        let feedback = match &req.feedback {
            Some(input) => Some(ScanFeedback::upsert_tx(&mut tx, scan.id, input).await?),
            None => ScanFeedback::for_scans(&mut *tx, &[scan.id]).await?.pop(),
        };

        tx.commit().await.context("commit tx")?;
        Ok(Some((scan, feedback)))
    }
}

impl ScanFeedback {
    async fn upsert_tx(
        tx: &mut Transaction<'_, Postgres>,
        scan_id: Uuid,
        input: &FeedbackInput,
    ) -> anyhow::Result<ScanFeedback> {
        let row = sqlx::query_as::<_, ScanFeedback>(
            r#"
            INSERT INTO scan_feedback (scan_id, is_accurate, correct_food_name, comments)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (scan_id) DO UPDATE SET
                is_accurate       = EXCLUDED.is_accurate,
                correct_food_name = EXCLUDED.correct_food_name,
                comments          = EXCLUDED.comments
            RETURNING scan_id, is_accurate, correct_food_name, comments
            "#,
        )
        .bind(scan_id)
        .bind(input.is_accurate)
        .bind(input.correct_food_name.as_deref())
        .bind(input.comments.as_deref())
        .fetch_one(&mut **tx)
        .await
        .context("upsert feedback")?;
        Ok(row)
    }

    pub async fn for_scans<'e, E>(executor: E, scan_ids: &[Uuid]) -> anyhow::Result<Vec<ScanFeedback>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, ScanFeedback>(
            r#"
            SELECT scan_id, is_accurate, correct_food_name, comments
            FROM scan_feedback
            WHERE scan_id = ANY($1)
            "#,
        )
        .bind(scan_ids)
        .fetch_all(executor)
        .await
        .context("load feedback")?;
        Ok(rows)
    }
}
