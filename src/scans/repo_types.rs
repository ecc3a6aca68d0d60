use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ai::FoodItem;

/// A persisted scan. Totals are never null once the row exists.
#[derive(Debug, Clone, FromRow)]
pub struct ScanRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_key: String,
    pub food_items: Json<Vec<FoodItem>>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub health_score: String,
    pub dietary_tags: Vec<String>,
    pub ai_insights: String,
    pub meal_type: Option<String>,
    pub created_at: OffsetDateTime,
}

/// User correction attached to a scan (at most one per scan).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScanFeedback {
    #[serde(skip_serializing)]
    pub scan_id: Uuid,
    pub is_accurate: bool,
    pub correct_food_name: Option<String>,
    pub comments: Option<String>,
}
