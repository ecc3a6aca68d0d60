use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{ScanFeedback, ScanRecord};
use crate::ai::FoodItem;

/// Scan as returned to the app.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub id: Uuid,
    pub image_url: String,
    pub detected_foods: Vec<FoodItem>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
    pub total_fiber: f64,
    pub total_sugar: f64,
    pub total_sodium: f64,
    pub confidence_score: Option<f64>,
    pub health_score: String,
    pub dietary_tags: Vec<String>,
    pub ai_insights: String,
    pub meal_type: Option<String>,
    pub feedback: Option<ScanFeedback>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mock_data: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ScanResponse {
    pub fn new(scan: ScanRecord, feedback: Option<ScanFeedback>, image_url: String) -> Self {
        let items = scan.food_items.0;
        Self {
            id: scan.id,
            image_url,
            total_calories: scan.calories,
            total_protein: scan.protein,
            total_carbs: scan.carbs,
            total_fats: scan.fats,
            total_fiber: sum_of(&items, |i| i.fiber),
            total_sugar: sum_of(&items, |i| i.sugar),
            total_sodium: sum_of(&items, |i| i.sodium),
            confidence_score: mean_confidence(&items),
            detected_foods: items,
            health_score: scan.health_score,
            dietary_tags: scan.dietary_tags,
            ai_insights: scan.ai_insights,
            meal_type: scan.meal_type,
            feedback,
            mock_data: false,
            created_at: scan.created_at,
        }
    }
}

fn sum_of(items: &[FoodItem], field: impl Fn(&FoodItem) -> Option<f64>) -> f64 {
    items.iter().filter_map(field).sum()
}

fn mean_confidence(items: &[FoodItem]) -> Option<f64> {
    let scores: Vec<f64> = items.iter().filter_map(|i| i.confidence).collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackInput {
    pub is_accurate: bool,
    pub correct_food_name: Option<String>,
    pub comments: Option<String>,
}

/// Partial update. Items and totals are stored as given, never re-derived.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateScanRequest {
    pub meal_type: Option<String>,
    pub detected_foods: Option<Vec<FoodItem>>,
    pub total_calories: Option<f64>,
    pub total_protein: Option<f64>,
    pub total_carbs: Option<f64>,
    pub total_fats: Option<f64>,
    pub feedback: Option<FeedbackInput>,
}

impl UpdateScanRequest {
    pub fn validate(&self) -> Result<(), String> {
        let totals = [
            ("total_calories", self.total_calories),
            ("total_protein", self.total_protein),
            ("total_carbs", self.total_carbs),
            ("total_fats", self.total_fats),
        ];
        for (name, value) in totals {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(format!("{name} must be a non-negative number"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn record(items: Vec<FoodItem>) -> ScanRecord {
        ScanRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            image_key: "scans/u/x.jpg".into(),
            food_items: Json(items),
            calories: 450.0,
            protein: 20.0,
            carbs: 50.0,
            fats: 15.0,
            health_score: "B".into(),
            dietary_tags: vec!["Vegetarian".into()],
            ai_insights: "Balanced meal.".into(),
            meal_type: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn derived_totals_come_from_items() {
        let items = vec![
            FoodItem { fiber: Some(3.0), sodium: Some(200.0), confidence: Some(0.9), ..Default::default() },
            FoodItem { fiber: Some(1.5), sugar: Some(4.0), confidence: Some(0.7), ..Default::default() },
            FoodItem::default(),
        ];
        let resp = ScanResponse::new(record(items), None, "https://img".into());

        assert_eq!(resp.total_calories, 450.0);
        assert_eq!(resp.total_fiber, 4.5);
        assert_eq!(resp.total_sugar, 4.0);
        assert_eq!(resp.total_sodium, 200.0);
        assert!((resp.confidence_score.unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(resp.detected_foods.len(), 3);
    }

    #[test]
    fn empty_scan_has_zero_extras_and_no_confidence() {
        let resp = ScanResponse::new(record(vec![]), None, "u".into());
        assert_eq!(resp.total_fiber, 0.0);
        assert_eq!(resp.confidence_score, None);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert!(json.get("mock_data").is_none());
        assert!(json["feedback"].is_null());
    }

    #[test]
    fn update_rejects_negative_totals() {
        let req = UpdateScanRequest { total_fats: Some(-1.0), ..Default::default() };
        assert_eq!(req.validate().unwrap_err(), "total_fats must be a non-negative number");
        assert!(UpdateScanRequest { total_fats: Some(2.0), ..Default::default() }.validate().is_ok());
    }
}
