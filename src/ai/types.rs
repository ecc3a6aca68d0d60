use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_HEALTH_SCORE: &str = "B";
pub const DEFAULT_INSIGHTS: &str = "Balanced meal.";

/// A single food the model recognised on the plate. Every field is optional
/// because the model routinely leaves some of them out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub fats: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub portion: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub weight_grams: Option<f64>,
}

/// Normalised analysis of one meal photo. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionEstimate {
    pub items: Vec<FoodItem>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    /// Usually one of A/B/C/D but passed through unvalidated; display only.
    pub health_score: String,
    pub dietary_tags: Vec<String>,
    pub ai_insights: String,
    /// Set when no provider credential is configured and this is placeholder data.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
}

impl NutritionEstimate {
    pub fn mock() -> Self {
        Self {
            items: vec![FoodItem {
                name: Some("Mock Food".into()),
                calories: Some(250.0),
                ..FoodItem::default()
            }],
            calories: 250.0,
            protein: 10.0,
            carbs: 30.0,
            fats: 8.0,
            health_score: DEFAULT_HEALTH_SCORE.into(),
            dietary_tags: Vec::new(),
            ai_insights: DEFAULT_INSIGHTS.into(),
            mock: true,
        }
    }
}

/// Numbers or numeric strings become `Some`; anything else is treated as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Strings as-is, numbers and booleans stringified, anything else absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}
