//! Turns free-form model output into a [`NutritionEstimate`].
//!
//! The model is asked for strict JSON but tends to wrap it in Markdown fences
//! and to leave fields out. Missing keys fall back to defaults. Totals and
//! the shape of `items` are strict; display-only text is coerced leniently.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::AnalysisError;
use super::types::{FoodItem, NutritionEstimate, DEFAULT_HEALTH_SCORE, DEFAULT_INSIGHTS};

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Returns the payload of the first ```json fence, else of the first generic
/// fence pair, else the whole text. An unclosed fence runs to the end.
pub fn extract_json_block(text: &str) -> &str {
    let block = if let Some(start) = text.find(JSON_FENCE) {
        until_fence(&text[start + JSON_FENCE.len()..])
    } else if let Some(start) = text.find(FENCE) {
        until_fence(&text[start + FENCE.len()..])
    } else {
        text
    };
    block.trim()
}

fn until_fence(rest: &str) -> &str {
    match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

pub fn normalize(raw_text: &str) -> Result<NutritionEstimate, AnalysisError> {
    let fail = |reason: String| {
        warn!(%reason, "model response rejected");
        AnalysisError::Parse {
            raw_text: raw_text.to_string(),
            reason,
        }
    };

    let extracted = extract_json_block(raw_text);
    debug!(extracted, "cleaned model response");

    let parsed: Value = serde_json::from_str(extracted).map_err(|e| fail(e.to_string()))?;
    let obj = match parsed {
        Value::Object(obj) => obj,
        other => {
            return Err(fail(format!(
                "expected a JSON object, found {}",
                kind_of(&other)
            )))
        }
    };

    let items = match obj.get("items") {
        None => Vec::new(),
        Some(v) => serde_json::from_value::<Vec<FoodItem>>(v.clone())
            .map_err(|e| fail(format!("items: {e}")))?,
    };

    let estimate = NutritionEstimate {
        items,
        calories: total(&obj, "total_calories").map_err(fail)?,
        protein: total(&obj, "total_protein").map_err(fail)?,
        carbs: total(&obj, "total_carbs").map_err(fail)?,
        fats: total(&obj, "total_fats").map_err(fail)?,
        health_score: display_text(&obj, "health_score", DEFAULT_HEALTH_SCORE),
        dietary_tags: tags(&obj),
        ai_insights: display_text(&obj, "ai_insights", DEFAULT_INSIGHTS),
        mock: false,
    };
    debug!(?estimate, "parsed nutrition estimate");
    Ok(estimate)
}

/// Absent key means 0.0. Present values must coerce to a finite, non-negative number.
fn total(obj: &Map<String, Value>, key: &str) -> Result<f64, String> {
    let Some(value) = obj.get(key) else {
        return Ok(0.0);
    };
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .ok_or_else(|| format!("{key}: expected a number, found {}", kind_of(value)))?;

    if !n.is_finite() || n < 0.0 {
        return Err(format!("{key}: expected a non-negative number, found {n}"));
    }
    Ok(n)
}

/// Display-only text: strings kept, scalars stringified, anything else defaulted.
fn display_text(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => {
            if !other.is_null() {
                debug!(key, found = kind_of(other), "ignoring non-text field");
            }
            default.to_string()
        }
        None => default.to_string(),
    }
}

/// String elements of `dietary_tags`; a lone string counts as one tag.
fn tags(obj: &Map<String, Value>) -> Vec<String> {
    match obj.get("dietary_tags") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
