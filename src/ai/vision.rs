use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use super::{normalizer, AiService, AnalysisError, GenerateRequest, NutritionEstimate, Part};

pub(crate) const ANALYSIS_PROMPT: &str = r#"
Analyze this food image and provide the nutrition information in a strict JSON format.
Include:
1. 'items': List of objects with:
   - 'name': (string)
   - 'confidence': (float 0.0 to 1.0)
   - 'calories': (float)
   - 'protein': (float)
   - 'carbs': (float)
   - 'fats': (float)
   - 'fiber': (float)
   - 'sugar': (float)
   - 'sodium': (float)
   - 'portion': (string, e.g., '1 cup', '100g')
   - 'weight_grams': (float)
2. 'total_calories': sum of calories.
3. 'total_protein': sum of protein.
4. 'total_carbs': sum of carbs.
5. 'total_fats': sum of fats.
6. 'health_score': (string, 'A', 'B', 'C', or 'D')
7. 'dietary_tags': (list of strings, e.g., ['Vegetarian', 'High Protein'])
8. 'ai_insights': (string, brief summary of the meal's healthiness)
"#;

impl AiService {
    /// Sends the photo to the vision model and normalises its answer.
    /// Without a configured key this returns placeholder data and does no I/O.
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub async fn analyze_image(
        &self,
        image: Bytes,
        content_type: &str,
    ) -> Result<NutritionEstimate, AnalysisError> {
        let Some(key) = &self.api_key else {
            warn!("GEMINI_API_KEY not configured; returning mock analysis");
            return Ok(NutritionEstimate::mock());
        };

        let request = GenerateRequest {
            model: self.vision_model.clone(),
            parts: vec![
                Part::Text(ANALYSIS_PROMPT.to_string()),
                Part::InlineImage {
                    mime_type: content_type.to_string(),
                    data: image,
                },
            ],
        };

        let raw = self.model.generate(key, request).await.map_err(|e| {
            error!(error = %e, status = ?e.status, "vision request failed");
            AnalysisError::from(e)
        })?;
        debug!(raw = %raw, "vision model raw response");

        let estimate = normalizer::normalize(&raw)?;
        info!(
            items = estimate.items.len(),
            calories = estimate.calories,
            "image analysed"
        );
        Ok(estimate)
    }
}
