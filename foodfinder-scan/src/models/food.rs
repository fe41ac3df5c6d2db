//! Recognition and catalog payloads

use serde::{Deserialize, Serialize};

/// One recognized-dish candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPrediction {
    pub food_name: String,
    /// Model confidence in [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub class_id: i64,
    #[serde(default)]
    pub description: String,
}

impl FoodPrediction {
    /// Confidence as a percentage with one decimal, e.g. "91.2%"
    pub fn confidence_label(&self) -> String {
        format_confidence(self.confidence)
    }
}

/// `POST /api/food/recognize` response
///
/// `predictions` is in rank order, most confident first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub predictions: Vec<FoodPrediction>,
    #[serde(default)]
    pub top_prediction: Option<FoodPrediction>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: String,
}

fn default_success() -> bool {
    true
}

impl RecognitionResponse {
    /// Highest-ranked prediction
    ///
    /// The ranked list wins over `top_prediction` when both are present.
    pub fn top(&self) -> Option<&FoodPrediction> {
        self.predictions.first().or(self.top_prediction.as_ref())
    }
}

/// Catalog entry from `GET /api/food/dishes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishCatalog {
    #[serde(default)]
    pub dishes: Vec<Dish>,
}

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Format a [0, 1] confidence as a percentage rounded to one decimal
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}
