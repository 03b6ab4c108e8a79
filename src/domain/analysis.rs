// 植物病害识别结果
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub plant: String,
    pub disease: String,
    #[serde(default)]
    pub full_class: String,
    pub confidence: f64,
    pub is_healthy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    pub prediction: Option<PredictionResult>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub model_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct PredictionRequest {
    pub image: String, // data:image/jpeg;base64,...
}
