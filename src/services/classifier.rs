// 植物病害识别服务客户端
use crate::domain::analysis::{HealthResponse, PredictionRequest, PredictionResponse, PredictionResult};
use crate::services::camera::is_placeholder;
use crate::services::transport::{DeviceTransport, TransportError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, error, info};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const PREDICT_TIMEOUT: Duration = Duration::from_secs(30);

// 近黑像素：R、G、B 都小于该值
const DARK_CHANNEL_LIMIT: u8 = 10;
const BLANK_RATIO: f64 = 0.95;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("ML API is not connected")]
    NotConnected,
    #[error("camera image is blank or black, check the camera feed")]
    BlankFrame,
    #[error("camera feed is not available, check the camera connection")]
    CameraOffline,
    #[error("frame contains no image data")]
    EmptyFrame,
    #[error("ML API request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("ML API returned status '{0}'")]
    Rejected(String),
    #[error("unexpected ML API response: {0}")]
    Parse(String),
}

/// 一帧截图：JPEG 数据，可选的已解码 RGBA 像素
#[derive(Debug, Clone)]
pub struct Frame {
    pub source_url: String,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub rgba: Option<Vec<u8>>,
}

impl Frame {
    pub fn from_jpeg(source_url: impl Into<String>, jpeg: Vec<u8>) -> Self {
        Self {
            source_url: source_url.into(),
            jpeg,
            width: 640,
            height: 480,
            rgba: None,
        }
    }

    #[cfg(test)]
    pub fn with_pixels(mut self, width: u32, height: u32, rgba: Vec<u8>) -> Self {
        self.width = width;
        self.height = height;
        self.rgba = Some(rgba);
        self
    }

    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.jpeg))
    }
}

/// 超过 95% 的像素接近纯黑即视为空白帧
pub fn is_frame_blank(rgba: &[u8], width: u32, height: u32) -> bool {
    let total = if width == 0 || height == 0 {
        rgba.len() / 4
    } else {
        (width as usize) * (height as usize)
    };
    if total == 0 {
        return true;
    }
    let dark = rgba
        .chunks_exact(4)
        .filter(|px| {
            px[0] < DARK_CHANNEL_LIMIT && px[1] < DARK_CHANNEL_LIMIT && px[2] < DARK_CHANNEL_LIMIT
        })
        .count();
    (dark as f64) / (total as f64) > BLANK_RATIO
}

pub fn validate_frame(frame: &Frame) -> Result<(), ClassifierError> {
    if is_placeholder(&frame.source_url) {
        return Err(ClassifierError::CameraOffline);
    }
    if frame.jpeg.is_empty() {
        return Err(ClassifierError::EmptyFrame);
    }
    if let Some(rgba) = &frame.rgba {
        if is_frame_blank(rgba, frame.width, frame.height) {
            return Err(ClassifierError::BlankFrame);
        }
    }
    Ok(())
}

pub struct PlantClassifier<T> {
    transport: Arc<T>,
    base_url: String,
}

impl<T: DeviceTransport> PlantClassifier<T> {
    pub fn new(transport: Arc<T>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `/health` 返回 model_loaded 为真才算可用
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.transport.get_json(&url, HEALTH_TIMEOUT).await {
            Ok(body) => {
                debug!("ML API health: {}", body);
                serde_json::from_value::<HealthResponse>(body)
                    .map(|h| h.model_loaded)
                    .unwrap_or(false)
            }
            Err(e) => {
                error!("ML API connection failed: {}", e);
                false
            }
        }
    }

    pub async fn predict(&self, frame: &Frame) -> Result<PredictionResult, ClassifierError> {
        validate_frame(frame)?;

        let request = PredictionRequest {
            image: frame.data_url(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;
        let url = format!("{}/predict", self.base_url);
        let response = self.transport.post_json(&url, &body, PREDICT_TIMEOUT).await?;

        let response: PredictionResponse = serde_json::from_value(response)
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;
        if response.status != "success" {
            return Err(ClassifierError::Rejected(
                response.message.unwrap_or(response.status),
            ));
        }
        let prediction = response
            .prediction
            .ok_or_else(|| ClassifierError::Parse("missing prediction".to_string()))?;
        info!(
            "ML prediction: {} / {} ({:.1}%)",
            prediction.plant,
            prediction.disease,
            prediction.confidence * 100.0
        );
        Ok(prediction)
    }
}
