// 巡检命令：摄像头与病害识别
use crate::commands::Console;
use crate::domain::analysis::PredictionResult;
use crate::domain::state::lock_state;
use crate::services::camera::CameraFeed;
use crate::services::classifier::{ClassifierError, Frame, PlantClassifier};
use crate::services::transport::DeviceTransport;
use std::sync::Arc;

fn classifier<T: DeviceTransport>(console: &Console<T>) -> PlantClassifier<T> {
    let url = lock_state(console.state()).settings.ml_api_url.clone();
    PlantClassifier::new(Arc::clone(console.dispatcher.transport()), &url)
}

pub async fn test_ml_connection<T: DeviceTransport>(console: &mut Console<T>) -> bool {
    let connected = classifier(console).health().await;
    lock_state(console.state()).ml_connected = connected;
    connected
}

pub async fn select_camera_feed<T: DeviceTransport>(console: &Console<T>) -> String {
    let feed = {
        let state = lock_state(console.state());
        CameraFeed::new(
            state.settings.camera_host.clone(),
            state.settings.camera_port.clone(),
        )
    };
    feed.select(console.dispatcher.transport().as_ref()).await
}

pub async fn analyze_frame<T: DeviceTransport>(
    console: &mut Console<T>,
    frame: &Frame,
) -> Result<PredictionResult, String> {
    if !lock_state(console.state()).ml_connected {
        return Err(ClassifierError::NotConnected.to_string());
    }
    let prediction = classifier(console)
        .predict(frame)
        .await
        .map_err(|e| e.to_string())?;
    lock_state(console.state()).push_prediction(prediction.clone());
    Ok(prediction)
}
