// 摄像头视频流地址与回退链
use crate::services::transport::DeviceTransport;
use log::{info, warn};
use tokio::time::Duration;

pub const OFFLINE_PLACEHOLDER: &str =
    "https://via.placeholder.com/640x360/333333/ffffff?text=Camera+Offline";

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFeed {
    pub host: String,
    pub port: String,
}

impl CameraFeed {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    pub fn mjpeg_url(&self) -> String {
        format!("http://{}:{}/mjpegfeed?640x480", self.host, self.port)
    }

    pub fn video_url(&self) -> String {
        format!("http://{}:{}/video", self.host, self.port)
    }

    /// 按顺序尝试：MJPEG -> 视频流 -> 离线占位图
    pub fn candidates(&self) -> Vec<String> {
        let mut urls = Vec::with_capacity(3);
        if !self.host.trim().is_empty() {
            urls.push(self.mjpeg_url());
            urls.push(self.video_url());
        }
        urls.push(OFFLINE_PLACEHOLDER.to_string());
        urls
    }

    pub async fn select<T: DeviceTransport>(&self, transport: &T) -> String {
        for url in self.candidates() {
            if url == OFFLINE_PLACEHOLDER {
                break;
            }
            if transport.probe(&url, PROBE_TIMEOUT).await {
                info!("camera feed loaded from {}", url);
                return url;
            }
            warn!("camera feed {} unavailable, trying next source", url);
        }
        OFFLINE_PLACEHOLDER.to_string()
    }
}

pub fn is_placeholder(url: &str) -> bool {
    url.is_empty() || url.contains("placeholder.com") || url.contains("Camera+Offline")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transport::fake::{FakeReply, FakeTransport};
    use serde_json::json;

    #[tokio::test]
    async fn falls_back_to_video_then_placeholder() {
        let feed = CameraFeed::new("192.168.50.130", "8080");
        let transport = FakeTransport::new(FakeReply::Status(404));
        transport.reply(&feed.video_url(), FakeReply::Json(json!({})));

        assert_eq!(feed.select(&transport).await, feed.video_url());

        let offline = FakeTransport::timing_out();
        assert_eq!(feed.select(&offline).await, OFFLINE_PLACEHOLDER);
        assert_eq!(offline.calls().len(), 2);
    }

    #[tokio::test]
    async fn unconfigured_camera_is_offline_without_probing() {
        let feed = CameraFeed::new("", "8080");
        let transport = FakeTransport::timing_out();

        assert_eq!(feed.select(&transport).await, OFFLINE_PLACEHOLDER);
        assert!(transport.calls().is_empty());
        assert!(is_placeholder(OFFLINE_PLACEHOLDER));
    }
}
