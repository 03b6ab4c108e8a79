// 设备 HTTP 传输层
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tokio::time::{timeout, Duration};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("request to {url} timed out after {after_ms} ms")]
    Timeout { url: String, after_ms: u128 },
    #[error("request failed: {0}")]
    Request(String),
    #[error("device answered HTTP {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Body(String),
    #[error("device rejected the request: {0}")]
    Rejected(String),
}

/// 与设备/外部服务通信的最小接口，测试中用假实现替换
pub trait DeviceTransport: Send + Sync + 'static {
    fn get_json(
        &self,
        url: &str,
        limit: Duration,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    fn post_json(
        &self,
        url: &str,
        body: &Value,
        limit: Duration,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// 仅检查资源是否以 2xx 应答（摄像头流）
    fn probe(&self, url: &str, limit: Duration) -> impl Future<Output = bool> + Send;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    TransportError::Request(e.to_string())
}

impl DeviceTransport for HttpTransport {
    async fn get_json(&self, url: &str, limit: Duration) -> Result<Value, TransportError> {
        let request = async {
            let response = self.client.get(url).send().await.map_err(request_error)?;
            Self::read_json(response).await
        };
        match timeout(limit, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                url: url.to_string(),
                after_ms: limit.as_millis(),
            }),
        }
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        limit: Duration,
    ) -> Result<Value, TransportError> {
        let request = async {
            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(request_error)?;
            Self::read_json(response).await
        };
        match timeout(limit, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                url: url.to_string(),
                after_ms: limit.as_millis(),
            }),
        }
    }

    async fn probe(&self, url: &str, limit: Duration) -> bool {
        // 只看响应头，MJPEG 流的 body 不会结束
        match timeout(limit, self.client.get(url).send()).await {
            Ok(Ok(response)) => response.status().is_success(),
            _ => false,
        }
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum FakeReply {
        Json(Value),
        Status(u16),
        Timeout,
    }

    /// 按 URL 预设应答并记录所有请求
    pub struct FakeTransport {
        replies: Mutex<HashMap<String, FakeReply>>,
        default_reply: FakeReply,
        calls: Mutex<Vec<String>>,
        posted: Mutex<Vec<Value>>,
    }

    impl FakeTransport {
        pub fn new(default_reply: FakeReply) -> Self {
            Self {
                replies: Mutex::new(HashMap::new()),
                default_reply,
                calls: Mutex::new(Vec::new()),
                posted: Mutex::new(Vec::new()),
            }
        }

        pub fn timing_out() -> Self {
            Self::new(FakeReply::Timeout)
        }

        pub fn reply(&self, url: &str, reply: FakeReply) {
            self.replies.lock().unwrap().insert(url.to_string(), reply);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn posted(&self) -> Vec<Value> {
            self.posted.lock().unwrap().clone()
        }

        fn answer(&self, url: &str, limit: Duration) -> Result<Value, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| self.default_reply.clone());
            match reply {
                FakeReply::Json(value) => Ok(value),
                FakeReply::Status(code) => Err(TransportError::Status(code)),
                FakeReply::Timeout => Err(TransportError::Timeout {
                    url: url.to_string(),
                    after_ms: limit.as_millis(),
                }),
            }
        }
    }

    impl DeviceTransport for FakeTransport {
        async fn get_json(&self, url: &str, limit: Duration) -> Result<Value, TransportError> {
            self.answer(url, limit)
        }

        async fn post_json(
            &self,
            url: &str,
            body: &Value,
            limit: Duration,
        ) -> Result<Value, TransportError> {
            self.posted.lock().unwrap().push(body.clone());
            self.answer(url, limit)
        }

        async fn probe(&self, url: &str, limit: Duration) -> bool {
            self.answer(url, limit).is_ok()
        }
    }
}
