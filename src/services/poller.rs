// 自动模式下的状态轮询
use crate::domain::device::{DeviceEndpoint, DeviceRole};
use crate::domain::state::{lock_state, SensorReading};
use crate::services::dispatcher::{CommandDispatcher, STATUS_TIMEOUT};
use crate::services::transport::DeviceTransport;
use chrono::Local;
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// 观察开关打开且电机板在线时，每隔固定周期读取一次 `/status`。
/// 轮询失败只记日志，不会把连接状态改为离线，只有用户触发的分发会这样做
pub struct StatusPoller<T: DeviceTransport> {
    dispatcher: Arc<CommandDispatcher<T>>,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl<T: DeviceTransport> StatusPoller<T> {
    pub fn new(dispatcher: Arc<CommandDispatcher<T>>) -> Self {
        Self {
            dispatcher,
            period: POLL_INTERVAL,
            handle: None,
        }
    }

    #[cfg(test)]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// 状态变化后调用：条件满足则启动，否则停止
    pub fn sync(&mut self) {
        let should_poll = lock_state(self.dispatcher.state()).should_poll();
        if should_poll && !self.is_running() {
            self.start();
        } else if !should_poll {
            self.stop();
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("status poller stopped");
        }
    }

    fn start(&mut self) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let period = self.period;
        info!("status poller started, every {} s", period.as_secs_f32());
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let endpoint = {
                    let state = lock_state(dispatcher.state());
                    if !state.should_poll() {
                        break;
                    }
                    state.settings.endpoint_for(DeviceRole::Motor)
                };
                poll_once(&dispatcher, &endpoint).await;
            }
            debug!("status poller exited");
        }));
    }
}

impl<T: DeviceTransport> Drop for StatusPoller<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 读取一次状态并合并；返回是否成功
pub async fn poll_once<T: DeviceTransport>(
    dispatcher: &CommandDispatcher<T>,
    endpoint: &DeviceEndpoint,
) -> bool {
    match dispatcher.fetch_status(endpoint, STATUS_TIMEOUT).await {
        Ok(fields) => {
            debug!("device status: {:?}", fields);
            let mut state = lock_state(dispatcher.state());
            state.snapshot.merge(&fields);

            if fields.get("mode").and_then(Value::as_str) == Some("automatic") {
                let detail = fields
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("Running automatic cycle");
                state.auto_mode_status = format!("Active - {}", detail);
            }

            if let Some(moisture) = fields.get("soilMoisture") {
                state.push_sensor_reading(SensorReading {
                    soil_moisture: moisture.as_i64(),
                    soil_status: fields.get("soilStatus").and_then(Value::as_str).map(String::from),
                    servo_position: fields
                        .get("servoPosition")
                        .and_then(Value::as_str)
                        .map(String::from),
                    message: "Automatic sensor reading".to_string(),
                    timestamp: Local::now().format("%H:%M:%S").to_string(),
                    simulated: false,
                });
            }
            true
        }
        Err(e) => {
            debug!("status check failed, device may be busy: {}", e);
            false
        }
    }
}
