// 命令分发：命令 -> 设备 GET 请求 -> 状态合并 / 离线回退
use crate::domain::command_log::CommandSource;
use crate::domain::device::{DeviceEndpoint, DeviceRole};
use crate::domain::state::{lock_state, Connectivity, SharedState};
use crate::domain::status::fallback_status;
use crate::services::transport::{DeviceTransport, TransportError};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
pub const DUPLICATE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 窗口内的重复命令，什么都没做
    Suppressed,
    /// 未配置端点，没有发出请求
    Unconfigured,
    Live,
    Simulated,
}

/// 同一命令在窗口内只放行一次（键盘自动重复、按钮连点）。只按命令名区分，不看来源
#[derive(Debug)]
pub struct DuplicateFilter {
    window: Duration,
    last_admitted: HashMap<String, Instant>,
}

impl DuplicateFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_admitted: HashMap::new(),
        }
    }

    pub fn admit(&mut self, command: &str, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }
        if let Some(previous) = self.last_admitted.get(command) {
            if now.saturating_duration_since(*previous) < self.window {
                return false;
            }
        }
        self.last_admitted.insert(command.to_string(), now);
        true
    }
}

/// 设备应答必须是 JSON 对象，且 `status` 字段（若有）不是错误
pub fn accept_response(body: Value) -> Result<Map<String, Value>, TransportError> {
    match body {
        Value::Object(fields) => match fields.get("status").and_then(Value::as_str) {
            Some(status @ ("error" | "failed")) => Err(TransportError::Rejected(format!(
                "device reported status '{}'",
                status
            ))),
            _ => Ok(fields),
        },
        other => Err(TransportError::Body(format!("expected a JSON object, got {}", other))),
    }
}

pub struct CommandDispatcher<T> {
    transport: Arc<T>,
    state: SharedState,
    command_timeout: Duration,
    duplicates: Mutex<DuplicateFilter>,
}

impl<T: DeviceTransport> CommandDispatcher<T> {
    pub fn new(transport: Arc<T>, state: SharedState) -> Self {
        Self {
            transport,
            state,
            command_timeout: COMMAND_TIMEOUT,
            duplicates: Mutex::new(DuplicateFilter::new(DUPLICATE_WINDOW)),
        }
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.command_timeout = limit;
        self
    }

    /// `Duration::ZERO` 关闭重复抑制
    #[cfg(test)]
    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.duplicates = Mutex::new(DuplicateFilter::new(window));
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub async fn dispatch(&self, command: &str, source: CommandSource) -> DispatchOutcome {
        self.dispatch_to(DeviceRole::for_command(command), command, source)
            .await
    }

    /// 分发一条命令。日志在请求发出前同步写入；网络结果只影响状态快照与连接状态，
    /// 失败时合并回退状态，从不向调用方返回错误
    pub async fn dispatch_to(
        &self,
        role: DeviceRole,
        command: &str,
        source: CommandSource,
    ) -> DispatchOutcome {
        let admitted = self
            .duplicates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .admit(command, Instant::now());
        if !admitted {
            debug!("suppressing repeated '{}' from {}", command, source);
            return DispatchOutcome::Suppressed;
        }

        let endpoint = {
            let mut state = lock_state(&self.state);
            let entry = state.command_log.push(command, source).to_string();
            info!("{}", entry);
            state.last_command = format!("{} ({})", command, source);
            state.settings.endpoint_for(role)
        };

        if !endpoint.is_configured() {
            warn!("no {} endpoint configured, '{}' not sent", role, command);
            lock_state(&self.state).set_connectivity(role, Connectivity::Simulated);
            return DispatchOutcome::Unconfigured;
        }

        let url = endpoint.command_url(command);
        debug!("sending request to {}", url);
        let result = self
            .transport
            .get_json(&url, self.command_timeout)
            .await
            .and_then(accept_response);

        let mut state = lock_state(&self.state);
        match result {
            Ok(fields) => {
                debug!("{} response: {:?}", role, fields);
                state.snapshot.merge(&fields);
                state.set_connectivity(role, Connectivity::Live);
                DispatchOutcome::Live
            }
            Err(e) => {
                warn!(
                    "{} controller at {} not reachable ({}), using simulated status",
                    role, endpoint, e
                );
                state.snapshot.merge(&fallback_status(command));
                state.set_connectivity(role, Connectivity::Simulated);
                DispatchOutcome::Simulated
            }
        }
    }

    /// 不等待结果；多个并发命令的完成顺序不保证
    pub fn spawn_dispatch(
        self: &Arc<Self>,
        command: String,
        source: CommandSource,
    ) -> JoinHandle<DispatchOutcome> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.dispatch(&command, source).await })
    }

    /// 只读状态查询，不写日志也不改连接状态
    pub async fn fetch_status(
        &self,
        endpoint: &DeviceEndpoint,
        limit: Duration,
    ) -> Result<Map<String, Value>, TransportError> {
        self.transport
            .get_json(&endpoint.command_url("status"), limit)
            .await
            .and_then(accept_response)
    }
}
