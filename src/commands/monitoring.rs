// 监控视图：把当前状态整理为可展示的结构
use crate::commands::Console;
use crate::domain::analysis::PredictionResult;
use crate::domain::device::{DeviceRole, WorkMode};
use crate::domain::state::{lock_state, Connectivity, SensorReading};
use crate::services::transport::DeviceTransport;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Serialize)]
pub struct EndpointStatus {
    pub role: DeviceRole,
    pub endpoint: String,
    pub connectivity: Connectivity,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub endpoints: Vec<EndpointStatus>,
    pub mode: WorkMode,
    pub auto_mode_status: String,
    pub last_command: String,
    pub status: Map<String, Value>,
    pub command_log: Vec<String>,
    pub sensor_history: Vec<SensorReading>,
    pub ml_connected: bool,
    pub last_prediction: Option<PredictionResult>,
}

pub fn get_dashboard_status<T: DeviceTransport>(console: &Console<T>) -> DashboardView {
    let state = lock_state(console.state());
    DashboardView {
        endpoints: DeviceRole::ALL
            .iter()
            .map(|role| EndpointStatus {
                role: *role,
                endpoint: state.settings.endpoint_for(*role).authority(),
                connectivity: state.connectivity(*role),
            })
            .collect(),
        mode: state.mode,
        auto_mode_status: state.auto_mode_status.clone(),
        last_command: state.last_command.clone(),
        status: state.snapshot.fields().clone(),
        command_log: state.command_log.entries().map(|e| e.to_string()).collect(),
        sensor_history: state.sensor_history.iter().cloned().collect(),
        ml_connected: state.ml_connected,
        last_prediction: state.last_prediction.clone(),
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ep in &self.endpoints {
            let endpoint = if ep.endpoint.is_empty() { "(not set)" } else { ep.endpoint.as_str() };
            writeln!(f, "{:<7} {:<22} [{}]", ep.role, endpoint, ep.connectivity.badge())?;
        }
        writeln!(f, "mode    {:?} - {}", self.mode, self.auto_mode_status)?;
        if !self.last_command.is_empty() {
            writeln!(f, "last    {}", self.last_command)?;
        }
        for (key, value) in &self.status {
            match value {
                Value::String(s) => writeln!(f, "  {:<16} {}", key, s)?,
                other => writeln!(f, "  {:<16} {}", key, other)?,
            }
        }
        if let Some(reading) = self.sensor_history.first() {
            writeln!(
                f,
                "soil    {} {}{} @ {}",
                reading
                    .soil_moisture
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                reading.soil_status.as_deref().unwrap_or("-"),
                if reading.simulated { " (simulated)" } else { "" },
                reading.timestamp
            )?;
        }
        writeln!(f, "ml api  {}", if self.ml_connected { "connected" } else { "offline" })?;
        if let Some(p) = &self.last_prediction {
            writeln!(
                f,
                "plant   {} / {} ({:.1}%){}",
                p.plant,
                p.disease,
                p.confidence * 100.0,
                if p.is_healthy { " healthy" } else { "" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::console;
    use crate::domain::command_log::CommandSource;
    use crate::services::transport::fake::FakeTransport;

    #[tokio::test]
    async fn view_reflects_dispatch_state() {
        let console = console(FakeTransport::timing_out(), "10.0.0.5");
        console
            .dispatcher
            .dispatch("forward", CommandSource::Button)
            .await;

        let view = get_dashboard_status(&console);

        assert_eq!(view.endpoints.len(), 3);
        assert_eq!(view.endpoints[0].endpoint, "10.0.0.5");
        // 传感器、水泵未配置时沿用电机板地址
        assert_eq!(view.endpoints[1].endpoint, "10.0.0.5");
        assert_eq!(view.last_command, "forward (button)");
        assert_eq!(view.command_log.len(), 1);
        let text = view.to_string();
        assert!(text.contains("[simulated]"), "{text}");
        assert!(text.contains("leftMotor"), "{text}");
    }
}
