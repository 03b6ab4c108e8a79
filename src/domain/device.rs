// 设备端点、角色与工作模式
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeviceRole {
    Motor,  // 电机驱动板
    Sensor, // 土壤传感器 + 舵机
    Pump,   // 水泵
}

impl DeviceRole {
    pub const ALL: [DeviceRole; 3] = [DeviceRole::Motor, DeviceRole::Sensor, DeviceRole::Pump];

    /// 按命令词汇路由到设备角色；未知命令一律交给电机板，由设备自行拒绝
    pub fn for_command(command: &str) -> Self {
        match command {
            "start_sensor" | "read_soil" | "servo_up" | "servo_down" | "servo_start"
            | "servo_stop" | "init_servo" => DeviceRole::Sensor,
            "pump_start" | "pump_stop" | "stop_pump" => DeviceRole::Pump,
            _ => DeviceRole::Motor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceRole::Motor => "motor",
            DeviceRole::Sensor => "sensor",
            DeviceRole::Pump => "pump",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// 操作员填写的控制器地址，只要求非空
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: Option<String>,
}

impl DeviceEndpoint {
    pub fn new(host: impl Into<String>, port: Option<String>) -> Self {
        Self {
            host: host.into(),
            port: port.filter(|p| !p.trim().is_empty()),
        }
    }

    /// "10.0.0.5" / "10.0.0.5:81" / "http://10.0.0.5/"
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/');
        match trimmed.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                Self::new(host, Some(port.to_string()))
            }
            _ => Self::new(trimmed, None),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }

    pub fn authority(&self) -> String {
        match &self.port {
            Some(port) => format!("{}:{}", self.host.trim(), port),
            None => self.host.trim().to_string(),
        }
    }

    pub fn command_url(&self, command: &str) -> String {
        format!("http://{}/{}", self.authority(), command)
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WorkMode {
    #[default]
    Manual,    // 手动模式：键盘/按钮控制
    Automatic, // 自动模式：设备自行巡检
}

impl WorkMode {
    pub fn command(&self) -> &'static str {
        match self {
            WorkMode::Manual => "manual",
            WorkMode::Automatic => "automatic",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            WorkMode::Manual => WorkMode::Automatic,
            WorkMode::Automatic => WorkMode::Manual,
        }
    }
}

impl From<String> for WorkMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "automatic" | "auto" => WorkMode::Automatic,
            _ => WorkMode::Manual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_numeric_port() {
        let ep = DeviceEndpoint::parse("10.0.0.5:81");
        assert_eq!(ep.host, "10.0.0.5");
        assert_eq!(ep.port.as_deref(), Some("81"));
        assert_eq!(ep.command_url("forward"), "http://10.0.0.5:81/forward");
    }

    #[test]
    fn parse_keeps_bare_host() {
        let ep = DeviceEndpoint::parse("http://192.168.4.1/");
        assert_eq!(ep.host, "192.168.4.1");
        assert!(ep.port.is_none());
        assert_eq!(ep.command_url("stop"), "http://192.168.4.1/stop");
    }

    #[test]
    fn blank_endpoint_is_not_configured() {
        assert!(!DeviceEndpoint::parse("   ").is_configured());
        assert!(!DeviceEndpoint::default().is_configured());
    }

    #[test]
    fn commands_route_by_vocabulary() {
        assert_eq!(DeviceRole::for_command("forward"), DeviceRole::Motor);
        assert_eq!(DeviceRole::for_command("read_soil"), DeviceRole::Sensor);
        assert_eq!(DeviceRole::for_command("pump_stop"), DeviceRole::Pump);
        assert_eq!(DeviceRole::for_command("dance"), DeviceRole::Motor);
    }

    #[test]
    fn work_mode_from_string() {
        assert_eq!(WorkMode::from("automatic".to_string()), WorkMode::Automatic);
        assert_eq!(WorkMode::from("anything".to_string()), WorkMode::Manual);
        assert_eq!(WorkMode::Manual.toggled().command(), "automatic");
    }
}
