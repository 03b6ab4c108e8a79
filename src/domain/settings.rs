// 控制台设置：设备地址、摄像头、病害识别服务
use crate::domain::device::{DeviceEndpoint, DeviceRole};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAMERA_PORT: &str = "8080";
pub const DEFAULT_ML_API_URL: &str = "http://localhost:5000";

// 持久化键名
pub const KEY_MOTOR_ENDPOINT: &str = "motorEspIP";
pub const KEY_SENSOR_ENDPOINT: &str = "sensorEspIP";
pub const KEY_PUMP_ENDPOINT: &str = "pumpEspIP";
pub const KEY_CAMERA_HOST: &str = "cameraIP";
pub const KEY_CAMERA_PORT: &str = "cameraPort";
pub const KEY_ML_API_URL: &str = "mlApiURL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardSettings {
    pub motor_endpoint: String,
    pub sensor_endpoint: String,
    pub pump_endpoint: String,
    pub camera_host: String,
    pub camera_port: String,
    pub ml_api_url: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            motor_endpoint: String::new(),
            sensor_endpoint: String::new(),
            pump_endpoint: String::new(),
            camera_host: String::new(),
            camera_port: DEFAULT_CAMERA_PORT.to_string(),
            ml_api_url: DEFAULT_ML_API_URL.to_string(),
        }
    }
}

impl DashboardSettings {
    pub fn raw_endpoint(&self, role: DeviceRole) -> &str {
        match role {
            DeviceRole::Motor => &self.motor_endpoint,
            DeviceRole::Sensor => &self.sensor_endpoint,
            DeviceRole::Pump => &self.pump_endpoint,
        }
    }

    /// 单板部署时传感器/水泵命令发往电机板
    pub fn endpoint_for(&self, role: DeviceRole) -> DeviceEndpoint {
        let own = DeviceEndpoint::parse(self.raw_endpoint(role));
        if own.is_configured() || role == DeviceRole::Motor {
            own
        } else {
            DeviceEndpoint::parse(&self.motor_endpoint)
        }
    }

    pub fn set_endpoint(&mut self, role: DeviceRole, value: impl Into<String>) {
        let value = value.into();
        match role {
            DeviceRole::Motor => self.motor_endpoint = value,
            DeviceRole::Sensor => self.sensor_endpoint = value,
            DeviceRole::Pump => self.pump_endpoint = value,
        }
    }

    /// 持久化用的键值对
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_MOTOR_ENDPOINT, self.motor_endpoint.clone()),
            (KEY_SENSOR_ENDPOINT, self.sensor_endpoint.clone()),
            (KEY_PUMP_ENDPOINT, self.pump_endpoint.clone()),
            (KEY_CAMERA_HOST, self.camera_host.clone()),
            (KEY_CAMERA_PORT, self.camera_port.clone()),
            (KEY_ML_API_URL, self.ml_api_url.clone()),
        ]
    }

    /// 只覆盖存储中存在且非空的键，其余保持默认
    pub fn apply_pair(&mut self, key: &str, value: String) {
        if value.is_empty() {
            return;
        }
        match key {
            KEY_MOTOR_ENDPOINT => self.motor_endpoint = value,
            KEY_SENSOR_ENDPOINT => self.sensor_endpoint = value,
            KEY_PUMP_ENDPOINT => self.pump_endpoint = value,
            KEY_CAMERA_HOST => self.camera_host = value,
            KEY_CAMERA_PORT => self.camera_port = value,
            KEY_ML_API_URL => self.ml_api_url = value,
            other => log::debug!("ignoring unknown settings key {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_falls_back_to_motor_endpoint() {
        let mut settings = DashboardSettings::default();
        settings.set_endpoint(DeviceRole::Motor, "10.0.0.5");
        assert_eq!(settings.endpoint_for(DeviceRole::Sensor).authority(), "10.0.0.5");

        settings.set_endpoint(DeviceRole::Sensor, "10.0.0.6:8081");
        assert_eq!(settings.endpoint_for(DeviceRole::Sensor).authority(), "10.0.0.6:8081");
    }

    #[test]
    fn empty_values_keep_defaults() {
        let mut settings = DashboardSettings::default();
        settings.apply_pair(KEY_CAMERA_PORT, String::new());
        settings.apply_pair(KEY_ML_API_URL, "http://ml:5000".to_string());
        assert_eq!(settings.camera_port, DEFAULT_CAMERA_PORT);
        assert_eq!(settings.ml_api_url, "http://ml:5000");
    }
}
