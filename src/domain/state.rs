// 控制台运行时状态
use crate::domain::analysis::PredictionResult;
use crate::domain::command_log::CommandLog;
use crate::domain::device::{DeviceRole, WorkMode};
use crate::domain::settings::DashboardSettings;
use crate::domain::status::StatusSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

pub const SENSOR_HISTORY_CAPACITY: usize = 5;
pub const ANALYSIS_HISTORY_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Connectivity {
    Live,
    #[default]
    Simulated,
}

impl Connectivity {
    pub fn is_live(&self) -> bool {
        matches!(self, Connectivity::Live)
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Connectivity::Live => "live",
            Connectivity::Simulated => "simulated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    pub soil_moisture: Option<i64>,
    pub soil_status: Option<String>,
    pub servo_position: Option<String>,
    pub message: String,
    pub timestamp: String,
    pub simulated: bool,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub settings: DashboardSettings,
    pub snapshot: StatusSnapshot,
    pub connectivity: HashMap<DeviceRole, Connectivity>,
    pub command_log: CommandLog,
    pub last_command: String,
    pub mode: WorkMode,
    /// 状态轮询开关（自动模式下打开）
    pub watch: bool,
    pub auto_mode_status: String,
    pub sensor_history: VecDeque<SensorReading>,
    pub ml_connected: bool,
    pub last_prediction: Option<PredictionResult>,
    pub analysis_history: VecDeque<PredictionResult>,
}

impl DashboardState {
    pub fn new(settings: DashboardSettings) -> Self {
        Self {
            settings,
            snapshot: StatusSnapshot::new(),
            connectivity: HashMap::new(),
            command_log: CommandLog::new(),
            last_command: String::new(),
            mode: WorkMode::Manual,
            watch: false,
            auto_mode_status: "Stopped".to_string(),
            sensor_history: VecDeque::with_capacity(SENSOR_HISTORY_CAPACITY),
            ml_connected: false,
            last_prediction: None,
            analysis_history: VecDeque::with_capacity(ANALYSIS_HISTORY_CAPACITY),
        }
    }

    pub fn connectivity(&self, role: DeviceRole) -> Connectivity {
        self.connectivity.get(&role).copied().unwrap_or_default()
    }

    pub fn set_connectivity(&mut self, role: DeviceRole, value: Connectivity) {
        self.connectivity.insert(role, value);
    }

    /// 最新的在前
    pub fn push_sensor_reading(&mut self, reading: SensorReading) {
        self.sensor_history.push_front(reading);
        self.sensor_history.truncate(SENSOR_HISTORY_CAPACITY);
    }

    pub fn push_prediction(&mut self, prediction: PredictionResult) {
        self.last_prediction = Some(prediction.clone());
        self.analysis_history.push_front(prediction);
        self.analysis_history.truncate(ANALYSIS_HISTORY_CAPACITY);
    }

    /// 轮询条件：观察开关打开且电机板在线
    pub fn should_poll(&self) -> bool {
        self.watch && self.connectivity(DeviceRole::Motor).is_live()
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DashboardSettings::default())
    }
}

pub type SharedState = Arc<Mutex<DashboardState>>;

pub fn shared(state: DashboardState) -> SharedState {
    Arc::new(Mutex::new(state))
}

/// 锁中毒时继续使用内部数据，控制台不因单个任务 panic 而停摆
pub fn lock_state(state: &SharedState) -> MutexGuard<'_, DashboardState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(n: i64) -> SensorReading {
        SensorReading {
            soil_moisture: Some(n),
            soil_status: None,
            servo_position: None,
            message: String::new(),
            timestamp: String::new(),
            simulated: true,
        }
    }

    #[test]
    fn connectivity_defaults_to_simulated() {
        let state = DashboardState::default();
        for role in DeviceRole::ALL {
            assert_eq!(state.connectivity(role), Connectivity::Simulated);
        }
        assert!(!state.should_poll());
    }

    #[test]
    fn sensor_history_keeps_newest_five() {
        let mut state = DashboardState::default();
        for n in 0..8 {
            state.push_sensor_reading(reading(n));
        }
        let values: Vec<_> = state.sensor_history.iter().filter_map(|r| r.soil_moisture).collect();
        assert_eq!(values, vec![7, 6, 5, 4, 3]);
    }
}
