// 传感器不可达时的模拟读数
use crate::domain::state::SensorReading;
use crate::domain::status::StatusSnapshot;
use chrono::Local;
use rand::Rng;
use serde_json::Value;
use std::ops::Range;

// 电容式传感器：读数越大越干
const DRY_THRESHOLD: i64 = 2500;

pub struct SensorSimulator {
    moisture_range: Range<i64>,
}

impl SensorSimulator {
    pub fn new() -> Self {
        Self {
            moisture_range: 2000..3000,
        }
    }

    #[cfg(test)]
    pub fn with_range(moisture_range: Range<i64>) -> Self {
        Self { moisture_range }
    }

    pub fn reading<R: Rng>(&self, rng: &mut R) -> SensorReading {
        let moisture = if self.moisture_range.is_empty() {
            self.moisture_range.start
        } else {
            rng.gen_range(self.moisture_range.clone())
        };
        SensorReading {
            soil_moisture: Some(moisture),
            soil_status: Some(classify_moisture(moisture).to_string()),
            servo_position: None,
            message: "Sensor check completed (simulated)".to_string(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            simulated: true,
        }
    }
}

impl Default for SensorSimulator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn classify_moisture(value: i64) -> &'static str {
    if value >= DRY_THRESHOLD {
        "DRY"
    } else {
        "MOIST"
    }
}

/// 设备应答后的读数取自合并后的快照
pub fn reading_from_snapshot(snapshot: &StatusSnapshot) -> SensorReading {
    let text = |field: &str| snapshot.get(field).and_then(Value::as_str).map(String::from);
    let moisture = snapshot.get("soilMoisture").and_then(Value::as_i64);
    SensorReading {
        soil_moisture: moisture,
        soil_status: text("soilStatus").or_else(|| moisture.map(|m| classify_moisture(m).to_string())),
        servo_position: text("servoPosition"),
        message: text("message").unwrap_or_else(|| "Sensor check completed".to_string()),
        timestamp: Local::now().format("%H:%M:%S").to_string(),
        simulated: false,
    }
}
