// 设备状态快照与离线回退状态
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const LEFT_MOTOR: &str = "leftMotor";
pub const RIGHT_MOTOR: &str = "rightMotor";
pub const MODE: &str = "mode";

const ACTIVE: &str = "active";
const INACTIVE: &str = "inactive";

/// 最近一次设备上报的状态。
///
/// 每次响应都按字段合并：响应中没有的字段保持原值。并发的命令之间没有序号，
/// 后到达的响应覆盖先到达的（last writer wins），包括晚于 `stop` 返回的 `forward`。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StatusSnapshot {
    fields: Map<String, Value>,
}

impl StatusSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, update: &Map<String, Value>) {
        for (key, value) in update {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// 命令 -> (左电机, 右电机)
const MOTOR_TABLE: &[(&str, &str, &str)] = &[
    ("forward", ACTIVE, ACTIVE),
    ("left", ACTIVE, INACTIVE),
    ("right", INACTIVE, ACTIVE),
];

/// 设备不可达时用于展示的状态，只由命令名决定
pub fn fallback_status(command: &str) -> Map<String, Value> {
    let (left, right) = MOTOR_TABLE
        .iter()
        .find(|(name, _, _)| *name == command)
        .map(|(_, l, r)| (*l, *r))
        .unwrap_or((INACTIVE, INACTIVE));

    let mut fields = Map::new();
    fields.insert(LEFT_MOTOR.to_string(), Value::from(left));
    fields.insert(RIGHT_MOTOR.to_string(), Value::from(right));
    if command == "automatic" || command == "manual" {
        fields.insert(MODE.to_string(), Value::from(command));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut snapshot = StatusSnapshot::new();
        snapshot.merge(&as_map(json!({"leftMotor": "active", "soilMoisture": 2100})));
        snapshot.merge(&as_map(json!({"leftMotor": "inactive", "mode": "manual"})));

        assert_eq!(snapshot.get_str(LEFT_MOTOR), Some("inactive"));
        assert_eq!(snapshot.get("soilMoisture"), Some(&json!(2100)));
        assert_eq!(snapshot.get_str(MODE), Some("manual"));
    }

    #[test]
    fn fallback_table() {
        let cases = [
            ("forward", "active", "active"),
            ("left", "active", "inactive"),
            ("right", "inactive", "active"),
            ("backward", "inactive", "inactive"),
            ("stop", "inactive", "inactive"),
            ("pump_start", "inactive", "inactive"),
        ];
        for (command, left, right) in cases {
            let fields = fallback_status(command);
            assert_eq!(fields[LEFT_MOTOR], json!(left), "{command}");
            assert_eq!(fields[RIGHT_MOTOR], json!(right), "{command}");
            assert!(!fields.contains_key(MODE), "{command}");
        }
    }

    #[test]
    fn fallback_sets_mode_for_mode_commands() {
        assert_eq!(fallback_status("automatic")[MODE], json!("automatic"));
        assert_eq!(fallback_status("manual")[MODE], json!("manual"));
    }
}
