// 键盘绑定：按键 -> 命令，抑制系统自动重复
use std::collections::{HashMap, HashSet};

const MOVEMENT_BINDINGS: [(&str, &str); 4] = [
    ("w", "forward"),
    ("a", "left"),
    ("s", "backward"),
    ("d", "right"),
];

pub const STOP_COMMAND: &str = "stop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPreset {
    Drive,
    Irrigation,
}

impl From<String> for KeyPreset {
    fn from(s: String) -> Self {
        match s.as_str() {
            "irrigation" => KeyPreset::Irrigation,
            _ => KeyPreset::Drive,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyBindings {
    commands: HashMap<String, String>,
    movement: HashSet<String>,
}

impl KeyBindings {
    pub fn preset(preset: KeyPreset) -> Self {
        let mut bindings = Self::movement_only();
        match preset {
            KeyPreset::Drive => {
                bindings.bind_trigger(" ", "ping");
            }
            KeyPreset::Irrigation => {
                bindings.bind_trigger(" ", "start_sensor");
                bindings.bind_trigger("r", "read_soil");
                bindings.bind_trigger("q", "servo_up");
                bindings.bind_trigger("e", "servo_down");
                bindings.bind_trigger("p", "pump_start");
                bindings.bind_trigger("o", "pump_stop");
            }
        }
        bindings
    }

    fn movement_only() -> Self {
        let mut bindings = Self {
            commands: HashMap::new(),
            movement: HashSet::new(),
        };
        for (key, command) in MOVEMENT_BINDINGS {
            bindings.commands.insert(key.to_string(), command.to_string());
            bindings.movement.insert(key.to_string());
        }
        bindings
    }

    /// 只在按下时触发，松开不发送任何命令
    pub fn bind_trigger(&mut self, key: &str, command: &str) {
        let key = normalize(key);
        self.movement.remove(&key);
        self.commands.insert(key, command.to_string());
    }

    pub fn command_for(&self, key: &str) -> Option<&str> {
        self.commands.get(&normalize(key)).map(String::as_str)
    }

    pub fn is_movement(&self, key: &str) -> bool {
        self.movement.contains(&normalize(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.commands.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }
}

fn normalize(key: &str) -> String {
    if key == " " {
        return key.to_string();
    }
    match key.trim().to_lowercase().as_str() {
        "space" | "spacebar" => " ".to_string(),
        other => other.to_string(),
    }
}

/// 记录按住的键；返回值是应该以 keyboard 来源分发的命令
#[derive(Debug)]
pub struct KeyboardController {
    bindings: KeyBindings,
    held: HashSet<String>,
    installed: bool,
    gated: bool,
}

impl KeyboardController {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            installed: false,
            gated: false,
        }
    }

    pub fn install(&mut self) {
        self.installed = true;
    }

    pub fn teardown(&mut self) {
        self.installed = false;
        self.held.clear();
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// 自动模式下关闭整层
    pub fn set_gated(&mut self, gated: bool) {
        self.gated = gated;
        if gated {
            self.held.clear();
        }
    }

    pub fn is_gated(&self) -> bool {
        self.gated
    }

    fn accepting(&self) -> bool {
        self.installed && !self.gated
    }

    pub fn key_down(&mut self, key: &str) -> Option<String> {
        if !self.accepting() {
            return None;
        }
        let key = normalize(key);
        if !self.held.insert(key.clone()) {
            return None;
        }
        self.bindings.command_for(&key).map(str::to_string)
    }

    pub fn key_up(&mut self, key: &str) -> Option<String> {
        if !self.accepting() {
            return None;
        }
        let key = normalize(key);
        self.held.remove(&key);
        if self.bindings.is_movement(&key) {
            Some(STOP_COMMAND.to_string())
        } else {
            None
        }
    }

    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.held.iter().map(String::as_str)
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(preset: KeyPreset) -> KeyboardController {
        let mut controller = KeyboardController::new(KeyBindings::preset(preset));
        controller.install();
        controller
    }

    #[test]
    fn auto_repeat_is_ignored_and_release_stops() {
        let mut keys = controller(KeyPreset::Drive);

        assert_eq!(keys.key_down("w").as_deref(), Some("forward"));
        assert_eq!(keys.key_down("w"), None);
        assert_eq!(keys.key_down("W"), None);
        assert_eq!(keys.key_up("w").as_deref(), Some("stop"));
        assert_eq!(keys.key_down("w").as_deref(), Some("forward"));
    }

    #[test]
    fn trigger_keys_fire_on_press_only() {
        let mut keys = controller(KeyPreset::Irrigation);

        assert_eq!(keys.key_down("space").as_deref(), Some("start_sensor"));
        assert_eq!(keys.key_up(" "), None);
        assert_eq!(keys.key_down("p").as_deref(), Some("pump_start"));
        assert_eq!(keys.key_up("p"), None);
    }

    #[test]
    fn unmapped_keys_produce_nothing() {
        let mut keys = controller(KeyPreset::Drive);
        assert_eq!(keys.key_down("x"), None);
        assert_eq!(keys.key_up("x"), None);
    }

    #[test]
    fn gate_blocks_all_events() {
        let mut keys = controller(KeyPreset::Drive);
        keys.key_down("a");
        keys.set_gated(true);

        assert_eq!(keys.key_down("d"), None);
        assert_eq!(keys.key_up("a"), None);

        keys.set_gated(false);
        assert_eq!(keys.key_down("a").as_deref(), Some("left"));
    }

    #[test]
    fn teardown_releases_everything() {
        let mut keys = controller(KeyPreset::Drive);
        keys.key_down("s");
        keys.teardown();

        assert_eq!(keys.held_keys().count(), 0);
        assert_eq!(keys.key_down("s"), None);
        keys.install();
        assert_eq!(keys.key_down("s").as_deref(), Some("backward"));
    }
}
