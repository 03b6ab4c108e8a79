// 设置命令：修改、保存、重新加载
use crate::commands::Console;
use crate::domain::device::DeviceRole;
use crate::domain::settings::DashboardSettings;
use crate::domain::state::lock_state;
use crate::services::transport::DeviceTransport;
use log::info;

pub fn get_settings<T: DeviceTransport>(console: &Console<T>) -> DashboardSettings {
    console.settings()
}

/// 只修改内存中的设置，保存需显式调用 `save_settings`
pub fn update_setting<T: DeviceTransport>(
    console: &mut Console<T>,
    field: &str,
    value: &str,
) -> Result<(), String> {
    let value = value.trim().to_string();
    let mut state = lock_state(console.state());
    let settings = &mut state.settings;
    match field {
        "motor" | "esp" => settings.set_endpoint(DeviceRole::Motor, value),
        "sensor" => settings.set_endpoint(DeviceRole::Sensor, value),
        "pump" => settings.set_endpoint(DeviceRole::Pump, value),
        "camera" => settings.camera_host = value,
        "camera-port" | "camera_port" => {
            if value.parse::<u16>().is_err() {
                return Err(format!("Invalid camera port: {}", value));
            }
            settings.camera_port = value;
        }
        "ml" | "ml-api" | "ml_api" => settings.ml_api_url = value,
        other => return Err(format!("Unknown setting: {}", other)),
    }
    Ok(())
}

pub fn save_settings<T: DeviceTransport>(console: &mut Console<T>) -> Result<(), String> {
    let settings = console.settings();
    let store = console
        .store
        .as_mut()
        .ok_or_else(|| "No settings store configured".to_string())?;
    store
        .save(&settings)
        .map_err(|e| format!("Failed to save settings: {:#}", e))?;
    info!("settings saved: {:?}", settings);
    Ok(())
}

pub fn load_settings<T: DeviceTransport>(
    console: &mut Console<T>,
) -> Result<DashboardSettings, String> {
    let store = console
        .store
        .as_ref()
        .ok_or_else(|| "No settings store configured".to_string())?;
    let settings = store
        .load()
        .map_err(|e| format!("Failed to load settings: {:#}", e))?;
    lock_state(console.state()).settings = settings.clone();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::console;
    use crate::services::settings_store::SettingsStore;
    use crate::services::transport::fake::FakeTransport;

    #[test]
    fn update_validates_fields() {
        let mut console = console(FakeTransport::timing_out(), "");

        update_setting(&mut console, "sensor", " 10.0.0.6 ").unwrap();
        update_setting(&mut console, "camera-port", "8081").unwrap();
        assert!(update_setting(&mut console, "camera-port", "eighty").is_err());
        assert!(update_setting(&mut console, "colour", "green").is_err());

        let settings = get_settings(&console);
        assert_eq!(settings.sensor_endpoint, "10.0.0.6");
        assert_eq!(settings.camera_port, "8081");
    }

    #[test]
    fn save_requires_a_store() {
        let mut console = console(FakeTransport::timing_out(), "");
        assert!(save_settings(&mut console).is_err());
    }

    #[test]
    fn saved_settings_reload() {
        let path = std::env::temp_dir().join(format!(
            "farmbot-settings-cmd-{}-{}.db",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut console = console(FakeTransport::timing_out(), "10.0.0.5");
        console.store = Some(SettingsStore::new(Some(path.clone())).unwrap());

        update_setting(&mut console, "ml", "http://ml.local:5000").unwrap();
        save_settings(&mut console).unwrap();
        update_setting(&mut console, "motor", "").unwrap();

        let reloaded = load_settings(&mut console).unwrap();
        assert_eq!(reloaded.motor_endpoint, "10.0.0.5");
        assert_eq!(reloaded.ml_api_url, "http://ml.local:5000");
        let _ = std::fs::remove_file(path);
    }
}
