// 运动/传感器/执行器控制命令
use crate::commands::Console;
use crate::domain::command_log::CommandSource;
use crate::domain::device::{DeviceRole, WorkMode};
use crate::domain::state::{lock_state, Connectivity, SensorReading};
use crate::services::dispatcher::{CommandDispatcher, DispatchOutcome, STATUS_TIMEOUT};
use crate::services::sensor_simulator::{reading_from_snapshot, SensorSimulator};
use crate::services::transport::DeviceTransport;
use log::info;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

const SENSOR_CHECK_COMMAND: &str = "start_sensor";

pub async fn send_command<T: DeviceTransport>(
    console: &mut Console<T>,
    command: &str,
    source: CommandSource,
) -> Result<DispatchOutcome, String> {
    let command = command.trim().trim_start_matches('/');
    if command.is_empty() {
        return Err("Command must not be empty".to_string());
    }
    let outcome = console.dispatcher.dispatch(command, source).await;
    console.poller.sync();
    Ok(outcome)
}

/// 按键按下：命令以独立任务发出，不等待设备应答
pub fn key_down<T: DeviceTransport>(
    console: &mut Console<T>,
    key: &str,
) -> Option<JoinHandle<DispatchOutcome>> {
    let command = console.keyboard.key_down(key)?;
    Some(spawn_key_command(&console.dispatcher, command))
}

pub fn key_up<T: DeviceTransport>(
    console: &mut Console<T>,
    key: &str,
) -> Option<JoinHandle<DispatchOutcome>> {
    let command = console.keyboard.key_up(key)?;
    Some(spawn_key_command(&console.dispatcher, command))
}

fn spawn_key_command<T: DeviceTransport>(
    dispatcher: &Arc<CommandDispatcher<T>>,
    command: String,
) -> JoinHandle<DispatchOutcome> {
    if command == SENSOR_CHECK_COMMAND {
        let dispatcher = Arc::clone(dispatcher);
        tokio::spawn(async move { sensor_check(&dispatcher, CommandSource::Keyboard).await.0 })
    } else {
        dispatcher.spawn_dispatch(command, CommandSource::Keyboard)
    }
}

/// 触发一次土壤检测；设备不可达时生成模拟读数。重复触发被抑制时没有读数
pub async fn sensor_check<T: DeviceTransport>(
    dispatcher: &CommandDispatcher<T>,
    source: CommandSource,
) -> (DispatchOutcome, Option<SensorReading>) {
    let outcome = dispatcher
        .dispatch_to(DeviceRole::Sensor, SENSOR_CHECK_COMMAND, source)
        .await;
    let mut state = lock_state(dispatcher.state());
    let reading = match outcome {
        DispatchOutcome::Suppressed => return (outcome, None),
        DispatchOutcome::Live => reading_from_snapshot(&state.snapshot),
        DispatchOutcome::Unconfigured | DispatchOutcome::Simulated => {
            SensorSimulator::new().reading(&mut rand::thread_rng())
        }
    };
    state.push_sensor_reading(reading.clone());
    (outcome, Some(reading))
}

pub async fn check_sensors<T: DeviceTransport>(
    console: &mut Console<T>,
) -> Result<SensorReading, String> {
    let (_, reading) = sensor_check(&console.dispatcher, CommandSource::Button).await;
    reading.ok_or_else(|| "Sensor check already in progress".to_string())
}

pub async fn toggle_automatic_mode<T: DeviceTransport>(
    console: &mut Console<T>,
) -> Result<WorkMode, String> {
    let mode = {
        let mut state = lock_state(console.state());
        let mode = state.mode.toggled();
        state.mode = mode;
        state.watch = mode == WorkMode::Automatic;
        let (banner, progress) = match mode {
            WorkMode::Automatic => ("AUTOMATIC MODE ENABLED", "Starting automatic mode..."),
            WorkMode::Manual => ("MANUAL MODE ENABLED", "Stopping automatic mode..."),
        };
        state.command_log.push(banner, CommandSource::System);
        state.auto_mode_status = progress.to_string();
        mode
    };
    console.keyboard.set_gated(mode == WorkMode::Automatic);

    let outcome = console
        .dispatcher
        .dispatch_to(DeviceRole::Motor, mode.command(), CommandSource::System)
        .await;

    {
        let mut state = lock_state(console.state());
        state.auto_mode_status = match (mode, outcome) {
            (WorkMode::Automatic, DispatchOutcome::Live) => {
                "Active - ESP32 controlling movement and sensors".to_string()
            }
            (WorkMode::Automatic, _) => "Simulated - No ESP32 connection".to_string(),
            (WorkMode::Manual, _) => "Stopped".to_string(),
        };
    }
    match mode {
        WorkMode::Automatic => info!("automatic mode enabled, manual controls disabled"),
        WorkMode::Manual => info!("manual mode enabled, keyboard controls available"),
    }
    console.poller.sync();
    Ok(mode)
}

/// 用户触发的连接检查，会直接改写电机板的连接状态
pub async fn check_connection<T: DeviceTransport>(
    console: &mut Console<T>,
) -> Result<Connectivity, String> {
    let endpoint = lock_state(console.state())
        .settings
        .endpoint_for(DeviceRole::Motor);
    let connectivity = if !endpoint.is_configured() {
        Connectivity::Simulated
    } else {
        match console.dispatcher.fetch_status(&endpoint, STATUS_TIMEOUT).await {
            Ok(fields) => match fields.get("status").and_then(Value::as_str) {
                Some("ok") | Some("success") => Connectivity::Live,
                _ => Connectivity::Simulated,
            },
            Err(e) => {
                info!("connection check to {} failed: {}", endpoint, e);
                Connectivity::Simulated
            }
        }
    };
    lock_state(console.state()).set_connectivity(DeviceRole::Motor, connectivity);
    console.poller.sync();
    Ok(connectivity)
}

pub async fn test_connection<T: DeviceTransport>(
    console: &mut Console<T>,
) -> Result<DispatchOutcome, String> {
    send_command(console, "ping", CommandSource::ConnectionTest).await
}
