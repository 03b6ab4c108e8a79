// 交互式控制台：解析一行输入并执行对应命令
use crate::commands::{control, monitoring, settings, surveillance, Console};
use crate::domain::command_log::CommandSource;
use crate::domain::state::lock_state;
use crate::services::classifier::Frame;
use crate::services::dispatcher::DispatchOutcome;
use crate::services::transport::DeviceTransport;
use std::fmt::Write as _;
use tokio::task::JoinHandle;

pub const HELP: &str = "\
commands:
  send <command>        send a command to its controller (button source)
  down <key> / up <key> keyboard press / release
  tap <key>             press and release
  auto                  toggle automatic mode
  sensors               run a soil sensor check
  connect               check the motor controller status endpoint
  ping                  connection test
  set <field> <value>   motor | sensor | pump | camera | camera-port | ml
  save / load           persist / reload settings
  settings              show current settings
  camera                pick a working camera feed
  ml                    test the plant classifier API
  analyze <file.jpg>    classify a captured frame
  status / log / keys   show dashboard, command log, key bindings
  quit";

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleReply {
    Output(String),
    Quit,
}

async fn settle(handle: Option<JoinHandle<DispatchOutcome>>) -> Result<String, String> {
    match handle {
        Some(handle) => handle
            .await
            .map(|outcome| format!("{:?}", outcome))
            .map_err(|e| format!("Dispatch task failed: {}", e)),
        None => Ok("ignored".to_string()),
    }
}

pub async fn execute_line<T: DeviceTransport>(
    console: &mut Console<T>,
    line: &str,
) -> Result<ConsoleReply, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(ConsoleReply::Output(String::new()));
    };
    let arg = parts.next();
    let rest = parts.collect::<Vec<_>>().join(" ");

    let output = match (verb.to_lowercase().as_str(), arg) {
        ("help" | "?", _) => HELP.to_string(),
        ("quit" | "exit", _) => return Ok(ConsoleReply::Quit),
        ("send", Some(command)) => {
            let outcome = control::send_command(console, command, CommandSource::Button).await?;
            format!("{} -> {:?}", command, outcome)
        }
        ("down", Some(key)) => settle(control::key_down(console, key)).await?,
        ("up", Some(key)) => settle(control::key_up(console, key)).await?,
        ("tap", Some(key)) => {
            // 两个任务同时在途，完成顺序不保证
            let press = control::key_down(console, key);
            let release = control::key_up(console, key);
            let pressed = settle(press).await?;
            let released = settle(release).await?;
            format!("{} / {}", pressed, released)
        }
        ("auto", _) => {
            let mode = control::toggle_automatic_mode(console).await?;
            format!("{:?} - {}", mode, lock_state(console.state()).auto_mode_status)
        }
        ("sensors", _) => {
            let reading = control::check_sensors(console).await?;
            format!(
                "moisture {} {}{}",
                reading
                    .soil_moisture
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                reading.soil_status.as_deref().unwrap_or("-"),
                if reading.simulated { " (simulated)" } else { "" }
            )
        }
        ("connect", _) => {
            let connectivity = control::check_connection(console).await?;
            format!("motor controller {}", connectivity.badge())
        }
        ("ping", _) => format!("{:?}", control::test_connection(console).await?),
        ("set", Some(field)) => {
            settings::update_setting(console, field, &rest)?;
            format!("{} = {}", field, rest)
        }
        ("save", _) => {
            settings::save_settings(console)?;
            "settings saved".to_string()
        }
        ("load", _) => format!("{:#?}", settings::load_settings(console)?),
        ("settings", _) => format!("{:#?}", settings::get_settings(console)),
        ("camera", _) => surveillance::select_camera_feed(console).await,
        ("ml", _) => {
            if surveillance::test_ml_connection(console).await {
                "ML API connected".to_string()
            } else {
                "ML API offline".to_string()
            }
        }
        ("analyze", Some(path)) => {
            let jpeg = tokio::fs::read(path)
                .await
                .map_err(|e| format!("Failed to read {}: {}", path, e))?;
            let prediction =
                surveillance::analyze_frame(console, &Frame::from_jpeg(path, jpeg)).await?;
            format!(
                "{} / {} ({:.1}%, {})",
                prediction.plant,
                prediction.disease,
                prediction.confidence * 100.0,
                if prediction.is_healthy { "healthy" } else { "diseased" }
            )
        }
        ("status", _) => monitoring::get_dashboard_status(console).to_string(),
        ("log", _) => {
            let state = lock_state(console.state());
            let mut out = String::new();
            for entry in state.command_log.entries() {
                let _ = writeln!(out, "{}", entry);
            }
            out
        }
        ("keys", _) => {
            let mut bindings: Vec<_> = console.keyboard.bindings().iter().collect();
            bindings.sort();
            let keyboard = &console.keyboard;
            let mut out = if !keyboard.is_installed() {
                "keyboard layer not installed\n".to_string()
            } else if keyboard.is_gated() {
                "keyboard disabled in automatic mode\n".to_string()
            } else {
                String::new()
            };
            let mut held: Vec<_> = keyboard.held_keys().collect();
            if !held.is_empty() {
                held.sort();
                let _ = writeln!(out, "held: {}", held.join(" "));
            }
            for (key, command) in bindings {
                let key = if key == " " { "space" } else { key };
                let _ = writeln!(out, "{:<6} {}", key, command);
            }
            out
        }
        (other, _) => return Err(format!("Unknown console command '{}', try 'help'", other)),
    };
    console.poller.sync();
    Ok(ConsoleReply::Output(output))
}
