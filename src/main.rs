// FarmBot 远程操作控制台入口
mod commands;
mod domain;
mod services;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use commands::console::{execute_line, ConsoleReply, HELP};
use commands::{control, monitoring, settings, surveillance, Console};
use domain::command_log::CommandSource;
use services::classifier::Frame;
use services::keyboard::KeyPreset;
use services::settings_store::SettingsStore;
use services::transport::HttpTransport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::Duration;

#[derive(Parser)]
#[command(name = "farmbot-console")]
#[command(about = "Remote operator console for an ESP32 FarmBot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings database file
    #[arg(long, env = "FARMBOT_DB")]
    db: Option<PathBuf>,

    /// Command request timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Keyboard layout: drive | irrigation
    #[arg(long, default_value = "drive")]
    preset: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single command to its controller
    Send { command: String },
    /// Check the motor controller and print the dashboard
    Status,
    /// Update and persist connection settings
    Config {
        #[arg(long)]
        motor: Option<String>,
        #[arg(long)]
        sensor: Option<String>,
        #[arg(long)]
        pump: Option<String>,
        #[arg(long)]
        camera: Option<String>,
        #[arg(long)]
        camera_port: Option<String>,
        #[arg(long)]
        ml_api: Option<String>,
    },
    /// Classify a captured JPEG frame
    Analyze { image: PathBuf },
    /// Interactive console (default)
    Console,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let store = SettingsStore::new(cli.db.clone()).context("Failed to open settings database")?;
    let loaded = store.load().context("Failed to load settings")?;
    let transport = Arc::new(HttpTransport::new().context("Failed to build HTTP client")?);
    let mut console = Console::new(
        transport,
        loaded,
        Some(store),
        KeyPreset::from(cli.preset.to_lowercase()),
        Duration::from_millis(cli.timeout_ms),
    );

    let result = match cli.command.unwrap_or(Commands::Console) {
        Commands::Send { command } => {
            control::send_command(&mut console, &command, CommandSource::Button)
                .await
                .map(|outcome| println!("{} -> {:?}", command, outcome))
                .map_err(|e| anyhow!(e))
        }
        Commands::Status => {
            let _ = control::check_connection(&mut console).await;
            print!("{}", monitoring::get_dashboard_status(&console));
            Ok(())
        }
        Commands::Config {
            motor,
            sensor,
            pump,
            camera,
            camera_port,
            ml_api,
        } => configure(
            &mut console,
            [
                ("motor", motor),
                ("sensor", sensor),
                ("pump", pump),
                ("camera", camera),
                ("camera-port", camera_port),
                ("ml", ml_api),
            ],
        ),
        Commands::Analyze { image } => analyze(&mut console, &image).await,
        Commands::Console => run_console(&mut console).await,
    };

    console.shutdown();
    result
}

fn configure(
    console: &mut Console<HttpTransport>,
    fields: [(&str, Option<String>); 6],
) -> Result<()> {
    for (field, value) in fields {
        if let Some(value) = value {
            settings::update_setting(console, field, &value).map_err(|e| anyhow!(e))?;
        }
    }
    settings::save_settings(console).map_err(|e| anyhow!(e))?;
    println!("{:#?}", settings::get_settings(console));
    Ok(())
}

async fn analyze(console: &mut Console<HttpTransport>, image: &Path) -> Result<()> {
    let jpeg = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    if !surveillance::test_ml_connection(console).await {
        return Err(anyhow!("ML API is offline"));
    }
    let frame = Frame::from_jpeg(image.display().to_string(), jpeg);
    let prediction = surveillance::analyze_frame(console, &frame)
        .await
        .map_err(|e| anyhow!(e))?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

async fn run_console(console: &mut Console<HttpTransport>) -> Result<()> {
    println!("{}", HELP);
    // 启动时探测一次，决定是否开启状态轮询
    if let Ok(connectivity) = control::check_connection(console).await {
        println!("motor controller {}", connectivity.badge());
    }
    console.poller.sync();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"farmbot> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match execute_line(console, &line).await {
            Ok(ConsoleReply::Quit) => break,
            Ok(ConsoleReply::Output(text)) if text.is_empty() => {}
            Ok(ConsoleReply::Output(text)) => println!("{}", text.trim_end()),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
