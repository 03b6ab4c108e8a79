// 命令日志（仅用于展示，不持久化）
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

pub const COMMAND_LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandSource {
    Button,
    Keyboard,
    System,
    ConnectionTest,
}

impl CommandSource {
    pub fn label(&self) -> &'static str {
        match self {
            CommandSource::Button => "button",
            CommandSource::Keyboard => "keyboard",
            CommandSource::System => "system",
            CommandSource::ConnectionTest => "connection test",
        }
    }
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub timestamp: DateTime<Local>,
    pub source: CommandSource,
    pub command: String,
}

impl fmt::Display for CommandLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.source,
            self.command
        )
    }
}

#[derive(Debug, Clone)]
pub struct CommandLog {
    entries: VecDeque<CommandLogEntry>,
    capacity: usize,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, command: &str, source: CommandSource) -> &CommandLogEntry {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(CommandLogEntry {
            timestamp: Local::now(),
            source,
            command: command.to_string(),
        });
        // 刚插入，末尾索引有效
        &self.entries[self.entries.len() - 1]
    }

    /// 按插入顺序，最旧的在前
    pub fn entries(&self) -> impl Iterator<Item = &CommandLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_capped_and_ordered() {
        let mut log = CommandLog::new();
        for i in 0..25 {
            log.push(&format!("cmd{i}"), CommandSource::Button);
        }
        assert_eq!(log.len(), COMMAND_LOG_CAPACITY);
        let commands: Vec<_> = log.entries().map(|e| e.command.clone()).collect();
        let expected: Vec<_> = (15..25).map(|i| format!("cmd{i}")).collect();
        assert_eq!(commands, expected);
    }

    #[test]
    fn entry_renders_source_and_command() {
        let mut log = CommandLog::with_capacity(2);
        let line = log.push("forward", CommandSource::Keyboard).to_string();
        assert!(line.ends_with("] keyboard: forward"), "{line}");
    }
}
