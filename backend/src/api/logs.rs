//! Activity log for imports and exports, streamed over Server-Sent Events.
//!
//! Every entry is echoed to stdout and broadcast to connected clients. The
//! last [`HISTORY_LEN`] entries are retained so a client that connects late
//! still sees what happened to the current file.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Entries kept for replay.
pub const HISTORY_LEN: usize = 50;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn marker(&self) -> &'static str {
        match self {
            LogLevel::Info => " ",
            LogLevel::Success => "✓",
            LogLevel::Warning => "!",
            LogLevel::Error => "✗",
        }
    }
}

/// One line of activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for grouped messages (e.g. per-row details).
    #[serde(default)]
    pub indent: u8,
    pub timestamp: DateTime<Local>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            timestamp: Local::now(),
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Global activity log.
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans entries out to stdout, SSE subscribers and the replay buffer.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
    history: Mutex<VecDeque<LogEntry>>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    pub fn log(&self, entry: LogEntry) {
        let indent = "  ".repeat(entry.indent as usize);
        println!(
            "[{}] {} {}{}",
            entry.timestamp.format("%H:%M:%S"),
            entry.level.marker(),
            indent,
            entry.message
        );

        if let Ok(mut history) = self.history.lock() {
            if history.len() == HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(entry.clone());
        }

        // No receivers is not an error
        let _ = self.sender.send(entry);
    }

    /// Live receiver for SSE streaming.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    /// Retained entries, oldest first.
    pub fn recent(&self) -> Vec<LogEntry> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let broadcaster = LogBroadcaster::new();
        for i in 0..HISTORY_LEN + 5 {
            broadcaster.log(LogEntry::new(LogLevel::Info, format!("entry {i}")));
        }

        let recent = broadcaster.recent();
        assert_eq!(recent.len(), HISTORY_LEN);
        assert_eq!(recent[0].message, "entry 5");
    }

    #[test]
    fn test_subscribers_receive_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        broadcaster.log(LogEntry::new(LogLevel::Warning, "careful").with_indent(1));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.indent, 1);
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let json = serde_json::to_value(LogEntry::new(LogLevel::Success, "done")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "done");
        assert!(json["timestamp"].is_string());
    }
}
