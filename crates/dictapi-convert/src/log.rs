//! Diagnostic log entries attached to successful conversions.

use serde::Serialize;
use strum::{AsRefStr, Display};

/// Severity of a [`LogEntry`], serialised in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

/// A non-fatal data-quality message produced while parsing or serialising.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::new(Level::Notice, message)
    }
}

/// A converter result together with the diagnostics gathered producing it.
#[derive(Debug, Clone)]
pub struct Logged<T> {
    pub value: T,
    pub logs: Vec<LogEntry>,
}

impl<T> Logged<T> {
    pub fn new(value: T, logs: Vec<LogEntry>) -> Self {
        Self { value, logs }
    }
}
