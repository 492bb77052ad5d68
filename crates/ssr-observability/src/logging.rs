//! Request-correlated log lines.
//!
//! One logger is created per request. Serverless hosts capture stderr into the
//! function log, so every line goes there, tagged with the request id shown on
//! the diagnostic page.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssr_core::RequestId;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// How lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// `[ssr:<host>] LEVEL message path key=value ...`
    Human,
}

/// A single line, as serialized in JSON mode.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Microseconds since the logger was created.
    pub elapsed_us: u64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl LogRecord {
    fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Json => {
                serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
            }
            LogFormat::Human => self.render_human(),
        }
    }

    fn render_human(&self) -> String {
        let mut line = format!(
            "[ssr:{}] {:<5} {}",
            self.host.as_deref().unwrap_or("-"),
            self.level,
            self.message
        );
        if let Some(path) = &self.path {
            line.push(' ');
            line.push_str(path);
        }
        for (key, value) in &self.fields {
            match value {
                Value::String(s) => line.push_str(&format!(" {}={:?}", key, s)),
                other => line.push_str(&format!(" {}={}", key, other)),
            }
        }
        line.push_str(&format!(" rid={}", self.request_id));
        line
    }
}

/// Per-request logger.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: RequestId,
    host: Option<String>,
    path: Option<String>,
    started: Instant,
    min_level: LogLevel,
    format: LogFormat,
}

impl StructuredLogger {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            host: None,
            path: None,
            started: Instant::now(),
            min_level: LogLevel::Info,
            format: LogFormat::Json,
        }
    }

    /// Name of the host adapter handling the request.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Path being rendered.
    pub fn with_route(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Start a line with structured fields; nothing is written until `emit`.
    pub fn event(&self, level: LogLevel, message: impl Into<String>) -> LogEvent<'_> {
        LogEvent {
            logger: self,
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn debug(&self, message: &str) {
        self.event(LogLevel::Debug, message).emit();
    }

    pub fn info(&self, message: &str) {
        self.event(LogLevel::Info, message).emit();
    }

    /// The line that would be written, or `None` below the minimum level.
    pub fn format_line(
        &self,
        level: LogLevel,
        message: &str,
        fields: BTreeMap<String, Value>,
    ) -> Option<String> {
        if level < self.min_level {
            return None;
        }
        let record = LogRecord {
            level,
            message: message.to_string(),
            request_id: self.request_id.to_string(),
            host: self.host.clone(),
            path: self.path.clone(),
            elapsed_us: self.started.elapsed().as_micros() as u64,
            fields,
        };
        Some(record.render(self.format))
    }
}

/// A pending line. Fields are kept sorted so human output is stable.
#[must_use = "a log event does nothing until emitted"]
pub struct LogEvent<'a> {
    logger: &'a StructuredLogger,
    level: LogLevel,
    message: String,
    fields: BTreeMap<String, Value>,
}

impl LogEvent<'_> {
    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.into()));
        self
    }

    pub fn field_i64(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    pub fn emit(self) {
        if let Some(line) = self.logger.format_line(self.level, &self.message, self.fields) {
            eprintln!("{}", line);
        }
    }
}
