//! Status events delivered to the embedding UI.

use chrono::{DateTime, Local};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for MessageSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
    pub timestamp: DateTime<Local>,
}

impl StatusMessage {
    /// Timestamp the way the status panel has always shown it:
    /// day/month/year, 24-hour clock, second precision.
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format("%d/%m/%Y at %H:%M:%S").to_string()
    }
}

/// Stamps and fans out status events.
///
/// Events are pushed to the sink channel and kept as `last` for pull-style
/// callers. A dropped sink never fails an emit.
#[derive(Clone)]
pub struct StatusReporter {
    sink: mpsc::UnboundedSender<StatusMessage>,
    last: Arc<Mutex<Option<StatusMessage>>>,
}

impl StatusReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusMessage>) {
        let (sink, events) = mpsc::unbounded_channel();
        let reporter = Self {
            sink,
            last: Arc::new(Mutex::new(None)),
        };
        (reporter, events)
    }

    pub fn emit(&self, message: impl Into<String>, severity: MessageSeverity) {
        let event = StatusMessage {
            message: message.into(),
            severity,
            timestamp: Local::now(),
        };
        debug!(severity = %event.severity, message = %event.message, "status");
        if let Ok(mut last) = self.last.lock() {
            *last = Some(event.clone());
        }
        let _ = self.sink.send(event);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(message, MessageSeverity::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(message, MessageSeverity::Success);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(message, MessageSeverity::Warning);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(message, MessageSeverity::Error);
    }

    /// The most recent event, if any was emitted.
    pub fn last(&self) -> Option<StatusMessage> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_display_uses_day_first_24h_format() {
        let timestamp = Local.with_ymd_and_hms(2025, 1, 5, 9, 3, 7).unwrap();
        let event = StatusMessage {
            message: "x".to_string(),
            severity: MessageSeverity::Info,
            timestamp,
        };
        assert_eq!(event.timestamp_display(), "05/01/2025 at 09:03:07");
    }

    #[test]
    fn emit_forwards_and_remembers() {
        let (reporter, mut events) = StatusReporter::new();
        reporter.success("Configuration saved successfully!");

        let event = events.try_recv().unwrap();
        assert_eq!(event.severity, MessageSeverity::Success);
        assert_eq!(event.message, "Configuration saved successfully!");

        let last = reporter.last().unwrap();
        assert_eq!(last.message, event.message);
    }

    #[test]
    fn emit_survives_dropped_sink() {
        let (reporter, events) = StatusReporter::new();
        drop(events);
        reporter.warning("Device disconnected");
        assert_eq!(reporter.last().unwrap().severity, MessageSeverity::Warning);
    }

    #[test]
    fn severity_helpers_map_levels() {
        let (reporter, mut events) = StatusReporter::new();
        reporter.info("a");
        reporter.success("b");
        reporter.warning("c");
        reporter.error("d");

        let levels: Vec<MessageSeverity> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.severity)
            .collect();
        assert_eq!(
            levels,
            vec![
                MessageSeverity::Info,
                MessageSeverity::Success,
                MessageSeverity::Warning,
                MessageSeverity::Error
            ]
        );
    }
}
