//! Logging setup and the in-memory log tail
//!
//! Tracing events go to stderr through the fmt subscriber and, in
//! parallel, into a small ring buffer the dashboard reads through
//! `/api/logs`. The buffer holds formatted entries only; it is a viewing
//! aid, not a durable log.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_CAPACITY: usize = 100;

/// One formatted log line as the dashboard shows it
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
}

/// Fixed-capacity ring of recent log entries, shared between the tracing
/// layer (writer) and the HTTP handlers (readers)
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The most recent entries, oldest first, at most `limit`
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// The tracing layer that feeds this buffer
    pub fn layer(&self) -> LogBufferLayer {
        LogBufferLayer {
            buffer: self.clone(),
        }
    }
}

/// Tracing layer that copies formatted events into a [`LogBuffer`]
pub struct LogBufferLayer {
    buffer: LogBuffer,
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEntry {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            level: event.metadata().level().to_string(),
            message: visitor.into_message(),
        });
    }
}

/// Collects the `message` field plus any structured fields into one line
#[derive(Default)]
struct MessageVisitor {
    message: String,
    extras: String,
}

impl MessageVisitor {
    fn into_message(self) -> String {
        if self.extras.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.extras
        } else {
            format!("{}{}", self.message, self.extras)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.extras, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.extras, " {}={}", field.name(), value);
        }
    }
}

/// Install the global subscriber: env-filtered stderr output plus the
/// dashboard's ring buffer. Call once at startup.
pub fn init_tracing(buffer: &LogBuffer) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(buffer.layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_evicts_oldest_at_capacity() {
        let buffer = LogBuffer::with_capacity(3);
        for i in 0..5 {
            buffer.push(LogEntry {
                time: "12:00:00".to_string(),
                level: "INFO".to_string(),
                message: format!("entry {i}"),
            });
        }

        let recent = buffer.recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "entry 2");
        assert_eq!(recent[2].message, "entry 4");
    }

    #[test]
    fn test_recent_limits_from_the_tail() {
        let buffer = LogBuffer::with_capacity(10);
        for i in 0..4 {
            buffer.push(LogEntry {
                time: "12:00:00".to_string(),
                level: "INFO".to_string(),
                message: format!("entry {i}"),
            });
        }

        let recent = buffer.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "entry 2");
        assert_eq!(recent[1].message, "entry 3");
    }

    #[test]
    fn test_layer_captures_message_and_fields() {
        let buffer = LogBuffer::with_capacity(10);
        let subscriber = tracing_subscriber::registry().with(buffer.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(ticket = 7, "ticket opened");
        });

        let recent = buffer.recent(10);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].level, "INFO");
        assert!(recent[0].message.contains("ticket opened"));
        assert!(recent[0].message.contains("ticket=7"));
    }
}
