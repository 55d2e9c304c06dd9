//! Logging Sink
//!
//! The pipeline never logs directly. It reports through an injected
//! [`LogSink`]; [`NoopSink`] is the default and [`TracingSink`] forwards to
//! `tracing` under the `rustylayout` target.

use parking_lot::Mutex;
use std::error::Error;
use std::fmt;
use tracing::Level;

/// Leveled logging capability with an optional cause
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str, cause: Option<&(dyn Error + 'static)>);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message, None);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message, None);
    }

    fn warn(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        self.log(Level::WARN, message, cause);
    }

    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        self.log(Level::ERROR, message, cause);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _message: &str, _cause: Option<&(dyn Error + 'static)>) {}
}

/// Forwards to the `tracing` macros
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str, cause: Option<&(dyn Error + 'static)>) {
        let cause = cause.map(|c| c.to_string());
        let cause = cause.as_deref().unwrap_or("");
        // tracing needs the level at compile time
        if level == Level::ERROR {
            tracing::error!(target: "rustylayout", cause, "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(target: "rustylayout", cause, "{}", message);
        } else if level == Level::INFO {
            tracing::info!(target: "rustylayout", "{}", message);
        } else if level == Level::DEBUG {
            tracing::debug!(target: "rustylayout", "{}", message);
        } else {
            tracing::trace!(target: "rustylayout", "{}", message);
        }
    }
}

/// One captured log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub cause: Option<String>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

/// Keeps every record in memory, for hosts that surface logs themselves
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the records captured so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records at or above `level` in severity
    pub fn at_least(&self, level: Level) -> Vec<LogRecord> {
        // tracing orders levels by verbosity: ERROR < WARN < ... < TRACE
        self.records
            .lock()
            .iter()
            .filter(|r| r.level <= level)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str, cause: Option<&(dyn Error + 'static)>) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            cause: cause.map(|c| c.to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_memory_sink_records_cause() {
        let sink = MemorySink::new();
        let cause = io::Error::new(io::ErrorKind::NotFound, "gone");
        sink.debug("starting");
        sink.warn("lookup failed", Some(&cause));
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].cause.as_deref(), Some("gone"));
        assert_eq!(records[1].to_string(), "[WARN] lookup failed: gone");
    }

    #[test]
    fn test_at_least_filters_by_severity() {
        let sink = MemorySink::new();
        sink.debug("d");
        sink.info("i");
        sink.error("e", None);
        let severe: Vec<_> = sink.at_least(Level::WARN).into_iter().map(|r| r.message).collect();
        assert_eq!(severe, ["e"]);
    }

    #[test]
    fn test_noop_and_tracing_sinks_accept_everything() {
        let sinks: [&dyn LogSink; 2] = [&NoopSink, &TracingSink];
        for sink in sinks {
            sink.info("hello");
            sink.error("bad", Some(&io::Error::new(io::ErrorKind::Other, "x")));
        }
    }
}
