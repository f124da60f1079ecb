// src/diagnostics.rs
//! Diagnostic channel for façade errors and activity.
//!
//! Façade operations never fail the host: problems such as calling
//! `add_marker` on a map that was never initialized are reported here and
//! the call returns. The default sink forwards to `tracing`; tests use
//! [`RecordingDiagnostics`] to inspect what was reported.

use crate::error::MapError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Arguments;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub trait Diagnostics: Send + Sync {
    fn log(&self, level: Level, args: Arguments<'_>);

    /// Report a façade error.
    fn report(&self, error: &MapError) {
        self.log(Level::Error, format_args!("{}", error));
    }

    fn debug(&self, args: Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn info(&self, args: Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn warn(&self, args: Arguments<'_>) {
        self.log(Level::Warn, args);
    }
}

/// Forwards everything to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log(&self, level: Level, args: Arguments<'_>) {
        match level {
            Level::Trace => tracing::trace!("{}", args),
            Level::Debug => tracing::debug!("{}", args),
            Level::Info => tracing::info!("{}", args),
            Level::Warn => tracing::warn!("{}", args),
            Level::Error => tracing::error!("{}", args),
        }
    }

    fn report(&self, error: &MapError) {
        tracing::error!(map_id = error.map_id().unwrap_or("-"), "{}", error);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticRecord {
    pub level: Level,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Keeps every record in memory, optionally forwarding to `tracing` too.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<DiagnosticRecord>>,
    forward: bool,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and also emit through `tracing`.
    pub fn forwarding() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            forward: true,
        }
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Messages logged at `Error` level, oldest first.
    pub fn errors(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == Level::Error)
            .map(|r| r.message)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl RecordingDiagnostics {
    fn record(&self, level: Level, message: String) {
        if let Ok(mut records) = self.records.lock() {
            records.push(DiagnosticRecord {
                level,
                message,
                timestamp: Utc::now(),
            });
        }
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn log(&self, level: Level, args: Arguments<'_>) {
        if self.forward {
            TracingDiagnostics.log(level, args);
        }
        self.record(level, args.to_string());
    }

    fn report(&self, error: &MapError) {
        if self.forward {
            TracingDiagnostics.report(error);
        }
        self.record(Level::Error, error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_sinks_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TracingDiagnostics>();
        assert_send_sync::<RecordingDiagnostics>();
    }

    #[test]
    fn test_recording_keeps_order_and_levels() {
        let diagnostics = RecordingDiagnostics::new();
        diagnostics.info(format_args!("created {}", "m1"));
        diagnostics.report(&MapError::MapNotInitialized("m2".to_string()));

        let records = diagnostics.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "created m1");
        assert_eq!(records[1].level, Level::Error);
        assert_eq!(diagnostics.errors(), vec!["Map 'm2' not initialized".to_string()]);

        diagnostics.clear();
        assert!(diagnostics.records().is_empty());
    }
}
