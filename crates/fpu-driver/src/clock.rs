//! System clock capability.
//!
//! Setting the OS clock needs elevated privileges, so it is injected into
//! the tick writer instead of being called directly.

use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClockError {
    /// The process may not change the system clock.
    #[error("not permitted to set the system clock")]
    PermissionDenied,

    /// The platform call failed.
    #[error("failed to set the system clock: {0}")]
    Failed(String),
}

/// Something that can set the system clock.
pub trait ClockSetter: Send + Sync {
    fn set_system_clock(&self, utc: DateTime<Utc>) -> Result<(), ClockError>;
}

/// Clock setter that only logs the time it would adopt.
#[derive(Debug, Default)]
pub struct LoggingClock;

impl ClockSetter for LoggingClock {
    fn set_system_clock(&self, utc: DateTime<Utc>) -> Result<(), ClockError> {
        info!(
            utc = %utc.to_rfc3339_opts(SecondsFormat::Millis, true),
            "system clock sync requested"
        );
        Ok(())
    }
}

/// Clock setter that records every request.
#[derive(Debug, Default)]
pub struct RecordingClock {
    requests: Mutex<Vec<DateTime<Utc>>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<DateTime<Utc>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ClockSetter for RecordingClock {
    fn set_system_clock(&self, utc: DateTime<Utc>) -> Result<(), ClockError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(utc);
        Ok(())
    }
}
