//! Downstream telemetry sink boundary.
//!
//! The bridge only needs two things from the sink: whether it is connected
//! and a way to submit an ordered batch of writes. Values flowing the other
//! way arrive through a [`FeedbackHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fpu_core::{DriverConfig, StateStore, WriteValue};

use crate::SharedStore;

/// Failure to deliver a batch downstream.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SinkError {
    /// The sink dropped its connection.
    #[error("sink not connected")]
    NotConnected,

    /// The sink refused a write.
    #[error("write to {path} rejected: {reason}")]
    Rejected { path: String, reason: String },

    /// Any other transport failure.
    #[error("sink write failed: {0}")]
    Write(String),
}

/// A downstream consumer of write batches.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Whether writes can currently be delivered.
    fn is_connected(&self) -> bool;

    /// Submit one ordered batch.
    async fn write_batch(&self, values: Vec<WriteValue>) -> Result<(), SinkError>;
}

/// Sink that logs every write. Used when no real sink is wired.
#[derive(Debug, Default)]
pub struct LoggingSink;

#[async_trait]
impl TelemetrySink for LoggingSink {
    fn is_connected(&self) -> bool {
        true
    }

    async fn write_batch(&self, values: Vec<WriteValue>) -> Result<(), SinkError> {
        for value in &values {
            debug!(path = %value.path, value = ?value.value, "write");
        }
        Ok(())
    }
}

/// In-memory sink that records batches.
///
/// Connectivity and failure can be toggled to exercise the tick writer.
#[derive(Debug, Default)]
pub struct RecordingSink {
    connected: AtomicBool,
    failing: AtomicBool,
    batches: Mutex<Vec<Vec<WriteValue>>>,
}

impl RecordingSink {
    /// A connected sink that accepts writes.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Make every following write fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Every batch accepted so far.
    pub async fn batches(&self) -> Vec<Vec<WriteValue>> {
        self.batches.lock().await.clone()
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn write_batch(&self, values: Vec<WriteValue>) -> Result<(), SinkError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(SinkError::Write("simulated failure".to_string()));
        }
        self.batches.lock().await.push(values);
        Ok(())
    }
}

/// Inbound channel from the sink into device state.
///
/// Cheap to clone; safe to use concurrently with the tick writer.
#[derive(Clone)]
pub struct FeedbackHandle {
    store: SharedStore,
    config: Arc<DriverConfig>,
}

impl FeedbackHandle {
    pub fn new(store: SharedStore, config: Arc<DriverConfig>) -> Self {
        Self { store, config }
    }

    /// Push the "time sync active interface" selector into a device.
    ///
    /// Returns false when the device is unknown.
    pub async fn set_active_interface(&self, device: &str, value: i32) -> bool {
        let updated = self.store.write().await.set_active_interface(device, value);
        if updated {
            info!(device, value, "time sync active interface changed");
        } else {
            warn!(device, "active interface for unknown device");
        }
        updated
    }

    /// Route a value fed back on a subscription path to its device.
    pub async fn set_active_interface_by_path(&self, path: &str, value: i32) -> bool {
        match self.config.device_for_subscription_path(path) {
            Some(device) => self.set_active_interface(device, value).await,
            None => {
                debug!(path, "feedback on unmapped path");
                false
            }
        }
    }

    /// Paths the sink must monitor for feedback.
    pub fn subscription_paths(&self) -> Vec<String> {
        self.config.subscription_paths()
    }
}
