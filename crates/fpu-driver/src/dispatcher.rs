//! Routes driver events to the parsers and the state store.
//!
//! This is the single place where parse failures are logged. A bad
//! sentence is dropped and the device keeps its previous state.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use fpu_core::{Sentence, StateStore};
use fpu_providers::parse_sentence;

use crate::events::DriverEvent;
use crate::SharedStore;

pub struct Dispatcher {
    store: SharedStore,
}

impl Dispatcher {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Parse one sentence and apply it to its device.
    ///
    /// Returns true when device state changed. Sentences with a bad checksum
    /// are never parsed.
    pub async fn apply_sentence(&self, sentence: &Sentence) -> bool {
        if !sentence.checksum_valid {
            trace!(device = %sentence.device, raw = %sentence.raw, "skipping invalid checksum");
            return false;
        }

        match parse_sentence(sentence) {
            Ok(Some(update)) => {
                let applied = self
                    .store
                    .write()
                    .await
                    .apply(&sentence.device, &update, sentence.timestamp);
                if !applied {
                    warn!(device = %sentence.device, "sentence for unknown device");
                }
                applied
            }
            Ok(None) => {
                trace!(device = %sentence.device, kind = ?sentence.kind(), "no parser");
                false
            }
            Err(e) => {
                warn!(
                    device = %sentence.device,
                    kind = ?sentence.kind(),
                    raw = %sentence.raw,
                    "failed to parse sentence: {}",
                    e
                );
                false
            }
        }
    }

    pub async fn handle(&self, event: DriverEvent) {
        match event {
            DriverEvent::StatusChanged { device, status } => {
                info!(device = %device, %status, "device status");
            }
            DriverEvent::Heartbeat { device } => {
                trace!(device = %device, "heartbeat");
            }
            DriverEvent::Sentence(sentence) => {
                self.apply_sentence(&sentence).await;
            }
        }
    }

    /// Consume events until cancelled or every link has gone away.
    pub async fn run(self, mut events: mpsc::Receiver<DriverEvent>, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Some(event) => self.handle(event).await,
                None => break,
            }
        }
        debug!("dispatcher stopped");
    }
}
