//! Owns every device link and merges their events.

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

use fpu_core::{DeviceSettings, DeviceStatus, DriverConfig};

use crate::events::DriverEvent;
use crate::link::DeviceLink;

/// Capacity of the merged event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// The set of device links built from one configuration.
pub struct NmeaDriver {
    links: Vec<DeviceLink>,
    events: Option<mpsc::Receiver<DriverEvent>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl NmeaDriver {
    /// One link per configured device, merged with the root defaults.
    pub fn new(config: &DriverConfig) -> Self {
        Self::from_settings(config.device_settings())
    }

    pub fn from_settings(settings: Vec<DeviceSettings>) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let links = settings
            .into_iter()
            .map(|s| DeviceLink::new(s, tx.clone()))
            .collect();
        Self {
            links,
            events: Some(rx),
            cancel: Mutex::new(None),
        }
    }

    /// Take the merged event stream. Only the first call gets it.
    ///
    /// Events must be consumed while the driver runs; a full channel holds
    /// back status notifications and sentence delivery.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.events.take()
    }

    pub fn device_names(&self) -> Vec<&str> {
        self.links.iter().map(DeviceLink::name).collect()
    }

    pub fn status(&self, device: &str) -> Option<DeviceStatus> {
        self.links
            .iter()
            .find(|l| l.name() == device)
            .map(DeviceLink::status)
    }

    pub fn statuses(&self) -> Vec<(String, DeviceStatus)> {
        self.links
            .iter()
            .map(|l| (l.name().to_string(), l.status()))
            .collect()
    }

    /// Start every link under a child of `cancel`.
    pub async fn start_all(&self, cancel: &CancellationToken) {
        let mut current = self.cancel.lock().await;
        if current.is_some() {
            return;
        }
        let token = cancel.child_token();
        join_all(self.links.iter().map(|l| l.start(token.clone()))).await;
        info!(devices = self.links.len(), "driver started");
        *current = Some(token);
    }

    /// Stop every link concurrently and wait for all of them.
    pub async fn stop_all(&self) {
        let Some(token) = self.cancel.lock().await.take() else {
            return;
        };
        token.cancel();
        join_all(self.links.iter().map(DeviceLink::stop)).await;
        info!("driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_follow_config_order() {
        let config = DriverConfig::from_json(
            r#"{ "devices": [{ "name": "fpu1" }, { "name": "fpu2", "port": 10120 }] }"#,
        )
        .unwrap();
        let mut driver = NmeaDriver::new(&config);
        assert_eq!(driver.device_names(), vec!["fpu1", "fpu2"]);
        assert_eq!(driver.status("fpu2"), Some(DeviceStatus::Disconnected));
        assert_eq!(driver.status("ghost"), None);
        assert!(driver.take_events().is_some());
        assert!(driver.take_events().is_none());
    }
}
