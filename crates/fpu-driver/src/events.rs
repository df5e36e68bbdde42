//! Events fanned in from every device link.

use fpu_core::{DeviceStatus, Sentence};

/// One notification from a device link, tagged with the device name.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// The link moved to a different status.
    StatusChanged { device: String, status: DeviceStatus },
    /// A datagram yielded at least one accepted sentence.
    Heartbeat { device: String },
    /// A sentence drained by the link's service loop.
    Sentence(Sentence),
}

impl DriverEvent {
    /// Name of the device the event came from.
    pub fn device(&self) -> &str {
        match self {
            DriverEvent::StatusChanged { device, .. } | DriverEvent::Heartbeat { device } => device,
            DriverEvent::Sentence(sentence) => &sentence.device,
        }
    }
}
