//! # fpu-driver
//!
//! Tokio runtime for the NMEA FPU bridge.
//!
//! - [`DeviceLink`] listens on one UDP port per device and reconnects with
//!   backoff
//! - [`NmeaDriver`] owns the links and merges their events
//! - [`Dispatcher`] parses sentences into the shared state store
//! - [`TickWriter`] pushes a state snapshot downstream once per second

use std::sync::Arc;

use fpu_core::MemoryStore;
use tokio::sync::RwLock;

pub mod clock;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod events;
pub mod link;
pub mod sink;
pub mod writer;

pub use clock::{ClockError, ClockSetter, LoggingClock, RecordingClock};
pub use dispatcher::Dispatcher;
pub use driver::NmeaDriver;
pub use error::LinkError;
pub use events::DriverEvent;
pub use link::DeviceLink;
pub use sink::{FeedbackHandle, LoggingSink, RecordingSink, SinkError, TelemetrySink};
pub use writer::TickWriter;

/// Device state shared by the dispatcher, feedback and the tick writer.
pub type SharedStore = Arc<RwLock<MemoryStore>>;

/// A fresh shared store with one state per device.
pub fn shared_store<I, S>(names: I) -> SharedStore
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Arc::new(RwLock::new(MemoryStore::new(names)))
}
