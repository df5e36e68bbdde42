//! # fpu-core
//!
//! Core data model and state store for the NMEA FPU bridge.
//!
//! This crate provides:
//! - Data model types (Sentence, DeviceStatus, FpuState, FpuUpdate)
//! - The JSON configuration document and per-device settings merge
//! - Tag path templating and typed downstream write values
//! - In-memory per-device state store
//! - Reconnect backoff arithmetic
//!
//! This crate is intentionally runtime-agnostic and contains no async code.
//! Sockets, timers and tasks live in `fpu-driver`.

pub mod backoff;
pub mod config;
pub mod model;
pub mod path;
pub mod store;
pub mod write;

pub use backoff::Backoff;
pub use config::{ConfigError, DeviceSettings, DriverConfig};
pub use model::*;
pub use store::{MemoryStore, StateStore};
pub use write::{TagValue, WriteValue};
