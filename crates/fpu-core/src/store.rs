//! Per-device FPU state store.
//!
//! The store holds one [`FpuState`] per configured device for the lifetime
//! of the process. Parsers write through [`StateStore::apply`]; the tick
//! writer only ever reads a cloned [`StateStore::snapshot`].

use crate::model::{FpuState, FpuUpdate};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Trait for FPU state storage implementations.
pub trait StateStore: Send + Sync {
    /// Apply a parse outcome to a device. Returns false for unknown devices.
    fn apply(&mut self, device: &str, update: &FpuUpdate, received: DateTime<Utc>) -> bool;

    /// Set the downstream "time sync active interface" selector of a device.
    fn set_active_interface(&mut self, device: &str, value: i32) -> bool;

    /// Current state of one device.
    fn get(&self, device: &str) -> Option<&FpuState>;

    /// Copy of every device state, in registration order.
    fn snapshot(&self) -> Vec<FpuState>;
}

/// In-memory store keyed by device name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Device states in registration order
    states: Vec<FpuState>,
    /// Device name to index in `states`
    index: HashMap<String, usize>,
}

impl MemoryStore {
    /// Create a store with one empty state per device name.
    ///
    /// Repeated names are registered once.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::default();
        for name in names {
            store.register(name.as_ref());
        }
        store
    }

    /// Register a device, keeping any existing state.
    pub fn register(&mut self, name: &str) {
        if self.index.contains_key(name) {
            return;
        }
        self.index.insert(name.to_string(), self.states.len());
        self.states.push(FpuState::new(name));
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn get_mut(&mut self, device: &str) -> Option<&mut FpuState> {
        let i = *self.index.get(device)?;
        self.states.get_mut(i)
    }
}

impl StateStore for MemoryStore {
    fn apply(&mut self, device: &str, update: &FpuUpdate, received: DateTime<Utc>) -> bool {
        match self.get_mut(device) {
            Some(state) => {
                state.apply(update, received);
                true
            }
            None => false,
        }
    }

    fn set_active_interface(&mut self, device: &str, value: i32) -> bool {
        match self.get_mut(device) {
            Some(state) => {
                state.time_sync_active_interface = value;
                true
            }
            None => false,
        }
    }

    fn get(&self, device: &str) -> Option<&FpuState> {
        self.index.get(device).and_then(|&i| self.states.get(i))
    }

    fn snapshot(&self) -> Vec<FpuState> {
        self.states.clone()
    }
}
