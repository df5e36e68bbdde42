//! Typed downstream write values.
//!
//! A tick produces two batches: every device's fields, then the
//! application heartbeat. Each value is coerced to the data type the
//! configuration declares for its tag. Tags missing from the configuration
//! are skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DataType, DriverConfig};
use crate::model::FpuState;

pub const TAG_EASTING: &str = "FPU_EASTING";
pub const TAG_NORTHING: &str = "FPU_NORTHING";
pub const TAG_HEADING: &str = "FPU_HEADING";
pub const TAG_ROLL: &str = "FPU_ROLL";
pub const TAG_PITCH: &str = "FPU_PITCH";
pub const TAG_HEAVE: &str = "FPU_HEAVE";
pub const TAG_GPS_QUALITY: &str = "FPU_GPS_QUALITY";
pub const TAG_TIMESYNC_ACTIVE_INTERFACE: &str = "FPU_TIMESYNC_ACTIVE_INTERFACE";
pub const TAG_APP_HEARTBEAT: &str = "APP_HEARTBEAT";

/// A value in the representation the downstream tag expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TagValue {
    String(String),
    Word(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl TagValue {
    /// Coerce a numeric field into the declared type.
    ///
    /// Returns `None` when the type cannot carry a number (`DateTime`) or the
    /// value is not finite.
    pub fn from_number(data_type: DataType, value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let v = match data_type {
            DataType::String => TagValue::String(value.to_string()),
            DataType::Word => TagValue::Word(value.round().clamp(0.0, u16::MAX as f64) as u16),
            DataType::Int => {
                TagValue::Int(value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
            }
            DataType::Long => TagValue::Long(value.round() as i64),
            DataType::Float => TagValue::Float(value as f32),
            DataType::Double | DataType::Decimal => TagValue::Double(value),
            DataType::Bool => TagValue::Bool(value != 0.0),
            DataType::Bytes => TagValue::Bytes(value.to_le_bytes().to_vec()),
            DataType::DateTime => return None,
        };
        Some(v)
    }
}

/// One downstream write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteValue {
    /// Resolved tag path
    pub path: String,
    pub value: TagValue,
    pub source_timestamp: DateTime<Utc>,
}

/// Builds write batches from a configuration's write tags.
pub struct BatchBuilder<'a> {
    config: &'a DriverConfig,
    timestamp: DateTime<Utc>,
    values: Vec<WriteValue>,
    skipped: Vec<String>,
}

impl<'a> BatchBuilder<'a> {
    pub fn new(config: &'a DriverConfig, timestamp: DateTime<Utc>) -> Self {
        Self {
            config,
            timestamp,
            values: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Add a numeric field for a tag, if the tag is configured.
    pub fn push_number(&mut self, tag: &str, side: &str, value: f64) -> &mut Self {
        let Some(write_tag) = self.config.write_tag(tag) else {
            self.skipped.push(tag.to_string());
            return self;
        };
        match TagValue::from_number(write_tag.data_type, value) {
            Some(value) => self.values.push(WriteValue {
                path: write_tag.resolve(side),
                value,
                source_timestamp: self.timestamp,
            }),
            None => self.skipped.push(tag.to_string()),
        }
        self
    }

    /// Add every tracked field of one device.
    pub fn push_device(&mut self, side: &str, state: &FpuState) -> &mut Self {
        if let Some(position) = state.position {
            self.push_number(TAG_EASTING, side, position.easting);
            self.push_number(TAG_NORTHING, side, position.northing);
        }
        self.push_number(TAG_HEADING, side, state.heading)
            .push_number(TAG_ROLL, side, state.roll)
            .push_number(TAG_PITCH, side, state.pitch)
            .push_number(TAG_HEAVE, side, state.heave)
            .push_number(TAG_GPS_QUALITY, side, state.fix_quality as f64)
            .push_number(
                TAG_TIMESYNC_ACTIVE_INTERFACE,
                side,
                state.time_sync_active_interface as f64,
            )
    }

    /// Add the application heartbeat counter.
    pub fn push_heartbeat(&mut self, counter: u16) -> &mut Self {
        self.push_number(TAG_APP_HEARTBEAT, "", counter as f64)
    }

    /// Tag names that were requested but not written.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn finish(self) -> Vec<WriteValue> {
        self.values
    }
}
