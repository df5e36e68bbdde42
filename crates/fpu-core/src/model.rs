//! FPU data model types.
//!
//! These types describe what flows through the bridge:
//! - `Sentence` values emitted once per accepted UDP frame
//! - `DeviceStatus` of a device link
//! - `FpuState`, the long-lived latest-known state of one device
//! - `FpuUpdate`, the outcome of a successful sentence parse

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection status of a single device link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    Disconnected,
    Connecting,
    Connected,
    Faulted,
}

impl DeviceStatus {
    /// Compact representation used for lock-free status reads.
    pub fn as_u8(self) -> u8 {
        match self {
            DeviceStatus::Disconnected => 0,
            DeviceStatus::Connecting => 1,
            DeviceStatus::Connected => 2,
            DeviceStatus::Faulted => 3,
        }
    }

    /// Inverse of [`DeviceStatus::as_u8`]. Unknown values map to `Disconnected`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DeviceStatus::Connecting,
            2 => DeviceStatus::Connected,
            3 => DeviceStatus::Faulted,
            _ => DeviceStatus::Disconnected,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceStatus::Disconnected => "Disconnected",
            DeviceStatus::Connecting => "Connecting",
            DeviceStatus::Connected => "Connected",
            DeviceStatus::Faulted => "Faulted",
        };
        f.write_str(s)
    }
}

/// Heave/roll/pitch decoded from a colon-framed TSS1 motion frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Two-digit sensor address
    pub address: u8,
    /// Four-digit frame sequence
    pub sequence: u16,
    /// Heave in meters
    pub heave_m: f64,
    /// Roll in degrees
    pub roll_deg: f64,
    /// Pitch in degrees
    pub pitch_deg: f64,
}

/// A single sentence accepted from a device.
///
/// Created once per accepted frame and consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// Name of the device the datagram arrived on
    pub device: String,

    /// Receipt time (UTC)
    pub timestamp: DateTime<Utc>,

    /// Frame text, trimmed
    pub raw: String,

    /// Whether the NMEA checksum matched (always true for legacy frames)
    pub checksum_valid: bool,

    /// Talker code (e.g. "GP", "HE")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talker: Option<String>,

    /// Sentence type code (e.g. "GGA", "HDT", "ZDA", "TSS1")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub sentence_type: Option<String>,

    /// Motion values already decoded from a legacy frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<MotionSample>,
}

impl Sentence {
    /// Sentence type as a plain string slice, if known.
    pub fn kind(&self) -> Option<&str> {
        self.sentence_type.as_deref()
    }
}

/// A projected UTM position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtmPosition {
    /// Easting in meters (false easting 500 000 m)
    pub easting: f64,
    /// Northing in meters (false northing 10 000 000 m in the southern hemisphere)
    pub northing: f64,
    /// UTM zone number, 1..=60
    pub zone: u8,
    /// True for the northern hemisphere
    pub north: bool,
}

/// Outcome of a successful sentence parse, applied to an [`FpuState`].
#[derive(Debug, Clone, PartialEq)]
pub enum FpuUpdate {
    /// True heading in degrees, already normalized to [0, 360)
    Heading(f64),
    /// GPS fix projected to UTM
    Fix { position: UtmPosition, quality: i32 },
    /// UTC time/date, with local time when the sentence carried an offset
    Time {
        utc: DateTime<Utc>,
        local: Option<DateTime<FixedOffset>>,
    },
    /// Roll and pitch from a textual TSS1 sentence
    Attitude { roll_deg: f64, pitch_deg: f64 },
    /// Full motion sample from a legacy frame
    Motion(MotionSample),
}

/// Latest known state of one FPU.
///
/// Fields are only ever overwritten by a successful parse; nothing is reset
/// when a later sentence fails to parse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpuState {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<UtmPosition>,
    pub fix_quality: i32,
    pub heading: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heave: f64,
    /// Last UTC time reported by a ZDA sentence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc: Option<DateTime<Utc>>,
    /// Receipt time of the sentence that carried `utc`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_received: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_time: Option<DateTime<FixedOffset>>,
    /// Selector pushed in from the downstream feedback channel
    pub time_sync_active_interface: i32,
}

impl FpuState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Apply a parse outcome received at `received`.
    pub fn apply(&mut self, update: &FpuUpdate, received: DateTime<Utc>) {
        match update {
            FpuUpdate::Heading(heading) => self.heading = *heading,
            FpuUpdate::Fix { position, quality } => {
                self.position = Some(*position);
                self.fix_quality = *quality;
            }
            FpuUpdate::Time { utc, local } => {
                self.utc = Some(*utc);
                self.utc_received = Some(received);
                if let Some(local) = local {
                    self.local_time = Some(*local);
                }
            }
            FpuUpdate::Attitude {
                roll_deg,
                pitch_deg,
            } => {
                self.roll = *roll_deg;
                self.pitch = *pitch_deg;
            }
            FpuUpdate::Motion(sample) => {
                self.heave = sample.heave_m;
                self.roll = sample.roll_deg;
                self.pitch = sample.pitch_deg;
            }
        }
    }

    /// Resolved local time as an RFC 3339 string (millisecond precision).
    pub fn local_time_string(&self) -> Option<String> {
        self.local_time
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
