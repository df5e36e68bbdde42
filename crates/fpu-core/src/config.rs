//! Driver configuration document.
//!
//! The configuration is a single JSON document holding:
//! - The device list with per-device overrides
//! - Root-level socket and reconnect defaults
//! - Write tags (downstream paths the tick writer fills)
//! - Subscription tags (downstream paths fed back into device state)
//!
//! Loading happens once at startup; a failure here is the only fatal error
//! in the bridge.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::path;

/// Default UDP port for NMEA over UDP.
pub const DEFAULT_PORT: u16 = 10110;
/// Default service loop interval.
pub const DEFAULT_SERVICE_INTERVAL_MS: u64 = 1000;
/// Service loop interval floor.
pub const MIN_SERVICE_INTERVAL_MS: u64 = 200;
/// Default heartbeat (silence) timeout.
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 5000;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Read(#[from] std::io::Error),

    /// The document is not valid JSON for this schema.
    #[error("Invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A device has an empty name.
    #[error("Device #{0} has an empty name")]
    EmptyName(usize),

    /// Two devices share a name.
    #[error("Duplicate device name: {0}")]
    DuplicateName(String),

    /// A reconnect policy is inconsistent.
    #[error("Invalid reconnect policy for {device}: {reason}")]
    InvalidReconnect { device: String, reason: String },
}

// ============================================================================
// Document Types
// ============================================================================

/// Root of the configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverConfig {
    pub devices: Vec<DeviceConfig>,

    pub nmea: NmeaSettings,

    /// Root reconnect policy, used by devices without their own.
    #[serde(rename = "reconnect")]
    pub default_reconnect: ReconnectPolicy,

    /// Root socket settings, used by devices without their own.
    #[serde(rename = "socket")]
    pub default_socket: SocketSettings,

    pub subscription_tags: Vec<SubscriptionTag>,

    pub write_tags: Vec<WriteTag>,

    pub data_handler: DataHandlerSettings,
}

/// One configured FPU.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    /// Unique device key.
    pub name: String,

    /// Expected sender (IP literal or DNS name). Other senders are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Token substituted into write tag paths; falls back to `name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<String>,

    /// Local UDP port, 0 means default.
    pub port: u16,

    pub service_interval_ms: u64,

    pub heartbeat_timeout_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<ReconnectOverride>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<SocketOverride>,
}

/// Exponential backoff between connection attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter_ms: 250,
        }
    }
}

/// Per-device reconnect fields; anything unset falls back to the root policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_ms: Option<u64>,
}

impl ReconnectOverride {
    pub fn merge(&self, base: &ReconnectPolicy) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay_ms: self.initial_delay_ms.unwrap_or(base.initial_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(base.max_delay_ms),
            multiplier: self.multiplier.unwrap_or(base.multiplier),
            jitter_ms: self.jitter_ms.unwrap_or(base.jitter_ms),
        }
    }
}

/// UDP socket options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocketSettings {
    /// Receive poll timeout. Expiry is a liveness poll, not a failure.
    pub receive_timeout_ms: u64,

    /// Kept for document compatibility; the link never sends.
    #[serde(alias = "SendTimeoutMs")]
    pub send_timeout_ms: u64,

    /// Receive buffer size in bytes.
    pub buffer_size: usize,

    /// Local bind address (IP literal or DNS name). Unset binds to any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_address: Option<String>,

    /// IPv4 multicast group to join after binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multicast_group: Option<String>,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 3000,
            send_timeout_ms: 3000,
            buffer_size: 8 * 1024,
            local_address: None,
            multicast_group: None,
        }
    }
}

/// Per-device socket fields; anything unset falls back to the root settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocketOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_timeout_ms: Option<u64>,
    #[serde(alias = "SendTimeoutMs", skip_serializing_if = "Option::is_none")]
    pub send_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multicast_group: Option<String>,
}

impl SocketOverride {
    pub fn merge(&self, base: &SocketSettings) -> SocketSettings {
        SocketSettings {
            receive_timeout_ms: self.receive_timeout_ms.unwrap_or(base.receive_timeout_ms),
            send_timeout_ms: self.send_timeout_ms.unwrap_or(base.send_timeout_ms),
            buffer_size: self.buffer_size.unwrap_or(base.buffer_size),
            local_address: self
                .local_address
                .clone()
                .or_else(|| base.local_address.clone()),
            multicast_group: self
                .multicast_group
                .clone()
                .or_else(|| base.multicast_group.clone()),
        }
    }
}

/// NMEA handling switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NmeaSettings {
    /// Surface frames with a bad checksum as sentences instead of dropping them.
    pub emit_invalid: bool,
}

/// Tick writer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataHandlerSettings {
    /// Delay before the first tick.
    pub initial_delay_ms: u64,

    /// Minimum time between two system clock adjustments.
    pub time_sync_period_minutes: u64,
}

impl Default for DataHandlerSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5000,
            time_sync_period_minutes: 1,
        }
    }
}

/// Downstream path template that the sink feeds back to us.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionTag {
    pub path: String,
    pub quantity: u32,
    pub replace_keyword: String,
}

/// Value type declared for a write tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    String,
    Word,
    Int,
    Long,
    Float,
    #[default]
    Double,
    Decimal,
    Bool,
    DateTime,
    Bytes,
}

/// Downstream path template written by the tick writer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriteTag {
    /// Logical tag name (e.g. "FPU_HEADING")
    pub name: String,
    /// Path containing `replace_keyword` as a placeholder
    pub path: String,
    pub quantity: u32,
    pub replace_keyword: String,
    pub data_type: DataType,
}

impl WriteTag {
    /// Resolve the templated path for one side token.
    pub fn resolve(&self, side: &str) -> String {
        path::substitute(&self.path, &self.replace_keyword, side)
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

/// A device's configuration merged with root defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    pub name: String,
    /// Token used in write tag paths
    pub side: String,
    pub host: Option<String>,
    pub port: u16,
    pub service_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub socket: SocketSettings,
    pub emit_invalid: bool,
}

impl DeviceSettings {
    /// Settings for a device with every field at its default.
    pub fn with_defaults(name: &str) -> Self {
        DeviceConfig {
            name: name.to_string(),
            ..Default::default()
        }
        .resolve(&DriverConfig::default())
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.socket.receive_timeout_ms)
    }
}

impl DeviceConfig {
    /// Merge this device with the root defaults, field by field.
    pub fn resolve(&self, root: &DriverConfig) -> DeviceSettings {
        let port = if self.port == 0 { DEFAULT_PORT } else { self.port };
        let service_ms = match self.service_interval_ms {
            0 => DEFAULT_SERVICE_INTERVAL_MS,
            ms => ms.max(MIN_SERVICE_INTERVAL_MS),
        };
        let heartbeat_ms = match self.heartbeat_timeout_ms {
            0 => DEFAULT_HEARTBEAT_TIMEOUT_MS,
            ms => ms,
        };

        let reconnect = self
            .reconnect
            .as_ref()
            .map(|r| r.merge(&root.default_reconnect))
            .unwrap_or_else(|| root.default_reconnect.clone());

        let mut socket = self
            .socket
            .as_ref()
            .map(|s| s.merge(&root.default_socket))
            .unwrap_or_else(|| root.default_socket.clone());
        if socket.receive_timeout_ms == 0 {
            socket.receive_timeout_ms = SocketSettings::default().receive_timeout_ms;
        }

        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from);

        let side = self
            .logical_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
            .to_string();

        DeviceSettings {
            name: self.name.clone(),
            side,
            host,
            port,
            service_interval: Duration::from_millis(service_ms),
            heartbeat_timeout: Duration::from_millis(heartbeat_ms),
            reconnect,
            socket,
            emit_invalid: root.nmea.emit_invalid,
        }
    }
}

// ============================================================================
// Loading and Lookup
// ============================================================================

impl DriverConfig {
    /// Parse a configuration document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DriverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check device names and reconnect policies.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            let name = device.name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyName(index));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::DuplicateName(name.to_string()));
            }

            let policy = device.resolve(self).reconnect;
            if policy.initial_delay_ms > policy.max_delay_ms {
                return Err(ConfigError::InvalidReconnect {
                    device: name.to_string(),
                    reason: format!(
                        "initialDelayMs {} exceeds maxDelayMs {}",
                        policy.initial_delay_ms, policy.max_delay_ms
                    ),
                });
            }
            if !policy.multiplier.is_finite() || policy.multiplier < 1.0 {
                return Err(ConfigError::InvalidReconnect {
                    device: name.to_string(),
                    reason: format!("multiplier {} must be >= 1", policy.multiplier),
                });
            }
        }
        Ok(())
    }

    /// Merged settings for every device, in configuration order.
    pub fn device_settings(&self) -> Vec<DeviceSettings> {
        self.devices.iter().map(|d| d.resolve(self)).collect()
    }

    /// Find a write tag by name (case-insensitive).
    pub fn write_tag(&self, name: &str) -> Option<&WriteTag> {
        self.write_tags
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Resolved downstream path for a tag and side token.
    pub fn path_for_tag(&self, name: &str, side: &str) -> Option<String> {
        if name.trim().is_empty() {
            return None;
        }
        self.write_tag(name).map(|tag| tag.resolve(side))
    }

    /// Every downstream path the sink should feed back, 1-based per tag.
    pub fn subscription_paths(&self) -> Vec<String> {
        self.subscription_tags
            .iter()
            .flat_map(|tag| path::expand_indexed(&tag.path, &tag.replace_keyword, tag.quantity))
            .collect()
    }

    /// Device a fed-back subscription path belongs to.
    ///
    /// Instance `n` of a subscription tag maps to the n-th configured device.
    pub fn device_for_subscription_path(&self, path: &str) -> Option<&str> {
        self.subscription_tags.iter().find_map(|tag| {
            let index = path::index_of(&tag.path, &tag.replace_keyword, path)?;
            if index == 0 || index > tag.quantity {
                return None;
            }
            self.devices
                .get(index as usize - 1)
                .map(|d| d.name.as_str())
        })
    }
}
