//! # Configuration Management
//!
//! Runtime configuration for the message codec.
//!
//! The wire format itself is not configurable: field widths, string limits
//! and relay counts are fixed per message type so both peers agree on every
//! bit. What can be tuned is how packets are produced and observed.
//!
//! ## Configuration Sources
//! - TOML files via [`WireConfig::from_file`]
//! - `OVERLAY_WIRE_*` environment variables via [`WireConfig::from_env`]
//! - Direct instantiation with defaults
//!
//! ## Example
//! ```toml
//! [codec]
//! max_packet_bytes = 4096
//! packet_prefix_bytes = 8
//! buffer_pool_size = 64
//!
//! [logging]
//! app_name = "relay-backend"
//! log_level = "warn"
//! log_payloads = false
//! ```

use crate::error::{Result, WireError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Default largest packet the codec produces or accepts.
pub const DEFAULT_MAX_PACKET_BYTES: usize = 4096;

/// Hard ceiling for `max_packet_bytes`.
pub const MAX_PACKET_BYTES_LIMIT: usize = 65536;

/// Smallest useful `max_packet_bytes`.
pub const MIN_PACKET_BYTES: usize = 64;

/// Largest prefix the codec will reserve ahead of a message.
pub const MAX_PREFIX_BYTES: usize = 256;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct WireConfig {
    /// Packet sizing and buffer pooling
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging behaviour of the codec
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WireConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| WireError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| WireError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| WireError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables, falling back to defaults
    ///
    /// Recognised variables:
    /// - `OVERLAY_WIRE_MAX_PACKET_BYTES`
    /// - `OVERLAY_WIRE_PACKET_PREFIX_BYTES`
    /// - `OVERLAY_WIRE_BUFFER_POOL_SIZE`
    /// - `OVERLAY_WIRE_LOG_LEVEL`
    /// - `OVERLAY_WIRE_LOG_PAYLOADS`
    ///
    /// A variable that is set but cannot be parsed is an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = env_parse::<usize>("OVERLAY_WIRE_MAX_PACKET_BYTES")? {
            config.codec.max_packet_bytes = val;
        }

        if let Some(val) = env_parse::<usize>("OVERLAY_WIRE_PACKET_PREFIX_BYTES")? {
            config.codec.packet_prefix_bytes = val;
        }

        if let Some(val) = env_parse::<usize>("OVERLAY_WIRE_BUFFER_POOL_SIZE")? {
            config.codec.buffer_pool_size = val;
        }

        if let Some(val) = env_parse::<Level>("OVERLAY_WIRE_LOG_LEVEL")? {
            config.logging.log_level = val;
        }

        if let Some(val) = env_parse::<bool>("OVERLAY_WIRE_LOG_PAYLOADS")? {
            config.logging.log_payloads = val;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WireError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| WireError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration
    ///
    /// Returns every problem found. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WireError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| WireError::ConfigError(format!("Invalid value for {name}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Packet sizing configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CodecConfig {
    /// Largest packet, prefix included, that the codec writes or accepts
    pub max_packet_bytes: usize,

    /// Bytes reserved ahead of each message for an external header or hash
    #[serde(default)]
    pub packet_prefix_bytes: usize,

    /// Number of packet buffers kept for reuse
    pub buffer_pool_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            packet_prefix_bytes: 0,
            buffer_pool_size: 64,
        }
    }
}

impl CodecConfig {
    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_packet_bytes < MIN_PACKET_BYTES {
            errors.push(format!(
                "Max packet size too small: {} bytes (minimum: {MIN_PACKET_BYTES})",
                self.max_packet_bytes
            ));
        } else if self.max_packet_bytes > MAX_PACKET_BYTES_LIMIT {
            errors.push(format!(
                "Max packet size too large: {} bytes (maximum: {MAX_PACKET_BYTES_LIMIT})",
                self.max_packet_bytes
            ));
        }

        if self.packet_prefix_bytes > MAX_PREFIX_BYTES {
            errors.push(format!(
                "Packet prefix too large: {} bytes (maximum: {MAX_PREFIX_BYTES})",
                self.packet_prefix_bytes
            ));
        } else if self.packet_prefix_bytes >= self.max_packet_bytes {
            errors.push(
                "Packet prefix must leave room for a message within max packet size".to_string(),
            );
        }

        if self.buffer_pool_size == 0 {
            errors.push("Buffer pool size must be greater than 0".to_string());
        } else if self.buffer_pool_size > 100_000 {
            errors.push(format!(
                "Buffer pool size very high: {} (maximum: 100,000)",
                self.buffer_pool_size
            ));
        }

        errors
    }

    /// Bytes available for a message after the prefix
    pub fn payload_capacity(&self) -> usize {
        self.max_packet_bytes.saturating_sub(self.packet_prefix_bytes)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Name attached to codec log events
    pub app_name: String,

    /// Level used when a packet is rejected
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to emit hex dumps of payloads at trace level
    #[serde(default)]
    pub log_payloads: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("overlay-wire"),
            log_level: Level::WARN,
            log_payloads: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
