//! Frame Configuration Module
//!
//! Loads the `frame.json` document that describes one dialogue deployment:
//! where the broker listens, how peers heartbeat, which service name the NLU
//! workers register and which components make up their pipeline.
//!
//! Values come from the file first, then from `DIALOGUE_*` environment
//! variables with `__` separating nested keys, e.g.
//! `DIALOGUE_RUNTIME__PORT=6000` or `DIALOGUE_RUNTIME__HEARTBEAT__LIVENESS=5`.

use crate::{ConfigError, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Prefix of environment variables overriding file values
pub const ENV_PREFIX: &str = "DIALOGUE";

/// Default configuration resource name
pub const DEFAULT_CONFIG_FILE: &str = "frame.json";

/// Top-level `frame.json` document
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameConfig {
    pub runtime: RuntimeConfig,

    /// Service name the NLU workers register with the broker
    pub service: String,

    /// Component names, run in order for every request
    pub pipeline: Vec<String>,

    /// Number of NLU workers to start
    pub workers: usize,
}

/// Settings shared by every component of a running process
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Log every protocol message at debug level
    pub verbose: bool,

    /// TCP port, kept as a string the way it appears on the command line
    pub port: String,

    pub bind_address: String,
    pub heartbeat: HeartbeatConfig,
    pub client: ClientSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Heartbeats a peer may miss before it is considered dead
    pub liveness: u32,
    pub interval_ms: u64,
    pub reconnect_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientSettings {
    pub timeout_ms: u64,

    /// Attempts after the first request times out
    pub retries: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            service: "nlu".to_string(),
            pipeline: vec!["tokenizer_whitespace".to_string()],
            workers: 1,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            port: codec::DEFAULT_PORT.to_string(),
            bind_address: "0.0.0.0".to_string(),
            heartbeat: HeartbeatConfig::default(),
            client: ClientSettings::default(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            liveness: codec::HEARTBEAT_LIVENESS,
            interval_ms: codec::HEARTBEAT_INTERVAL_MS,
            reconnect_ms: codec::RECONNECT_DELAY_MS,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_ms: codec::REQUEST_TIMEOUT_MS,
            retries: codec::REQUEST_RETRIES,
        }
    }
}

impl FrameConfig {
    /// Load configuration from `path` with environment overrides
    ///
    /// The file is required; its format follows the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_err = |source| ConfigError::Load {
            path: path.display().to_string(),
            source,
        };

        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(load_err)?;

        let frame: FrameConfig = config.try_deserialize().map_err(load_err)?;
        frame.validate()?;

        info!(
            path = %path.display(),
            service = %frame.service,
            port = %frame.runtime.port,
            workers = frame.workers,
            "Loaded frame configuration"
        );
        Ok(frame)
    }

    /// Parse an inline JSON document, without environment overrides
    pub fn from_json_str(json: &str) -> Result<Self> {
        let frame: FrameConfig = serde_json::from_str(json)?;
        frame.validate()?;
        Ok(frame)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.runtime.port_number()?;

        if self.service.trim().is_empty() {
            return Err(ConfigError::invalid("service", "must not be empty"));
        }
        if self.service.starts_with(codec::INTERNAL_SERVICE_PREFIX) {
            return Err(ConfigError::invalid(
                "service",
                format!("'{}' is reserved for broker-internal services", self.service),
            ));
        }
        if self.pipeline.is_empty() {
            return Err(ConfigError::invalid("pipeline", "at least one component is required"));
        }
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers", "at least one worker is required"));
        }

        let heartbeat = &self.runtime.heartbeat;
        if heartbeat.liveness == 0 {
            return Err(ConfigError::invalid("runtime.heartbeat.liveness", "must be at least 1"));
        }
        if heartbeat.interval_ms == 0 {
            return Err(ConfigError::invalid("runtime.heartbeat.interval_ms", "must be non-zero"));
        }
        if self.runtime.client.timeout_ms == 0 {
            return Err(ConfigError::invalid("runtime.client.timeout_ms", "must be non-zero"));
        }

        debug!("Configuration validated");
        Ok(())
    }
}

impl RuntimeConfig {
    /// Parsed port; `0` asks the OS for an ephemeral port
    pub fn port_number(&self) -> Result<u16> {
        self.port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort {
                port: self.port.clone(),
            })
    }

    /// `bind_address:port` for the broker listener
    pub fn listen_address(&self) -> Result<String> {
        Ok(format!("{}:{}", self.bind_address, self.port_number()?))
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    /// Silence after which a peer is considered dead
    pub fn expiry(&self) -> Duration {
        self.interval() * self.liveness
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
