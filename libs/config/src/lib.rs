//! # Dialogue Configuration
//!
//! Runtime settings for the dialogue service, loaded once at startup and
//! passed by value to the broker, workers and clients. Nothing here is a
//! process-wide global.
//!
//! ## Usage
//!
//! ```no_run
//! use dialogue_config::FrameConfig;
//!
//! let config = FrameConfig::load("frame.json")?;
//! let addr = config.runtime.listen_address()?;
//! # Ok::<(), dialogue_config::ConfigError>(())
//! ```

pub mod error;
pub mod frame_config;

// Re-export commonly used types
pub use error::{ConfigError, Result};
pub use frame_config::{
    ClientSettings, FrameConfig, HeartbeatConfig, RuntimeConfig, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};
