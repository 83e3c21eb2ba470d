//! Configuration for the event subsystem.
//!
//! Covers the queue size, the optional background event thread and the
//! timing of pumping and blocking waits. Configuration can be built in code,
//! parsed from JSON, or loaded from `config.json` in the platform data
//! directory (%APPDATA%/EvPump/ on Windows, ~/.local/share/evpump/ on Linux).
//!
//! # Example
//!
//! ```rust
//! use evpump_core::config::EventConfig;
//!
//! let config = EventConfig::from_json_str(r#"{ "queue_capacity": 256 }"#).unwrap();
//! assert_eq!(config.queue_capacity, 256);
//! assert!(!config.event_thread);
//! ```

use crate::error::{EventError, Result};
use crate::event::{EventMask, EventType};
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Event subsystem settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EventConfig {
    /// Maximum number of pending events
    pub queue_capacity: usize,
    /// Pump sources from a dedicated background thread
    pub event_thread: bool,
    /// Sleep between pumps on the event thread
    pub pump_interval_ms: u64,
    /// Longest a blocking wait parks before pumping again
    pub wait_poll_interval_ms: u64,
    /// Extra type tags that start out disabled
    pub disabled_types: Vec<u8>,
}

impl Default for EventConfig {
    fn default() -> Self {
        EventConfig {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_thread: false,
            pump_interval_ms: 1,
            wait_poll_interval_ms: 10,
            disabled_types: Vec::new(),
        }
    }
}

impl EventConfig {
    /// Check every field, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(EventError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.wait_poll_interval_ms == 0 {
            return Err(EventError::InvalidConfig(
                "wait_poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.event_thread && self.pump_interval_ms == 0 {
            return Err(EventError::InvalidConfig(
                "pump_interval_ms must be at least 1 when event_thread is on".to_string(),
            ));
        }
        for &tag in &self.disabled_types {
            EventType::new(tag)?;
        }
        Ok(())
    }

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EventConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Mask of the extra tags listed in `disabled_types`
    pub fn disabled_mask(&self) -> Result<EventMask> {
        self.disabled_types
            .iter()
            .map(|&tag| EventType::new(tag))
            .collect::<Result<Vec<_>>>()
            .map(|types| types.into_iter().collect())
    }

    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }
}

/// Get the application's data directory
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "EvPump")
        .ok_or_else(|| EventError::Config("Failed to determine user data directory".to_string()))?;

    let data_dir = project_dirs.data_dir();
    fs::create_dir_all(data_dir)?;

    Ok(data_dir.to_path_buf())
}

/// Load configuration from config.json
/// Returns default config if file doesn't exist or on error
pub fn load_config() -> EventConfig {
    let Ok(data_dir) = get_data_directory() else {
        return EventConfig::default();
    };

    let config_path = data_dir.join("config.json");
    if !config_path.exists() {
        return EventConfig::default();
    }

    EventConfig::from_file(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Ignoring invalid {}: {}", config_path.display(), e);
        EventConfig::default()
    })
}

/// Save configuration to config.json
pub fn save_config(config: &EventConfig) -> Result<()> {
    config.validate()?;
    let data_dir = get_data_directory()?;
    let config_path = data_dir.join("config.json");

    let json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, json)?;

    Ok(())
}
