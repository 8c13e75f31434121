//! # Coordination Configuration
//!
//! Settings for the bus and the mediator.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     INVENTORY_QUEUE_CAPACITY=2048                                      │
//! │     INVENTORY_MEDIATOR_SOURCE=Mediator                                 │
//! │     INVENTORY_SEARCH_OWNER=ProductSearchWidget                         │
//! │     INVENTORY_MOVEMENT_TYPE=entrada                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/inventory/coordination.toml (Linux)                      │
//! │     ~/Library/Application Support/com.inventory.desktop/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # coordination.toml
//! [bus]
//! queue_capacity = 1024
//!
//! [mediator]
//! source_name = "Mediator"
//! search_owner = "ProductSearchWidget"
//! default_movement_type = "ENTRADA"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use inventory_core::MovementType;

use crate::error::{BusError, BusResult};
use crate::host_loop::DEFAULT_QUEUE_CAPACITY;

const CONFIG_FILE_NAME: &str = "coordination.toml";

// =============================================================================
// Bus Settings
// =============================================================================

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSettings {
    /// Pending deliveries the host loop queue holds before publish fails.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for BusSettings {
    fn default() -> Self {
        BusSettings {
            queue_capacity: default_queue_capacity(),
        }
    }
}

// =============================================================================
// Mediator Settings
// =============================================================================

/// Mediator identity and routing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediatorSettings {
    /// Source name on every event the mediator publishes.
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Widget that performs searches. Requests from it are not forwarded.
    #[serde(default = "default_search_owner")]
    pub search_owner: String,

    /// Movement type of derived entry actions.
    #[serde(default)]
    pub default_movement_type: MovementType,
}

fn default_source_name() -> String {
    "Mediator".to_string()
}

fn default_search_owner() -> String {
    "ProductSearchWidget".to_string()
}

impl Default for MediatorSettings {
    fn default() -> Self {
        MediatorSettings {
            source_name: default_source_name(),
            search_owner: default_search_owner(),
            default_movement_type: MovementType::default(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete coordination configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationConfig {
    #[serde(default)]
    pub bus: BusSettings,

    #[serde(default)]
    pub mediator: MediatorSettings,
}

impl CoordinationConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (coordination.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> BusResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading coordination config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load coordination config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> BusResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> BusResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| BusError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BusError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| BusError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Coordination config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BusResult<()> {
        if self.bus.queue_capacity == 0 {
            return Err(BusError::InvalidConfig(
                "queue_capacity must be greater than 0".into(),
            ));
        }

        if self.mediator.source_name.trim().is_empty() {
            return Err(BusError::InvalidConfig("source_name must not be empty".into()));
        }

        if self.mediator.search_owner.trim().is_empty() {
            return Err(BusError::InvalidConfig("search_owner must not be empty".into()));
        }

        // Equal names would make the mediator drop every forwarded request.
        if self.mediator.source_name == self.mediator.search_owner {
            return Err(BusError::InvalidConfig(format!(
                "source_name and search_owner must differ, both are '{}'",
                self.mediator.source_name
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(capacity) = std::env::var("INVENTORY_QUEUE_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(c) => {
                    debug!(capacity = c, "Overriding queue capacity from environment");
                    self.bus.queue_capacity = c;
                }
                Err(_) => warn!(value = %capacity, "Invalid INVENTORY_QUEUE_CAPACITY"),
            }
        }

        if let Ok(name) = std::env::var("INVENTORY_MEDIATOR_SOURCE") {
            debug!(source_name = %name, "Overriding mediator source from environment");
            self.mediator.source_name = name;
        }

        if let Ok(owner) = std::env::var("INVENTORY_SEARCH_OWNER") {
            debug!(search_owner = %owner, "Overriding search owner from environment");
            self.mediator.search_owner = owner;
        }

        if let Ok(movement) = std::env::var("INVENTORY_MOVEMENT_TYPE") {
            match movement.parse::<MovementType>() {
                Ok(m) => self.mediator.default_movement_type = m,
                Err(e) => warn!(error = %e, "Invalid INVENTORY_MOVEMENT_TYPE"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "inventory", "desktop")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
