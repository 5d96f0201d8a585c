//! # Configuration System
//!
//! Typed, validated configuration loaded from a single YAML file with
//! per-environment override sections. No silent fallbacks: the loaded
//! configuration is validated before any work item is touched.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use loader::ConfigManager;

/// Root configuration structure mirroring relocator-config.yaml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelocatorConfig {
    /// Scheduler admission-control and polling settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Notification sink settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently in-flight relocation tasks
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Reserved-capacity margin a target datastore must retain, percent
    #[serde(default = "default_free_buffer_percent")]
    pub free_buffer_percent: f64,

    /// Fixed wait between polls of in-flight tasks, seconds
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Emit notifications on Running and terminal transitions
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_max_concurrent() -> usize {
    defaults::MAX_CONCURRENT
}

fn default_free_buffer_percent() -> f64 {
    defaults::FREE_BUFFER_PERCENT
}

fn default_poll_interval_seconds() -> u64 {
    defaults::POLL_INTERVAL_SECONDS
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::MAX_CONCURRENT,
            free_buffer_percent: defaults::FREE_BUFFER_PERCENT,
            poll_interval_seconds: defaults::POLL_INTERVAL_SECONDS,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RelocatorConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl RelocatorConfig {
    /// Validate operational bounds before the run starts.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scheduler.max_concurrent == 0 {
            return Err(ConfigurationError::Validation(
                "scheduler.max_concurrent must be at least 1".to_string(),
            ));
        }
        if !(0.0..100.0).contains(&self.scheduler.free_buffer_percent) {
            return Err(ConfigurationError::Validation(format!(
                "scheduler.free_buffer_percent must be in [0, 100), got {}",
                self.scheduler.free_buffer_percent
            )));
        }
        if self.scheduler.poll_interval_seconds == 0 {
            return Err(ConfigurationError::Validation(
                "scheduler.poll_interval_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid YAML in {file}: {source}")]
    InvalidYaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Failed to read configuration file {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
