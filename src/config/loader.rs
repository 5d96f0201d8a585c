//! Configuration Loader
//!
//! Environment-aware YAML loading: a single `relocator-config.yaml` carries
//! base values plus optional `development`/`test`/`production` override
//! sections that are merged over the base for the detected environment.

use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::{ConfigResult, ConfigurationError, RelocatorConfig};

const CONFIG_FILE_NAME: &str = "relocator-config.yaml";
const ENVIRONMENT_SECTIONS: &[&str] = &["development", "test", "production"];

/// Loaded, validated configuration plus the context it was loaded in.
pub struct ConfigManager {
    config: RelocatorConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory.
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load with an explicit environment; useful for tests that must not
    /// mutate process-global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading relocator configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// A manager around defaults, for callers with no config file at all.
    pub fn from_defaults(environment: &str) -> Arc<ConfigManager> {
        Arc::new(ConfigManager {
            config: RelocatorConfig::default(),
            environment: environment.to_string(),
            config_directory: PathBuf::new(),
        })
    }

    pub fn config(&self) -> &RelocatorConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn detect_environment() -> String {
        env::var("RELOCATOR_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<RelocatorConfig> {
        let config_file = config_directory.join(CONFIG_FILE_NAME);
        if !config_file.exists() {
            return Err(ConfigurationError::FileNotFound(
                config_file.display().to_string(),
            ));
        }

        let yaml_content =
            std::fs::read_to_string(&config_file).map_err(|source| ConfigurationError::Io {
                file: config_file.display().to_string(),
                source,
            })?;

        let mut yaml_data: YamlValue =
            serde_yaml::from_str(&yaml_content).map_err(|source| ConfigurationError::InvalidYaml {
                file: config_file.display().to_string(),
                source,
            })?;

        // Apply environment-specific overrides
        if let Some(env_overrides) = yaml_data.get(environment).cloned() {
            debug!(environment = environment, "Applying environment overrides");
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        }

        // Remove environment sections so they do not leak into the typed config
        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String((*section).to_string()));
            }
        }

        serde_yaml::from_value(yaml_data).map_err(|source| ConfigurationError::InvalidYaml {
            file: config_file.display().to_string(),
            source,
        })
    }

    /// Recursively merge override mappings into the base; scalars override
    /// completely.
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }
}
