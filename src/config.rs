use crate::error::AnalysisError;
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "FOREST_AUDIT_CONFIG";
pub const ENDPOINT_ENV: &str = "FOREST_AUDIT_ENDPOINT";
const DEFAULT_CONFIG_FILE: &str = "forest_audit.yaml";

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;
        Ok(config)
    }

    /// Load from `$FOREST_AUDIT_CONFIG`, then `forest_audit.yaml`, then defaults,
    /// and apply environment overrides.
    pub fn resolve() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                info!("Loading configuration from {}", path);
                Self::load(&path)?
            }
            _ if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
                Self::load(DEFAULT_CONFIG_FILE)?
            }
            _ => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.is_empty() {
                config.encroachment.endpoint = endpoint;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), AnalysisError> {
        let carbon = &self.carbon;
        for (name, value) in [
            ("carbon.area_hectares", carbon.area_hectares),
            ("carbon.dense_tonnes_per_hectare", carbon.dense_tonnes_per_hectare),
            ("carbon.sparse_tonnes_per_hectare", carbon.sparse_tonnes_per_hectare),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::invalid_config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.clustering.clusters < 2 {
            return Err(AnalysisError::invalid_config(
                "clustering.clusters must be at least 2",
            ));
        }
        if !(0.0..=1.0).contains(&self.vegetation.loss_threshold) {
            return Err(AnalysisError::invalid_config(
                "vegetation.loss_threshold must be within [0, 1]",
            ));
        }

        let enc = &self.encroachment;
        if enc.max_attempts == 0 {
            return Err(AnalysisError::invalid_config(
                "encroachment.max_attempts must be at least 1",
            ));
        }
        if enc.inference_size == 0 {
            return Err(AnalysisError::invalid_config(
                "encroachment.inference_size must be positive",
            ));
        }
        for (name, value) in [
            ("encroachment.default_wait_secs", enc.default_wait_secs),
            ("encroachment.max_wait_secs", enc.max_wait_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::invalid_config(format!(
                    "{} must be a non-negative number of seconds",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Bearer token for the segmentation service, if configured.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.encroachment.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, SeedingStrategy};

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "carbon:\n  area_hectares: 12.5\nclustering:\n  init: random\n  seed: 7\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.carbon.area_hectares, 12.5);
        assert_eq!(config.carbon.dense_tonnes_per_hectare, 180.0);
        assert_eq!(config.clustering.init, SeedingStrategy::Random);
        assert_eq!(config.clustering.seed, Some(7));
        assert_eq!(config.clustering.clusters, 3);
        assert_eq!(config.vegetation.channel, Channel::Green);
        assert_eq!(config.encroachment.inference_size, 512);
        assert_eq!(config.encroachment.benign_labels.len(), 15);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_area() {
        let mut config = Config::default();
        config.carbon.area_hectares = -1.0;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        config.carbon.area_hectares = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut config = Config::default();
        config.encroachment.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.yaml");
        fs::write(&path, "vegetation:\n  channel: red\n").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.vegetation.channel, Channel::Red);
        assert_eq!(config.vegetation.loss_threshold, 0.15);
    }
}
