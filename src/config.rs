use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::sim::{FiringPolicy, SimError, SnapshotPolicy};

/// Per-run settings. Every field has a default so a partial TOML file works.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RunConfig {
    /// Simulated time limit; absent means run until another stop condition.
    #[serde(default)]
    pub horizon: Option<f64>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    #[serde(default)]
    pub snapshot: SnapshotPolicy,
    #[serde(default)]
    pub policy: FiringPolicy,
    #[serde(default = "default_replicates")]
    pub replicates: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            horizon: None,
            seed: default_seed(),
            max_events: default_max_events(),
            snapshot: SnapshotPolicy::default(),
            policy: FiringPolicy::default(),
            replicates: default_replicates(),
        }
    }
}

impl RunConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: RunConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if let Some(horizon) = self.horizon {
            if horizon.is_nan() || horizon < 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "horizon must be non-negative, got {horizon}"
                )));
            }
        }
        if self.replicates == 0 {
            return Err(SimError::InvalidConfig(
                "at least one replicate is required".to_string(),
            ));
        }
        self.snapshot.validate()
    }
}

fn default_seed() -> u64 {
    42
}

fn default_max_events() -> usize {
    1_000_000
}

fn default_replicates() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = RunConfig::load_from_file("/definitely/not/here.toml").unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: RunConfig = toml::from_str(
            r#"
            horizon = 10.0
            policy = "timed"

            [snapshot]
            kind = "interval"
            interval = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.horizon, Some(10.0));
        assert_eq!(config.policy, FiringPolicy::Timed);
        assert_eq!(config.snapshot, SnapshotPolicy::Interval { interval: 0.5 });
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_events, 1_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_from_disk() {
        let dir = std::env::temp_dir().join(format!("mrna-pnet-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run.toml");
        fs::write(&path, "seed = 7\nmax_events = 10\n").unwrap();
        let config = RunConfig::load_from_file(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_events, 10);
        fs::write(&path, "seed = \"seven\"\n").unwrap();
        assert!(RunConfig::load_from_file(&path).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn validation_rejects_nonsense() {
        let negative = RunConfig {
            horizon: Some(-1.0),
            ..RunConfig::default()
        };
        assert!(negative.validate().is_err());
        let no_replicates = RunConfig {
            replicates: 0,
            ..RunConfig::default()
        };
        assert!(no_replicates.validate().is_err());
        let unbounded = RunConfig {
            horizon: Some(f64::INFINITY),
            ..RunConfig::default()
        };
        assert!(unbounded.validate().is_ok());
    }
}
