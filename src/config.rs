use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::ExploreConfig;
use crate::net::Weight;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub explore: ExploreSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ExploreSettings {
    /// 请求未给出 `maxDepth` 时使用。
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_states")]
    pub max_states: usize,
    /// 超过该状态数的请求会被拒绝。
    #[serde(default = "default_max_states_cap")]
    pub max_states_cap: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SimulationSettings {
    #[serde(default = "default_run_steps")]
    pub run_steps: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ExploreSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_states: default_max_states(),
            max_states_cap: default_max_states_cap(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            run_steps: default_run_steps(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.explore.max_depth == 0 || self.explore.max_states == 0 {
            bail!("explore.max_depth and explore.max_states must be positive");
        }
        if self.explore.max_states > self.explore.max_states_cap {
            bail!(
                "explore.max_states ({}) exceeds explore.max_states_cap ({})",
                self.explore.max_states,
                self.explore.max_states_cap
            );
        }
        Ok(())
    }
}

impl ExploreSettings {
    /// Fills in the limits a request left out.
    pub fn resolve(
        &self,
        k: Option<Weight>,
        max_depth: Option<usize>,
        max_states: Option<usize>,
    ) -> ExploreConfig {
        ExploreConfig::new(
            k,
            max_depth.unwrap_or(self.max_depth),
            max_states.unwrap_or(self.max_states),
        )
    }
}

fn default_max_depth() -> usize {
    1_000
}

fn default_max_states() -> usize {
    10_000
}

fn default_max_states_cap() -> usize {
    1_000_000
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_run_steps() -> usize {
    100
}
