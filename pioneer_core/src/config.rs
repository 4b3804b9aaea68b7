use crate::stop::StopCondition;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    #[serde(default = "default_states_dir")]
    pub states_dir: PathBuf,
}

pub fn default_states_dir() -> PathBuf {
    PathBuf::from("./states")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            states_dir: default_states_dir(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ExplorerSettings {
    /// Attempts at reaching a known state before a run is abandoned.
    #[serde(default = "default_resync_attempts")]
    pub resync_attempts: u32,
    /// Seconds the watchdog is pushed out by before each transition.
    #[serde(default = "default_transition_timeout_secs")]
    pub transition_timeout_secs: u64,
    /// Fixed seed for the exploration order. Seeded from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

pub fn default_resync_attempts() -> u32 {
    10
}
pub fn default_transition_timeout_secs() -> u64 {
    120
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            resync_attempts: default_resync_attempts(),
            transition_timeout_secs: default_transition_timeout_secs(),
            seed: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TransactorSettings {
    pub apply_command: Vec<String>,
    pub compare_command: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    120_000
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct PioneerConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub explorer: ExplorerSettings,
    #[serde(default)]
    pub transactor: Option<TransactorSettings>,
    #[serde(default)]
    pub stop: StopCondition,
}

impl PioneerConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: PioneerConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.explorer.resync_attempts == 0 {
            anyhow::bail!("[explorer] resync-attempts must be at least 1");
        }
        Ok(())
    }
}
