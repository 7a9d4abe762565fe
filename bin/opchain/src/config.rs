//! Optional settings file.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use opchain_deploy::BackendConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment prefix for settings, e.g. `DEPLOYER_SETTINGS_BACKEND__KIND=local`.
const SETTINGS_ENV_PREFIX: &str = "DEPLOYER_SETTINGS_";

/// Settings shared by every pipeline command.
///
/// ```toml
/// l1_rpc_url = "http://localhost:8545"
/// poll_interval_secs = 1
///
/// [backend]
/// kind = "local"
/// monorepo_dir = "/src/optimism"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub l1_rpc_url: Option<Url>,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    /// Seconds between bootstrap receipt polls.
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl Settings {
    /// Load the settings file at `path`, if any, with the environment layered on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("settings file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load settings")
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Pick the L1 RPC URL, the flag wins over the settings.
    pub fn l1_rpc_url(&self, flag: Option<Url>) -> Result<Url> {
        flag.or_else(|| self.l1_rpc_url.clone())
            .context("An L1 RPC URL is required: pass --l1-rpc-url, set L1_RPC_URL or add l1_rpc_url to the settings file")
    }
}
