//! Execution backends running the external contract toolchain.
//!
//! A backend either deploys the L1 contracts and returns their [`Addresses`], or runs the L2
//! genesis script and returns the raw allocation dump. Whether that happens in a container or in
//! a local checkout is invisible to the rest of the pipeline.

use std::{future::Future, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempdir::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use url::Url;

mod cmd;
mod docker;
mod local;

pub use cmd::{L2GenesisCmdBuilder, deploy_script_cmd};
pub use docker::DockerBackend;
pub use local::LocalBackend;

use crate::{
    Addresses, DeployConfig, DeployError, DeploymentState, deploy_config::Fork, docker::DockerImage,
};

/// Image used when none is configured.
pub const DEFAULT_CONTRACTS_IMAGE: &str = "ethereumoptimism/contracts-bedrock:latest";

/// Where the deploy script leaves the addresses, relative to the contracts package.
pub const DEPLOYMENT_ARTIFACT: &str = "deployments/deployment.json";

/// Name of the allocation dump written by the L2 genesis script.
pub fn allocs_artifact(chain_id: u64, fork: Fork) -> String {
    format!("state-dump-{chain_id}-{fork}.json")
}

pub struct DeployContractsOpts<'a> {
    pub l1_rpc_url: &'a Url,
    /// Hex encoded deployer key.
    pub private_key: &'a str,
    pub state: &'a DeploymentState,
}

pub struct GenerateAllocsOpts<'a> {
    pub l2_chain_id: u64,
    pub state: &'a DeploymentState,
}

impl GenerateAllocsOpts<'_> {
    pub(crate) fn inputs(&self) -> Result<(&Addresses, &DeployConfig)> {
        let addresses = self
            .state
            .addresses
            .as_ref()
            .ok_or_else(|| DeployError::validation("addresses not found in state"))?;
        let config = self
            .state
            .deploy_config
            .as_ref()
            .ok_or_else(|| DeployError::validation("deploy config not found in state"))?;
        Ok((addresses, config))
    }
}

/// Runs the contract toolchain.
pub trait ExecutionBackend {
    /// Deploy the L1 contracts described by the state's deploy config.
    fn deploy(
        &self,
        opts: DeployContractsOpts<'_>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Addresses>>;

    /// Produce the raw L2 genesis allocation dump for one chain.
    fn generate_allocs(
        &self,
        opts: GenerateAllocsOpts<'_>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Backend selection as it appears in settings files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Docker {
        image: String,
        /// Docker network mode, `host` lets the container reach an L1 on localhost.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        network_mode: Option<String>,
    },
    Local {
        monorepo_dir: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        forge_bin: Option<PathBuf>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Docker {
            image: DEFAULT_CONTRACTS_IMAGE.to_string(),
            network_mode: None,
        }
    }
}

impl BackendConfig {
    pub fn check(&self) -> Result<()> {
        match self {
            Self::Docker { image, .. } => {
                image.parse::<DockerImage>()?;
            }
            Self::Local { monorepo_dir, .. } => {
                if monorepo_dir.as_os_str().is_empty() {
                    anyhow::bail!(DeployError::validation("monorepo directory must be specified"));
                }
            }
        }
        Ok(())
    }
}

/// The configured backend.
#[derive(Debug)]
pub enum Backend {
    Docker(DockerBackend),
    Local(LocalBackend),
}

impl Backend {
    pub fn from_config(config: &BackendConfig, span: Span) -> Result<Self> {
        config.check()?;

        Ok(match config {
            BackendConfig::Docker {
                image,
                network_mode,
            } => Self::Docker(
                DockerBackend::new(image.parse()?, span)?.network_mode(network_mode.clone()),
            ),
            BackendConfig::Local {
                monorepo_dir,
                forge_bin,
            } => Self::Local(LocalBackend::new(monorepo_dir, span).forge_bin(forge_bin.clone())),
        })
    }
}

impl ExecutionBackend for Backend {
    async fn deploy(
        &self,
        opts: DeployContractsOpts<'_>,
        cancel: &CancellationToken,
    ) -> Result<Addresses> {
        match self {
            Self::Docker(backend) => backend.deploy(opts, cancel).await,
            Self::Local(backend) => backend.deploy(opts, cancel).await,
        }
    }

    async fn generate_allocs(
        &self,
        opts: GenerateAllocsOpts<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Docker(backend) => backend.generate_allocs(opts, cancel).await,
            Self::Local(backend) => backend.generate_allocs(opts, cancel).await,
        }
    }
}

/// Private scratch directory for toolchain inputs. Removed on drop.
struct Staging {
    dir: TempDir,
}

impl Staging {
    fn new() -> Result<Self> {
        let dir = TempDir::new("opchain-stage").context("Failed to create staging directory")?;
        Ok(Self { dir })
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        let json = serde_json::to_vec(value).with_context(|| format!("Failed to encode {name}"))?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::trace!(path = %path.display(), "Staged toolchain input");
        Ok(path)
    }
}

fn decode_addresses(raw: &[u8]) -> Result<Addresses> {
    serde_json::from_slice(raw).context("Failed to decode addresses file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChainIntent, ErrorKind, error_kind};

    #[test]
    fn test_allocs_artifact_name() {
        assert_eq!(
            allocs_artifact(42, Fork::Granite),
            "state-dump-42-granite.json"
        );
    }

    #[test]
    fn test_backend_config_serde() {
        let config: BackendConfig = serde_json::from_value(serde_json::json!({
            "kind": "local",
            "monorepo_dir": "/src/optimism",
        }))
        .expect("Failed to decode");

        assert_eq!(
            config,
            BackendConfig::Local {
                monorepo_dir: PathBuf::from("/src/optimism"),
                forge_bin: None,
            }
        );

        let json = serde_json::to_value(BackendConfig::default()).expect("Failed to encode");
        assert_eq!(json["kind"], "docker");
        assert_eq!(json["image"], DEFAULT_CONTRACTS_IMAGE);
    }

    #[test]
    fn test_backend_config_check() {
        BackendConfig::default().check().expect("default is valid");

        let err = BackendConfig::Local {
            monorepo_dir: PathBuf::new(),
            forge_bin: None,
        }
        .check()
        .unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::Validation);

        let err = BackendConfig::Docker {
            image: String::new(),
            network_mode: None,
        }
        .check()
        .unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::Validation);
    }

    #[test]
    fn test_allocs_inputs_require_addresses() {
        let state = DeploymentState::new(ChainIntent::new(1, 42));
        let opts = GenerateAllocsOpts {
            l2_chain_id: 42,
            state: &state,
        };

        let err = opts.inputs().unwrap_err();
        assert!(err.to_string().contains("addresses not found"));
    }

    #[test]
    fn test_staging_is_removed_on_drop() {
        let staging = Staging::new().expect("Failed to stage");
        let path = staging
            .write_json("addresses.json", &Addresses::default())
            .expect("Failed to write");
        assert!(path.exists());

        drop(staging);
        assert!(!path.exists());
    }
}
