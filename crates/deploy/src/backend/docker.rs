//! Containerized toolchain runs.

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use super::{
    DEPLOYMENT_ARTIFACT, DeployContractsOpts, ExecutionBackend, GenerateAllocsOpts,
    L2GenesisCmdBuilder, Staging, allocs_artifact, decode_addresses,
};
use crate::{
    Addresses,
    docker::{ContainerSpec, DockerImage, ToolchainDocker},
    error::cancellable,
};

/// Contracts package inside the toolchain image.
const CONTAINER_CONTRACTS_DIR: &str = "/workspace/optimism/packages/contracts-bedrock";
const CONTAINER_STATE_PATH: &str = "/infile.json";
const CONTAINER_ADDRESSES_PATH: &str = "/addresses.json";

fn container_path(relative: &str) -> String {
    format!("{CONTAINER_CONTRACTS_DIR}/{relative}")
}

fn container_deploy_config_path() -> String {
    container_path("deploy-config/deploy-config.json")
}

/// Image and runtime settings shared by every toolchain container.
#[derive(Debug, Clone)]
struct ContainerTemplate {
    image: DockerImage,
    network_mode: Option<String>,
}

impl ContainerTemplate {
    fn deploy_spec(&self, opts: &DeployContractsOpts<'_>, state_path: &Path) -> ContainerSpec {
        ContainerSpec::new(self.image.clone())
            .env("DEPLOY_ETH_RPC_URL", opts.l1_rpc_url)
            .env("DEPLOY_PRIVATE_KEY", opts.private_key)
            .env("DEPLOY_STATE_PATH", CONTAINER_STATE_PATH)
            .bind_ro(state_path, CONTAINER_STATE_PATH)
            .network_mode(self.network_mode.clone())
    }

    fn allocs_spec(
        &self,
        chain_id: u64,
        addresses_path: &Path,
        deploy_config_path: &Path,
    ) -> ContainerSpec {
        let deploy_config_target = container_deploy_config_path();

        ContainerSpec::new(self.image.clone())
            .cmd(L2GenesisCmdBuilder::new(chain_id).build())
            .env("CONTRACT_ADDRESSES_PATH", CONTAINER_ADDRESSES_PATH)
            .env("DEPLOY_CONFIG_PATH", &deploy_config_target)
            .bind_ro(addresses_path, CONTAINER_ADDRESSES_PATH)
            .bind_ro(deploy_config_path, &deploy_config_target)
            .network_mode(self.network_mode.clone())
    }
}

#[derive(Debug)]
pub struct DockerBackend {
    docker: ToolchainDocker,
    template: ContainerTemplate,
    span: Span,
}

impl DockerBackend {
    pub fn new(image: DockerImage, span: Span) -> Result<Self> {
        Ok(Self {
            docker: ToolchainDocker::connect()?,
            template: ContainerTemplate {
                image,
                network_mode: None,
            },
            span,
        })
    }

    pub fn network_mode(mut self, mode: Option<String>) -> Self {
        self.template.network_mode = mode;
        self
    }

    /// Run a container to completion and read one artifact out of it. The container is removed
    /// whatever the outcome.
    async fn run_and_extract(
        &self,
        spec: ContainerSpec,
        artifact: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        cancellable(cancel, self.docker.pull_image(&self.template.image)).await?;

        let container_id = self.docker.run_to_completion(spec, cancel).await?;

        tracing::info!(container_id, artifact, "Reading artifact from container");
        let out = cancellable(cancel, self.docker.download_file(&container_id, artifact)).await;
        self.docker.remove(&container_id).await;
        out
    }
}

impl ExecutionBackend for DockerBackend {
    async fn deploy(
        &self,
        opts: DeployContractsOpts<'_>,
        cancel: &CancellationToken,
    ) -> Result<Addresses> {
        async {
            let staging = Staging::new()?;
            tracing::info!("Writing deployment state to staging directory");
            let state_path = staging.write_json("infile.json", opts.state)?;

            let spec = self.template.deploy_spec(&opts, &state_path);
            let raw = self
                .run_and_extract(spec, &container_path(DEPLOYMENT_ARTIFACT), cancel)
                .await
                .context("Failed to run contracts container")?;

            decode_addresses(&raw)
        }
        .instrument(self.span.clone())
        .await
    }

    async fn generate_allocs(
        &self,
        opts: GenerateAllocsOpts<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        async {
            let (addresses, config) = opts.inputs()?;

            let staging = Staging::new()?;
            tracing::info!("Writing addresses and deploy config to staging directory");
            let addresses_path = staging.write_json("addresses.json", addresses)?;
            let config_path = staging.write_json("deploy-config.json", config)?;

            let artifact =
                container_path(&allocs_artifact(opts.l2_chain_id, config.latest_genesis_fork()));
            let spec = self
                .template
                .allocs_spec(opts.l2_chain_id, &addresses_path, &config_path);

            self.run_and_extract(spec, &artifact, cancel)
                .await
                .context("Failed to run L2 genesis container")
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChainIntent, DeploymentState, ErrorKind, error_kind};

    fn template() -> ContainerTemplate {
        ContainerTemplate {
            image: DockerImage::new("contracts", "dev"),
            network_mode: Some("host".to_string()),
        }
    }

    #[test]
    fn test_container_paths() {
        assert_eq!(
            container_path(DEPLOYMENT_ARTIFACT),
            "/workspace/optimism/packages/contracts-bedrock/deployments/deployment.json"
        );
        assert_eq!(
            container_deploy_config_path(),
            "/workspace/optimism/packages/contracts-bedrock/deploy-config/deploy-config.json"
        );
    }

    #[test]
    fn test_deploy_spec() {
        let url = "http://localhost:8545".parse().expect("Failed to parse url");
        let state = DeploymentState::new(ChainIntent::new(1, 42));
        let opts = DeployContractsOpts {
            l1_rpc_url: &url,
            private_key: "0xabc",
            state: &state,
        };

        let spec = template().deploy_spec(&opts, Path::new("/stage/infile.json"));

        assert!(spec.cmd.is_none(), "deploy runs the image's default command");
        assert_eq!(
            spec.env,
            vec![
                "DEPLOY_ETH_RPC_URL=http://localhost:8545/".to_string(),
                "DEPLOY_PRIVATE_KEY=0xabc".to_string(),
                "DEPLOY_STATE_PATH=/infile.json".to_string(),
            ]
        );
        assert_eq!(spec.binds, vec!["/stage/infile.json:/infile.json:ro".to_string()]);
    }

    #[test]
    fn test_allocs_spec() {
        let spec = template().allocs_spec(
            42,
            Path::new("/stage/addresses.json"),
            Path::new("/stage/deploy-config.json"),
        );

        let cmd = spec.cmd.as_deref().map(|cmd| cmd.join(" "));
        assert_eq!(
            cmd.as_deref(),
            Some("forge script scripts/L2Genesis.s.sol:L2Genesis --sig runWithStateDump() --chain-id 42")
        );
        assert!(
            spec.env
                .contains(&"CONTRACT_ADDRESSES_PATH=/addresses.json".to_string())
        );
        assert!(
            spec.binds
                .contains(&"/stage/addresses.json:/addresses.json:ro".to_string())
        );
        assert_eq!(spec.network_mode.as_deref(), Some("host"));
    }

    #[tokio::test]
    async fn test_cancel_before_image_pull() {
        let backend = DockerBackend::new(DockerImage::new("contracts", "dev"), Span::none())
            .expect("Failed to create backend");
        let url = "http://localhost:8545".parse().expect("Failed to parse url");
        let state = DeploymentState::new(ChainIntent::new(1, 42));
        let opts = DeployContractsOpts {
            l1_rpc_url: &url,
            private_key: "0xabc",
            state: &state,
        };

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = backend.deploy(opts, &cancel).await.unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::Cancelled);
    }
}
