//! Toolchain runs against a local monorepo checkout.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{Context, Result};
use tokio::{
    process::{Child, Command},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, instrument::WithSubscriber};

use super::{
    DEPLOYMENT_ARTIFACT, DeployContractsOpts, ExecutionBackend, GenerateAllocsOpts,
    L2GenesisCmdBuilder, Staging, allocs_artifact, decode_addresses, deploy_script_cmd,
};
use crate::{Addresses, DeployError};

#[derive(Debug)]
pub struct LocalBackend {
    monorepo_dir: PathBuf,
    forge_bin: Option<PathBuf>,
    span: Span,
}

impl LocalBackend {
    pub fn new(monorepo_dir: impl Into<PathBuf>, span: Span) -> Self {
        Self {
            monorepo_dir: monorepo_dir.into(),
            forge_bin: None,
            span,
        }
    }

    /// Use a specific forge binary instead of the one on `PATH`.
    pub fn forge_bin(mut self, bin: Option<PathBuf>) -> Self {
        self.forge_bin = bin;
        self
    }

    fn contracts_dir(&self) -> Result<PathBuf> {
        let dir = self.monorepo_dir.join("packages").join("contracts-bedrock");
        if !dir.is_dir() {
            anyhow::bail!(DeployError::backend(format!(
                "contracts package not found at {}",
                dir.display()
            )));
        }
        Ok(dir)
    }

    /// Spawn `cmd` in `dir`, forward its output and wait for it to exit.
    ///
    /// On cancellation the process is killed and still reaped before returning.
    async fn run(
        &self,
        cmd: Vec<String>,
        dir: &Path,
        envs: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (program, args) = cmd.split_first().context("toolchain command is empty")?;

        tracing::info!(program, ?args, dir = %dir.display(), "Starting toolchain process");
        let mut child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .envs(envs.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeployError::backend(format!("failed to start {program}: {e}")))?;

        let output = forward_output(&mut child);

        let exited = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };

        let Some(status) = exited else {
            tracing::info!(program, "Cancelled, killing toolchain process");
            if let Err(e) = child.start_kill() {
                tracing::error!(program, error = %e, "Failed to kill toolchain process");
            }
            let _ = child.wait().await;
            output.abort();
            anyhow::bail!(DeployError::Cancelled);
        };

        let status = status.context("Failed to wait for toolchain process")?;
        let _ = output.await;

        if !status.success() {
            anyhow::bail!(DeployError::backend(format!("{program} failed: {status}")));
        }

        tracing::debug!(program, "Toolchain process complete");
        Ok(())
    }
}

/// Copy the child's stdout and stderr to ours from a single task.
fn forward_output(child: &mut Child) -> JoinHandle<()> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    tokio::spawn(
        async move {
            let out = async {
                match stdout {
                    Some(mut stdout) => {
                        tokio::io::copy(&mut stdout, &mut tokio::io::stdout()).await
                    }
                    None => Ok(0),
                }
            };
            let err = async {
                match stderr {
                    Some(mut stderr) => {
                        tokio::io::copy(&mut stderr, &mut tokio::io::stderr()).await
                    }
                    None => Ok(0),
                }
            };

            let (out, err) = tokio::join!(out, err);
            if let Err(e) = out.and(err) {
                tracing::warn!(error = %e, "Failed to forward toolchain output");
            }
        }
        .in_current_span()
        .with_current_subscriber(),
    )
}

/// Read an artifact the toolchain was expected to leave behind.
async fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            anyhow::bail!(DeployError::ArtifactNotFound {
                name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                location: path
                    .parent()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_default(),
            })
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Drop an artifact left over from an earlier run so it can't be mistaken for fresh output.
async fn clear_artifact(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed stale artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

impl ExecutionBackend for LocalBackend {
    async fn deploy(
        &self,
        opts: DeployContractsOpts<'_>,
        cancel: &CancellationToken,
    ) -> Result<Addresses> {
        async {
            let dir = self.contracts_dir()?;
            let artifact = dir.join(DEPLOYMENT_ARTIFACT);
            clear_artifact(&artifact).await?;

            let staging = Staging::new()?;
            let state_path = staging.write_json("infile.json", opts.state)?;

            let envs = [
                ("DEPLOY_ETH_RPC_URL", opts.l1_rpc_url.to_string()),
                ("DEPLOY_PRIVATE_KEY", opts.private_key.to_string()),
                ("DEPLOY_STATE_PATH", state_path.display().to_string()),
            ];
            self.run(deploy_script_cmd(), &dir, &envs, cancel)
                .await
                .context("Failed to run deploy script")?;

            decode_addresses(&read_artifact(&artifact).await?)
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
            let dir = self.contracts_dir()?;
            let artifact =
                dir.join(allocs_artifact(opts.l2_chain_id, config.latest_genesis_fork()));
            clear_artifact(&artifact).await?;

            let staging = Staging::new()?;
            let addresses_path = staging.write_json("addresses.json", addresses)?;
            let config_path = staging.write_json("deploy-config.json", config)?;

            let mut cmd = L2GenesisCmdBuilder::new(opts.l2_chain_id);
            if let Some(forge) = &self.forge_bin {
                cmd = cmd.forge_bin(forge.display().to_string());
            }

            let envs = [
                ("CONTRACT_ADDRESSES_PATH", addresses_path.display().to_string()),
                ("DEPLOY_CONFIG_PATH", config_path.display().to_string()),
            ];
            self.run(cmd.build(), &dir, &envs, cancel)
                .await
                .context("Failed to run L2 genesis script")?;

            read_artifact(&artifact).await
        }
        .instrument(self.span.clone())
        .await
    }
}
