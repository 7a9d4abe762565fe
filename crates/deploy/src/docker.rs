//! Docker client for running the contract toolchain in one-shot containers.

use std::{fmt, io::Read, path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use bollard::{
    Docker,
    container::{
        Config, CreateContainerOptions, DownloadFromContainerOptions, LogOutput, LogsOptions,
        RemoveContainerOptions, StartContainerOptions, StopContainerOptions, WaitContainerOptions,
    },
    errors::Error as BollardError,
    image::CreateImageOptions,
    secret::HostConfig,
};
use derive_more::Deref;
use futures::StreamExt;
use tokio::{io::AsyncWriteExt, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, instrument::WithSubscriber};

use crate::DeployError;

/// A Docker image reference with image name and tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DockerImage {
    /// The image name (e.g., "us-docker.pkg.dev/oplabs-tools-artifacts/images/contracts").
    pub image: String,
    /// The image tag (e.g., "latest" or "v1.0.0").
    pub tag: String,
}

impl DockerImage {
    pub fn new(image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tag: tag.into(),
        }
    }
}

impl FromStr for DockerImage {
    type Err = anyhow::Error;

    /// Parses `image[:tag]`. A colon that belongs to a registry port is not taken as a tag
    /// separator; a missing tag means `latest`.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            anyhow::bail!(DeployError::validation("docker image must not be empty"));
        }

        let name_start = s.rfind('/').map(|i| i + 1).unwrap_or(0);
        match s[name_start..].rfind(':') {
            Some(i) => {
                let (image, tag) = s.split_at(name_start + i);
                let tag = &tag[1..];
                if tag.is_empty() {
                    anyhow::bail!(DeployError::validation(format!(
                        "docker image {s} has an empty tag"
                    )));
                }
                Ok(Self::new(image, tag))
            }
            None => Ok(Self::new(s, "latest")),
        }
    }
}

impl fmt::Display for DockerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.image, self.tag)
    }
}

/// Everything needed to create a one-shot toolchain container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: DockerImage,
    pub cmd: Option<Vec<String>>,
    pub env: Vec<String>,
    /// Volume binds (host:container:mode format).
    pub binds: Vec<String>,
    pub network_mode: Option<String>,
}

impl ContainerSpec {
    pub fn new(image: DockerImage) -> Self {
        Self {
            image,
            cmd: None,
            env: Vec::new(),
            binds: Vec::new(),
            network_mode: None,
        }
    }

    pub fn cmd(mut self, cmd: Vec<String>) -> Self {
        self.cmd = Some(cmd);
        self
    }

    pub fn env(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.env.push(format!("{key}={value}"));
        self
    }

    /// Mount a host file read-only.
    pub fn bind_ro(mut self, host_path: &Path, container_path: &str) -> Self {
        self.binds
            .push(format!("{}:{}:ro", host_path.display(), container_path));
        self
    }

    pub fn network_mode(mut self, mode: Option<String>) -> Self {
        self.network_mode = mode;
        self
    }

    fn into_config(self) -> Config<String> {
        let host_config = HostConfig {
            binds: (!self.binds.is_empty()).then_some(self.binds),
            network_mode: self.network_mode,
            ..Default::default()
        };

        Config {
            image: Some(self.image.to_string()),
            cmd: self.cmd,
            env: Some(self.env),
            host_config: Some(host_config),
            ..Default::default()
        }
    }
}

/// Docker client wrapper for toolchain runs.
#[derive(Deref, Clone)]
pub struct ToolchainDocker {
    #[deref]
    docker: Docker,
}

impl fmt::Debug for ToolchainDocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolchainDocker").finish_non_exhaustive()
    }
}

impl ToolchainDocker {
    /// Grace period given to a container before it is killed on cancellation.
    pub const STOP_CONTAINER_TIMEOUT: Duration = Duration::from_secs(5);

    /// Connect to the local Docker daemon.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| DeployError::backend(format!("failed to connect to Docker: {e}")))
            .context("Failed to connect to Docker. Is Docker running?")?;

        Ok(Self { docker })
    }

    /// Make sure the image is available locally, pulling it if necessary.
    pub async fn pull_image(&self, image: &DockerImage) -> Result<()> {
        let full_image = image.to_string();

        if self.docker.inspect_image(&full_image).await.is_ok() {
            tracing::debug!(image = %full_image, "Image already available locally, skipping pull");
            return Ok(());
        }

        tracing::info!(image = %full_image, "Image not found locally, pulling...");

        let mut stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: image.image.clone(),
                tag: image.tag.clone(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(result) = stream.next().await {
            let info = result.map_err(|e| {
                DeployError::backend(format!("failed to pull image {full_image}: {e}"))
            })?;
            if let Some(status) = info.status {
                tracing::trace!(status, "Image pull");
            }
        }

        Ok(())
    }

    /// Create and start a container, stream its output and block until it exits.
    ///
    /// Returns the container id on a zero exit status. On cancellation the container is stopped,
    /// its wait is drained and the container removed before a [`DeployError::Cancelled`] is
    /// returned.
    pub async fn run_to_completion(
        &self,
        spec: ContainerSpec,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let image = spec.image.to_string();
        let container = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, spec.into_config())
            .await
            .map_err(|e| DeployError::backend(format!("failed to create container: {e}")))?;
        let container_id = container.id;

        tracing::info!(container_id, image, "Starting toolchain container");
        if let Err(e) = self
            .docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
        {
            self.remove(&container_id).await;
            anyhow::bail!(DeployError::backend(format!(
                "failed to start container: {e}"
            )));
        }

        let logs = self.stream_logs(&container_id);
        let started = std::time::Instant::now();

        let mut wait = self.docker.wait_container(
            &container_id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );

        let exited = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = wait.next() => Some(res),
        };

        let Some(exited) = exited else {
            tracing::info!(container_id, "Cancelled, stopping container");
            if let Err(e) = self
                .docker
                .stop_container(
                    &container_id,
                    Some(StopContainerOptions {
                        t: Self::STOP_CONTAINER_TIMEOUT.as_secs() as i64,
                    }),
                )
                .await
            {
                tracing::error!(container_id, error = %e, "Failed to stop container");
            }
            let _ = wait.next().await;
            let _ = logs.await;
            self.remove(&container_id).await;
            anyhow::bail!(DeployError::Cancelled);
        };

        let _ = logs.await;

        let (status, wait_error) = match exited {
            Some(Ok(response)) => (
                response.status_code,
                response.error.and_then(|error| error.message),
            ),
            Some(Err(BollardError::DockerContainerWaitError { error, code })) => {
                (code, Some(error))
            }
            Some(Err(e)) => {
                self.remove(&container_id).await;
                return Err(anyhow::Error::new(e))
                    .context(DeployError::backend("error in container"));
            }
            None => {
                self.remove(&container_id).await;
                anyhow::bail!(DeployError::backend(
                    "container wait stream ended without response"
                ));
            }
        };

        tracing::info!(container_id, status, duration = ?started.elapsed(), "Container complete");

        if status != 0 {
            self.remove(&container_id).await;
            anyhow::bail!(DeployError::backend(exit_message(
                status,
                wait_error.as_deref()
            )));
        }

        Ok(container_id)
    }

    /// Forward the container's stdout/stderr to ours. This is the only task spawned per run.
    fn stream_logs(&self, container_id: &str) -> JoinHandle<()> {
        let logs_options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: true,
            ..Default::default()
        };

        let mut log_stream = self.docker.logs(container_id, Some(logs_options));
        let container_id = container_id.to_string();

        tokio::spawn(
            async move {
                let mut stdout = tokio::io::stdout();
                let mut stderr = tokio::io::stderr();

                while let Some(log_result) = log_stream.next().await {
                    let written = match log_result {
                        Ok(LogOutput::StdErr { message }) => stderr.write_all(&message).await,
                        Ok(
                            LogOutput::StdOut { message }
                            | LogOutput::Console { message }
                            | LogOutput::StdIn { message },
                        ) => stdout.write_all(&message).await,
                        Err(e) => {
                            tracing::error!(container_id, error = %e, "Error streaming logs");
                            break;
                        }
                    };
                    if let Err(e) = written {
                        tracing::warn!(error = %e, "Failed to forward container output");
                        break;
                    }
                }

                let _ = stdout.flush().await;
                let _ = stderr.flush().await;
                tracing::trace!(container_id, "Logs stream ended");
            }
            .in_current_span()
            .with_current_subscriber(),
        )
    }

    /// Read one file out of a (stopped) container.
    pub async fn download_file(&self, container_id: &str, path: &str) -> Result<Vec<u8>> {
        let mut stream = self.docker.download_from_container(
            container_id,
            Some(DownloadFromContainerOptions { path }),
        );

        let mut archive = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => archive.extend_from_slice(&bytes),
                Err(e) => {
                    tracing::debug!(
                        container_id,
                        path,
                        error = %e,
                        "Failed to copy from container"
                    );
                    anyhow::bail!(DeployError::ArtifactNotFound {
                        name: path.to_string(),
                        location: format!("container {container_id}"),
                    });
                }
            }
        }

        extract_from_tar(&archive, path)
    }

    /// Force-remove a container, logging instead of failing.
    pub async fn remove(&self, container_id: &str) {
        if let Err(e) = self
            .docker
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            tracing::warn!(container_id, error = %e, "Failed to remove container");
        } else {
            tracing::trace!(container_id, "Container removed");
        }
    }
}

/// Failure message for a non-zero exit, with the daemon's error text when it reported one.
fn exit_message(status: i64, error: Option<&str>) -> String {
    match error.filter(|error| !error.is_empty()) {
        Some(error) => format!("container exited with status {status}: {error}"),
        None => format!("container exited with status {status}"),
    }
}

/// Find the entry whose file name matches the basename of `path` in a tar archive.
pub fn extract_from_tar(archive: &[u8], path: &str) -> Result<Vec<u8>> {
    let wanted = Path::new(path)
        .file_name()
        .context("artifact path has no file name")?;

    let mut tar = tar::Archive::new(archive);
    for entry in tar.entries().context("Failed to read tar archive")? {
        let mut entry = entry.context("Failed to read tar header")?;
        let matches = entry
            .path()
            .context("Failed to read tar entry path")?
            .file_name()
            .is_some_and(|name| name == wanted);

        if matches {
            let mut out = Vec::new();
            entry
                .read_to_end(&mut out)
                .context("Failed to read file from tar")?;
            return Ok(out);
        }
    }

    anyhow::bail!(DeployError::ArtifactNotFound {
        name: wanted.to_string_lossy().into_owned(),
        location: "container archive".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, error_kind};

    fn tar_with(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .expect("Failed to append tar entry");
        }
        builder.into_inner().expect("Failed to finish tar")
    }

    #[test]
    fn test_extract_matches_basename() {
        let archive = tar_with(&[
            ("README.md", "nope"),
            ("deployment.json", r#"{"SystemConfigProxy":"0x01"}"#),
        ]);

        let out = extract_from_tar(
            &archive,
            "/workspace/optimism/packages/contracts-bedrock/deployments/deployment.json",
        )
        .expect("Failed to extract");
        assert_eq!(out, br#"{"SystemConfigProxy":"0x01"}"#);
    }

    #[test]
    fn test_extract_missing_entry() {
        let archive = tar_with(&[("state-dump-42-fjord.json", "{}")]);

        let err = extract_from_tar(&archive, "/x/state-dump-42-granite.json").unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::Backend);
        assert!(err.to_string().contains("state-dump-42-granite.json"));
    }

    #[test]
    fn test_parse_image_reference() {
        let image: DockerImage = "us-docker.pkg.dev/oplabs/contracts:v1.2.3"
            .parse()
            .expect("Failed to parse");
        assert_eq!(image.image, "us-docker.pkg.dev/oplabs/contracts");
        assert_eq!(image.tag, "v1.2.3");

        let image: DockerImage = "localhost:5000/contracts".parse().expect("Failed to parse");
        assert_eq!(image.image, "localhost:5000/contracts");
        assert_eq!(image.tag, "latest");
        assert_eq!(image.to_string(), "localhost:5000/contracts:latest");

        assert!("".parse::<DockerImage>().is_err());
        assert!("contracts:".parse::<DockerImage>().is_err());
    }

    #[test]
    fn test_container_spec_config() {
        let config = ContainerSpec::new(DockerImage::new("contracts", "dev"))
            .env("DEPLOY_STATE_PATH", "/infile.json")
            .bind_ro(Path::new("/tmp/stage/infile.json"), "/infile.json")
            .network_mode(Some("host".to_string()))
            .into_config();

        assert_eq!(config.image.as_deref(), Some("contracts:dev"));
        assert_eq!(
            config.env,
            Some(vec!["DEPLOY_STATE_PATH=/infile.json".to_string()])
        );

        let host = config.host_config.expect("host config");
        assert_eq!(
            host.binds,
            Some(vec!["/tmp/stage/infile.json:/infile.json:ro".to_string()])
        );
        assert_eq!(host.network_mode.as_deref(), Some("host"));
    }

    #[test]
    fn test_exit_message_keeps_daemon_error() {
        assert_eq!(
            exit_message(137, Some("OOM killed")),
            "container exited with status 137: OOM killed"
        );
        assert_eq!(exit_message(1, Some("")), "container exited with status 1");
        assert_eq!(exit_message(2, None), "container exited with status 2");
    }
}
