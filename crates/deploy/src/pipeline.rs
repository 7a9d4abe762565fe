//! The Configure → Deploy → Genesis pipeline.
//!
//! Each stage reads the state document, does its work and writes the whole document back as its
//! last step. A failing stage never writes, so the document on disk is always the output of the
//! last successful stage.

use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};
use url::Url;

use crate::{
    BootstrapChecker, Configurator, DeployError, DeploymentState, L1Block, L1Client,
    MnemonicKeyGenerator, RpcL1Client,
    backend::{Backend, BackendConfig, DeployContractsOpts, ExecutionBackend, GenerateAllocsOpts},
    bootstrap::DEFAULT_POLL_INTERVAL,
    error::cancellable,
    genesis::{
        BlockId, RollupConfig, build_l2_genesis, compress_genesis, decode_allocs, genesis_header,
    },
    keys::KeyGenerator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Configure,
    Deploy,
    Genesis,
}

impl Stage {
    async fn run<T>(self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        fut.await.with_context(|| format!("{self} stage failed"))
    }
}

fn check_paths(infile: &Path, outfile: &Path) -> Result<()> {
    if infile.as_os_str().is_empty() {
        anyhow::bail!(DeployError::validation("infile must be specified"));
    }
    if outfile.as_os_str().is_empty() {
        anyhow::bail!(DeployError::validation("outfile must be specified"));
    }
    Ok(())
}

/// Parses the deployer key as a secp256k1 scalar.
fn check_private_key(key: &str) -> Result<()> {
    let raw = hex::decode(key.trim().trim_start_matches("0x"))
        .map_err(|e| DeployError::validation(format!("invalid private key: {e}")))?;
    if raw.len() != 32 {
        anyhow::bail!(DeployError::validation(format!(
            "invalid private key: expected 32 bytes, got {}",
            raw.len()
        )));
    }
    k256::SecretKey::from_slice(&raw)
        .map_err(|_| DeployError::validation("invalid private key: not a valid secp256k1 scalar"))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ConfigureOpts {
    pub l1_rpc_url: Url,
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub mnemonic: String,
}

impl ConfigureOpts {
    pub fn check(&self) -> Result<()> {
        check_paths(&self.infile, &self.outfile)?;
        if self.mnemonic.trim().is_empty() {
            anyhow::bail!(DeployError::validation("mnemonic must be specified"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeployOpts {
    pub l1_rpc_url: Url,
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub private_key: String,
    pub backend: BackendConfig,
    /// Interval between bootstrap receipt polls.
    pub poll_interval: Duration,
}

impl DeployOpts {
    pub fn new(l1_rpc_url: Url, infile: PathBuf, private_key: String) -> Self {
        Self {
            l1_rpc_url,
            outfile: infile.clone(),
            infile,
            private_key,
            backend: BackendConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn check(&self) -> Result<()> {
        check_private_key(&self.private_key)?;
        check_paths(&self.infile, &self.outfile)?;
        self.backend.check()
    }
}

#[derive(Debug, Clone)]
pub struct GenesisOpts {
    pub l1_rpc_url: Url,
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub backend: BackendConfig,
    /// Confirm the pinned L1 starting block is still canonical before building.
    pub check_l1_origin: bool,
}

impl GenesisOpts {
    pub fn new(l1_rpc_url: Url, infile: PathBuf) -> Self {
        Self {
            l1_rpc_url,
            outfile: infile.clone(),
            infile,
            backend: BackendConfig::default(),
            check_l1_origin: false,
        }
    }

    pub fn check(&self) -> Result<()> {
        check_paths(&self.infile, &self.outfile)?;
        self.backend.check()
    }
}

/// Derive the deploy config for the intent stored in `opts.infile`.
pub async fn configure(
    opts: &ConfigureOpts,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    Stage::Configure
        .run(async {
            opts.check()?;
            let keygen = MnemonicKeyGenerator::new(opts.mnemonic.as_str())?;
            let l1 = RpcL1Client::new(opts.l1_rpc_url.clone())?;
            configure_state(&l1, &keygen, &opts.infile, &opts.outfile, span, cancel).await
        })
        .await
}

/// [`configure`] with an explicit L1 client and key source.
pub async fn configure_with<L: L1Client, K: KeyGenerator + Sync>(
    l1: &L,
    keygen: &K,
    infile: &Path,
    outfile: &Path,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    Stage::Configure
        .run(configure_state(l1, keygen, infile, outfile, span, cancel))
        .await
}

async fn configure_state<L: L1Client, K: KeyGenerator + Sync>(
    l1: &L,
    keygen: &K,
    infile: &Path,
    outfile: &Path,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    let state = DeploymentState::read(infile)?;

    let config = cancellable(
        cancel,
        Configurator::new(keygen, l1, span.clone()).derive(&state.intent),
    )
    .await?;

    // Artifacts of an earlier config no longer match; start over from the intent.
    let state = DeploymentState {
        deploy_config: Some(config),
        ..DeploymentState::new(state.intent)
    };
    state.write(outfile)?;

    span.in_scope(|| tracing::info!(outfile = %outfile.display(), "Deploy config written"));
    Ok(state)
}

/// Bootstrap the CREATE2 deployer and deploy the L1 contracts.
pub async fn deploy(
    opts: &DeployOpts,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    Stage::Deploy
        .run(async {
            opts.check()?;
            let l1 = RpcL1Client::new(opts.l1_rpc_url.clone())?;
            let backend = Backend::from_config(&opts.backend, span.clone())?;
            deploy_state(&l1, &backend, opts, span, cancel).await
        })
        .await
}

/// [`deploy`] with an explicit L1 client and backend. `opts.backend` is ignored.
pub async fn deploy_with<L: L1Client, B: ExecutionBackend>(
    l1: &L,
    backend: &B,
    opts: &DeployOpts,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    Stage::Deploy
        .run(async {
            check_private_key(&opts.private_key)?;
            check_paths(&opts.infile, &opts.outfile)?;
            deploy_state(l1, backend, opts, span, cancel).await
        })
        .await
}

async fn deploy_state<L: L1Client, B: ExecutionBackend>(
    l1: &L,
    backend: &B,
    opts: &DeployOpts,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    let mut state = DeploymentState::read(&opts.infile)?;
    if state.deploy_config.is_none() {
        anyhow::bail!(DeployError::validation(
            "deploy config not found in state, run configure first"
        ));
    }

    BootstrapChecker::new(l1, span.clone())
        .poll_interval(opts.poll_interval)
        .ensure(cancel)
        .await
        .context("Failed to bootstrap CREATE2 deployer")?;

    let addresses = backend
        .deploy(
            DeployContractsOpts {
                l1_rpc_url: &opts.l1_rpc_url,
                private_key: &opts.private_key,
                state: &state,
            },
            cancel,
        )
        .await?;

    if addresses.is_empty() {
        anyhow::bail!(DeployError::backend(
            "contract toolchain returned no addresses"
        ));
    }

    state.addresses = Some(addresses);
    // Genesis artifacts reference the previous contracts.
    state.genesis_files = None;
    state.rollup_configs = None;
    state.write(&opts.outfile)?;

    span.in_scope(|| tracing::info!(outfile = %opts.outfile.display(), "Addresses written"));
    Ok(state)
}

/// Build the L2 genesis and rollup config for the intent's chain.
pub async fn genesis(
    opts: &GenesisOpts,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    Stage::Genesis
        .run(async {
            opts.check()?;
            let l1 = RpcL1Client::new(opts.l1_rpc_url.clone())?;
            let backend = Backend::from_config(&opts.backend, span.clone())?;
            genesis_state(&l1, &backend, opts, span, cancel).await
        })
        .await
}

/// [`genesis`] with an explicit L1 client and backend. `opts.backend` is ignored.
pub async fn genesis_with<L: L1Client, B: ExecutionBackend>(
    l1: &L,
    backend: &B,
    opts: &GenesisOpts,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    Stage::Genesis
        .run(async {
            check_paths(&opts.infile, &opts.outfile)?;
            genesis_state(l1, backend, opts, span, cancel).await
        })
        .await
}

async fn genesis_state<L: L1Client, B: ExecutionBackend>(
    l1: &L,
    backend: &B,
    opts: &GenesisOpts,
    span: Span,
    cancel: &CancellationToken,
) -> Result<DeploymentState> {
    let mut state = DeploymentState::read(&opts.infile)?;
    let chain_id = state.intent.l2_chain_id;

    let (Some(config), Some(addresses)) = (state.deploy_config.clone(), state.addresses.clone())
    else {
        anyhow::bail!(DeployError::validation(
            "addresses and deploy config must be present in state, run configure and deploy first"
        ));
    };

    let raw_allocs = backend
        .generate_allocs(
            GenerateAllocsOpts {
                l2_chain_id: chain_id,
                state: &state,
            },
            cancel,
        )
        .await?;

    async {
        let allocs = decode_allocs(&raw_allocs)?;
        tracing::info!(chain_id, accounts = allocs.len(), "Decoded L2 allocs");

        let l1_start = cancellable(cancel, l1.block_by_hash(config.l1_starting_block_tag))
            .await
            .context("Failed to get L1 starting block")?;

        if opts.check_l1_origin {
            check_l1_origin(l1, &l1_start, cancel).await?;
        }

        let genesis = build_l2_genesis(&config, allocs, &l1_start)
            .context("Failed to build L2 genesis")?;
        let l2_genesis = BlockId {
            hash: genesis_header(&genesis)?.hash_slow(),
            number: 0,
        };
        tracing::info!(chain_id, l2_hash = %l2_genesis.hash, "Built L2 genesis block");

        let rollup = RollupConfig::derive(&config, &addresses, &l1_start, l2_genesis);
        rollup.check().context("Generated rollup config is invalid")?;

        let blob = compress_genesis(&genesis)?;
        state.insert_genesis(chain_id, blob, rollup);
        state.write(&opts.outfile)?;

        tracing::info!(outfile = %opts.outfile.display(), "Genesis written");
        Ok::<_, anyhow::Error>(state)
    }
    .instrument(span)
    .await
}

/// Make sure `pinned` is still on the canonical L1 chain.
async fn check_l1_origin<L: L1Client>(
    l1: &L,
    pinned: &L1Block,
    cancel: &CancellationToken,
) -> Result<()> {
    let canonical = cancellable(cancel, l1.block_by_number(pinned.number)).await?;

    match canonical {
        Some(block) if block.hash == pinned.hash => {
            tracing::debug!(number = pinned.number, "L1 starting block is canonical");
            Ok(())
        }
        other => {
            let found = other
                .map(|block| block.hash.to_string())
                .unwrap_or_else(|| "no block".to_string());
            Err(anyhow::anyhow!(
                "L1 starting block {} at height {} is no longer canonical, found {}",
                pinned.hash,
                pinned.number,
                found
            ))
            .context(DeployError::Connectivity {
                method: "eth_getBlockByNumber".to_string(),
            })
        }
    }
}
