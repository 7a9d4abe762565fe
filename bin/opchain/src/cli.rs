use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use opchain_deploy::{BackendConfig, backend::DEFAULT_CONTRACTS_IMAGE};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum BackendKind {
    Docker,
    Local,
}

#[derive(Parser)]
#[command(name = "opchain")]
#[command(
    author,
    version,
    about = "Configure, deploy and build the genesis of an OP Stack chain"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(
        short,
        long,
        global = true,
        env = "DEPLOYER_VERBOSITY",
        default_value_t = LevelFilter::INFO
    )]
    pub verbosity: LevelFilter,

    /// Path to a settings file (TOML) providing the L1 RPC URL, the backend and the bootstrap
    /// poll interval. Flags given on the command line win over the file.
    #[arg(long, alias = "conf", global = true, env = "DEPLOYER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a fresh state document from an intent.
    Init(InitArgs),
    /// Derive the deploy config for the intent.
    Configure(ConfigureArgs),
    /// Bootstrap the CREATE2 deployer and deploy the L1 contracts.
    Deploy(DeployArgs),
    /// Build the L2 genesis and rollup config.
    Genesis(GenesisArgs),
    /// Print which stages a state document has completed.
    Inspect(InspectArgs),
}

/// Input and output state documents.
#[derive(Debug, Clone, Args)]
pub struct StateFiles {
    /// State document to read.
    #[arg(long, env = "DEPLOYER_INFILE")]
    pub infile: PathBuf,

    /// State document to write. Defaults to the input file.
    #[arg(long, env = "DEPLOYER_OUTFILE")]
    pub outfile: Option<PathBuf>,
}

impl StateFiles {
    pub fn outfile(&self) -> PathBuf {
        self.outfile.clone().unwrap_or_else(|| self.infile.clone())
    }
}

/// Where and how to run the contract toolchain.
#[derive(Debug, Clone, Default, Args)]
pub struct BackendArgs {
    /// Run the toolchain in a container (`docker`) or from a local checkout (`local`).
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Toolchain image for the docker backend.
    #[arg(long, env = "DEPLOYER_IMAGE")]
    pub image: Option<String>,

    /// Docker network mode of the toolchain container, e.g. `host`.
    #[arg(long, env = "DEPLOYER_NETWORK_MODE")]
    pub network_mode: Option<String>,

    /// Root of the optimism monorepo for the local backend.
    #[arg(long, env = "DEPLOYER_MONOREPO_DIR")]
    pub monorepo_dir: Option<PathBuf>,

    /// forge binary used by the local backend.
    #[arg(long, env = "DEPLOYER_FORGE_BIN")]
    pub forge_bin: Option<PathBuf>,
}

impl BackendArgs {
    /// Merge the flags over the backend from the settings file.
    pub fn resolve(&self, from_settings: Option<BackendConfig>) -> anyhow::Result<BackendConfig> {
        let kind = self.backend.or_else(|| match &from_settings {
            Some(BackendConfig::Local { .. }) => Some(BackendKind::Local),
            Some(BackendConfig::Docker { .. }) => Some(BackendKind::Docker),
            None if self.monorepo_dir.is_some() => Some(BackendKind::Local),
            None => None,
        });

        Ok(match (kind.unwrap_or(BackendKind::Docker), from_settings) {
            (
                BackendKind::Docker,
                Some(BackendConfig::Docker {
                    image,
                    network_mode,
                }),
            ) => BackendConfig::Docker {
                image: self.image.clone().unwrap_or(image),
                network_mode: self.network_mode.clone().or(network_mode),
            },
            (BackendKind::Docker, _) => BackendConfig::Docker {
                image: self
                    .image
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTRACTS_IMAGE.to_string()),
                network_mode: self.network_mode.clone(),
            },
            (
                BackendKind::Local,
                Some(BackendConfig::Local {
                    monorepo_dir,
                    forge_bin,
                }),
            ) => BackendConfig::Local {
                monorepo_dir: self.monorepo_dir.clone().unwrap_or(monorepo_dir),
                forge_bin: self.forge_bin.clone().or(forge_bin),
            },
            (BackendKind::Local, _) => BackendConfig::Local {
                monorepo_dir: self.monorepo_dir.clone().ok_or_else(|| {
                    anyhow::anyhow!("--monorepo-dir is required by the local backend")
                })?,
                forge_bin: self.forge_bin.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct InitArgs {
    /// Where to write the state document.
    #[arg(long, env = "DEPLOYER_OUTFILE")]
    pub outfile: PathBuf,

    /// Chain ID of the L1.
    #[arg(long, alias = "l1", env = "DEPLOYER_L1_CHAIN_ID")]
    pub l1_chain_id: u64,

    /// Chain ID of the L2 to provision.
    #[arg(long, alias = "l2", env = "DEPLOYER_L2_CHAIN_ID")]
    pub l2_chain_id: u64,

    /// Deploy the fault proof contracts.
    #[arg(long)]
    pub fault_proofs: bool,

    /// Use alternative data availability.
    #[arg(long)]
    pub alt_da: bool,

    /// Fund the well-known development accounts at genesis.
    #[arg(long)]
    pub fund_dev_accounts: bool,

    /// Deploy config fields to override, as a JSON object.
    #[arg(long)]
    pub overrides: Option<String>,

    /// Overwrite an existing state document.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub files: StateFiles,

    /// The URL of an L1 RPC endpoint.
    #[arg(long, alias = "l1-rpc", env = "L1_RPC_URL")]
    pub l1_rpc_url: Option<Url>,

    /// Mnemonic every role key is derived from.
    #[arg(long, env = "DEPLOYER_MNEMONIC", hide_env_values = true)]
    pub mnemonic: String,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub files: StateFiles,

    /// The URL of an L1 RPC endpoint.
    #[arg(long, alias = "l1-rpc", env = "L1_RPC_URL")]
    pub l1_rpc_url: Option<Url>,

    /// Hex encoded key of the account paying for the deployment.
    #[arg(long, env = "DEPLOYER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Debug, Clone, Args)]
pub struct GenesisArgs {
    #[command(flatten)]
    pub files: StateFiles,

    /// The URL of an L1 RPC endpoint.
    #[arg(long, alias = "l1-rpc", env = "L1_RPC_URL")]
    pub l1_rpc_url: Option<Url>,

    /// Refuse to build on an L1 starting block that is no longer canonical.
    #[arg(long, env = "DEPLOYER_CHECK_L1_ORIGIN")]
    pub check_l1_origin: bool,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// State document to inspect.
    #[arg(long, env = "DEPLOYER_INFILE")]
    pub infile: PathBuf,
}
