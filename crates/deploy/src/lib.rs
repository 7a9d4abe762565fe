//! opchain-deploy - Provisioning pipeline for OP Stack chains.
//!
//! A deployment runs in three stages over a single JSON state document:
//!
//! 1. [`configure`] derives a validated [`DeployConfig`] from the [`ChainIntent`].
//! 2. [`deploy`] bootstraps the CREATE2 deployer and deploys the L1 contracts.
//! 3. [`genesis`] builds the L2 genesis block and its [`RollupConfig`].

mod addresses;
pub use addresses::Addresses;

pub mod backend;
pub use backend::{Backend, BackendConfig, ExecutionBackend};

mod bootstrap;
pub use bootstrap::{BootstrapChecker, BootstrapOutcome, CREATE2_DEPLOYER_ADDRESS};

mod configurator;
pub use configurator::Configurator;

pub mod deploy_config;
pub use deploy_config::{DeployConfig, Fork};

mod docker;
pub use docker::{DockerImage, extract_from_tar};

mod error;
pub use error::{DeployError, ErrorKind, cancellable, error_kind, is_cancelled};

pub mod genesis;
pub use genesis::RollupConfig;

mod intent;
pub use intent::ChainIntent;

mod keys;
pub use keys::{KeyGenerator, MnemonicKeyGenerator, Role};

mod pipeline;
pub use pipeline::{
    ConfigureOpts, DeployOpts, GenesisOpts, Stage, configure, configure_with, deploy, deploy_with,
    genesis, genesis_with,
};

mod rpc;
pub use rpc::{L1Block, L1Client, RpcL1Client, TxReceipt};

mod state;
pub use state::{Base64Blob, DeploymentState};

#[cfg(test)]
mod test_utils;
