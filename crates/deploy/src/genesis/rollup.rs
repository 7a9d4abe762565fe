//! Rollup node configuration.

use alloy_core::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    Addresses, DeployError, L1Block,
    deploy_config::{DaCommitmentType, DeployConfig, Fork},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockId {
    pub hash: B256,
    pub number: u64,
}

/// Initial system config values. The genesis block carries no transactions so they live here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSystemConfig {
    pub batcher_addr: Address,
    pub overhead: B256,
    pub scalar: B256,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupGenesis {
    pub l1: BlockId,
    pub l2: BlockId,
    pub l2_time: u64,
    pub system_config: GenesisSystemConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltDaConfig {
    pub da_challenge_contract_address: Address,
    pub da_commitment_type: DaCommitmentType,
    pub da_challenge_window: u64,
    pub da_resolve_window: u64,
}

/// The configuration a rollup node needs to follow the chain, in the op-node JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupConfig {
    pub genesis: RollupGenesis,
    pub block_time: u64,
    pub max_sequencer_drift: u64,
    pub seq_window_size: u64,
    pub channel_timeout: u64,
    pub l1_chain_id: u64,
    pub l2_chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regolith_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canyon_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecotone_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fjord_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granite_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holocene_time: Option<u64>,
    pub batch_inbox_address: Address,
    pub deposit_contract_address: Address,
    pub l1_system_config_address: Address,
    pub protocol_versions_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_da: Option<AltDaConfig>,
}

/// Ecotone (version 1) scalar layout: `0x01 ++ [0; 23] ++ blob_base_fee_scalar ++ base_fee_scalar`.
pub fn ecotone_scalar(base_fee_scalar: u32, blob_base_fee_scalar: u32) -> B256 {
    let mut out = [0u8; 32];
    out[0] = 1;
    out[24..28].copy_from_slice(&blob_base_fee_scalar.to_be_bytes());
    out[28..32].copy_from_slice(&base_fee_scalar.to_be_bytes());
    B256::from(out)
}

impl RollupConfig {
    /// Assemble the rollup config for a chain whose genesis block is `l2_genesis`.
    pub fn derive(
        config: &DeployConfig,
        addresses: &Addresses,
        l1_start: &L1Block,
        l2_genesis: BlockId,
    ) -> Self {
        let genesis_time = l1_start.timestamp;
        let scalar = if config.is_active_at_genesis(Fork::Ecotone) {
            ecotone_scalar(
                config.gas_price_oracle_base_fee_scalar,
                config.gas_price_oracle_blob_base_fee_scalar,
            )
        } else {
            B256::from(U256::from(config.gas_price_oracle_scalar))
        };

        let alt_da = config.use_alt_da.then(|| AltDaConfig {
            da_challenge_contract_address: addresses
                .data_availability_challenge_proxy
                .unwrap_or_default(),
            da_commitment_type: config.da_commitment_type,
            da_challenge_window: config.da_challenge_window,
            da_resolve_window: config.da_resolve_window,
        });

        Self {
            genesis: RollupGenesis {
                l1: BlockId {
                    hash: l1_start.hash,
                    number: l1_start.number,
                },
                l2: l2_genesis,
                l2_time: genesis_time,
                system_config: GenesisSystemConfig {
                    batcher_addr: config.batch_sender_address,
                    overhead: B256::from(U256::from(config.gas_price_oracle_overhead)),
                    scalar,
                    gas_limit: config.l2_genesis_block_gas_limit,
                },
            },
            block_time: config.l2_block_time,
            max_sequencer_drift: config.max_sequencer_drift,
            seq_window_size: config.sequencer_window_size,
            channel_timeout: config.channel_timeout_bedrock,
            l1_chain_id: config.l1_chain_id,
            l2_chain_id: config.l2_chain_id,
            regolith_time: config.fork_time(Fork::Regolith, genesis_time),
            canyon_time: config.fork_time(Fork::Canyon, genesis_time),
            delta_time: config.fork_time(Fork::Delta, genesis_time),
            ecotone_time: config.fork_time(Fork::Ecotone, genesis_time),
            fjord_time: config.fork_time(Fork::Fjord, genesis_time),
            granite_time: config.fork_time(Fork::Granite, genesis_time),
            holocene_time: config.fork_time(Fork::Holocene, genesis_time),
            batch_inbox_address: config.batch_inbox_address,
            deposit_contract_address: addresses.optimism_portal_proxy,
            l1_system_config_address: addresses.system_config_proxy,
            protocol_versions_address: addresses.protocol_versions_proxy,
            alt_da,
        }
    }

    /// Structural validation, the same checks a rollup node runs at startup.
    pub fn check(&self) -> anyhow::Result<()> {
        let invalid =
            |msg: &str| -> anyhow::Result<()> { Err(DeployError::validation(msg).into()) };

        if self.block_time == 0 {
            return invalid("block time cannot be 0");
        }
        if self.channel_timeout == 0 {
            return invalid("channel timeout must be set");
        }
        if self.seq_window_size < 2 {
            return invalid("sequencing window size must be at least 2");
        }
        if self.max_sequencer_drift == 0 {
            return invalid("max sequencer drift must be set");
        }
        if self.genesis.l1.hash.is_zero() {
            return invalid("genesis L1 hash cannot be empty");
        }
        if self.genesis.l2.hash.is_zero() {
            return invalid("genesis L2 hash cannot be empty");
        }
        if self.genesis.l2.hash == self.genesis.l1.hash {
            return invalid("L1 and L2 genesis hashes must differ");
        }
        if self.genesis.system_config.gas_limit == 0 {
            return invalid("missing genesis system config gas limit");
        }
        if self.batch_inbox_address.is_zero() {
            return invalid("missing batch inbox address");
        }
        if self.deposit_contract_address.is_zero() {
            return invalid("missing deposit contract address");
        }
        if self.l1_system_config_address.is_zero() {
            return invalid("missing L1 system config address");
        }
        if self.l1_chain_id == 0 {
            return invalid("L1 chain ID must not be 0");
        }
        if self.l2_chain_id == 0 {
            return invalid("L2 chain ID must not be 0");
        }
        if self.l1_chain_id == self.l2_chain_id {
            return invalid("L1 and L2 chain IDs must be different");
        }

        let forks = [
            ("regolith", self.regolith_time),
            ("canyon", self.canyon_time),
            ("delta", self.delta_time),
            ("ecotone", self.ecotone_time),
            ("fjord", self.fjord_time),
            ("granite", self.granite_time),
            ("holocene", self.holocene_time),
        ];
        for pair in forks.windows(2) {
            let [(prev_name, prev), (name, cur)] = pair else {
                continue;
            };
            match (prev, cur) {
                (None, Some(_)) => {
                    anyhow::bail!(DeployError::validation(format!(
                        "fork {name} set but prior fork {prev_name} not set"
                    )))
                }
                (Some(prev), Some(cur)) if cur < prev => {
                    anyhow::bail!(DeployError::validation(format!(
                        "fork {name} set to {cur} but prior fork {prev_name} has higher offset {prev}"
                    )))
                }
                _ => {}
            }
        }

        if let Some(alt_da) = &self.alt_da {
            if alt_da.da_challenge_contract_address.is_zero() {
                return invalid("alt-DA challenge contract address must be set");
            }
            if alt_da.da_commitment_type == DaCommitmentType::KeccakCommitment
                && (alt_da.da_challenge_window == 0 || alt_da.da_resolve_window == 0)
            {
                return invalid("alt-DA challenge and resolve windows must be set");
            }
        }

        Ok(())
    }
}
