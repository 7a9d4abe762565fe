//! The fully resolved parameter set used to deploy and initialize the contracts.

use alloy_core::primitives::{Address, B256, U256, address, b256};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DeployError;

/// Absolute prestate of the default fault proof program release.
pub const DEFAULT_FAULT_GAME_ABSOLUTE_PRESTATE: B256 =
    b256!("03c7ae758795765c6664a5d39bf63841c71ff191e9189522bad8ebff5d4eca98");

/// 10 ether, the minimum amount a fee vault holds before it can be withdrawn.
pub const DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT: U256 =
    U256::from_limbs([10_000_000_000_000_000_000, 0, 0, 0]);

/// Predeploy that receives the sequencer fees, used as the L2 genesis coinbase.
pub const SEQUENCER_FEE_VAULT: Address = address!("4200000000000000000000000000000000000011");

/// L2 hardforks in activation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Fork {
    Bedrock,
    Regolith,
    Canyon,
    Delta,
    Ecotone,
    Fjord,
    Granite,
    Holocene,
}

/// Where a fee vault sends its balance on withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WithdrawalNetwork {
    #[default]
    Local,
    Remote,
}

/// How alt-DA commitments are posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DaCommitmentType {
    #[default]
    KeccakCommitment,
    GenericCommitment,
}

/// A protocol version in the v0 layout understood by the `ProtocolVersions` contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre_release: u32,
}

impl ProtocolVersion {
    /// The protocol version this deployer targets.
    pub const SUPPORTED: Self = Self {
        major: 8,
        minor: 0,
        patch: 0,
        pre_release: 0,
    };

    /// `<version type (1)> <reserved (7)> <build (8)> <major> <minor> <patch> <pre-release>`,
    /// all integers big-endian.
    pub fn encode(&self) -> B256 {
        let mut out = [0u8; 32];
        out[16..20].copy_from_slice(&self.major.to_be_bytes());
        out[20..24].copy_from_slice(&self.minor.to_be_bytes());
        out[24..28].copy_from_slice(&self.patch.to_be_bytes());
        out[28..32].copy_from_slice(&self.pre_release.to_be_bytes());
        B256::from(out)
    }
}

/// The inbox batches are posted to: `0x42` followed by the chain id, right-aligned.
pub fn batch_inbox_address(l2_chain_id: u64) -> Address {
    let mut addr = [0u8; 20];
    addr[0] = 0x42;
    addr[12..].copy_from_slice(&l2_chain_id.to_be_bytes());
    Address::from(addr)
}

/// The deployment configuration, serialized with the field names the contract toolchain expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployConfig {
    // Core chain parameters.
    #[serde(rename = "l1ChainID")]
    pub l1_chain_id: u64,
    #[serde(rename = "l2ChainID")]
    pub l2_chain_id: u64,
    pub l2_block_time: u64,
    pub max_sequencer_drift: u64,
    pub sequencer_window_size: u64,
    #[serde(rename = "channelTimeout")]
    pub channel_timeout_bedrock: u64,
    pub finalization_period_seconds: u64,
    pub batch_inbox_address: Address,
    pub batch_sender_address: Address,
    pub p2p_sequencer_address: Address,
    pub system_config_start_block: u64,
    /// Hash of the L1 block the rollup starts from, pinned when the config is derived.
    pub l1_starting_block_tag: B256,

    // L2 genesis block.
    pub l2_genesis_block_gas_limit: u64,
    pub l2_genesis_block_base_fee_per_gas: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_genesis_regolith_time_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_genesis_canyon_time_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_genesis_delta_time_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_genesis_ecotone_time_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_genesis_fjord_time_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_genesis_granite_time_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_genesis_holocene_time_offset: Option<u64>,

    // Ownership.
    pub proxy_admin_owner: Address,
    pub final_system_owner: Address,
    pub superchain_config_guardian: Address,
    pub required_protocol_version: B256,
    pub recommended_protocol_version: B256,

    // Fee vaults.
    pub base_fee_vault_recipient: Address,
    pub l1_fee_vault_recipient: Address,
    pub sequencer_fee_vault_recipient: Address,
    pub base_fee_vault_minimum_withdrawal_amount: U256,
    pub l1_fee_vault_minimum_withdrawal_amount: U256,
    pub sequencer_fee_vault_minimum_withdrawal_amount: U256,
    pub base_fee_vault_withdrawal_network: WithdrawalNetwork,
    pub l1_fee_vault_withdrawal_network: WithdrawalNetwork,
    pub sequencer_fee_vault_withdrawal_network: WithdrawalNetwork,

    // Governance token.
    pub enable_governance: bool,
    pub governance_token_symbol: String,
    pub governance_token_name: String,
    pub governance_token_owner: Address,

    // Fees.
    pub gas_price_oracle_base_fee_scalar: u32,
    pub gas_price_oracle_blob_base_fee_scalar: u32,
    /// Pre-Ecotone L1 fee parameters.
    #[serde(default)]
    pub gas_price_oracle_overhead: u64,
    #[serde(default)]
    pub gas_price_oracle_scalar: u64,
    #[serde(rename = "eip1559Denominator")]
    pub eip1559_denominator: u64,
    #[serde(rename = "eip1559DenominatorCanyon")]
    pub eip1559_denominator_canyon: u64,
    #[serde(rename = "eip1559Elasticity")]
    pub eip1559_elasticity: u64,

    // Output oracle.
    pub l2_output_oracle_submission_interval: u64,
    pub l2_output_oracle_starting_block_number: u64,
    pub l2_output_oracle_starting_timestamp: u64,
    pub l2_output_oracle_proposer: Address,
    pub l2_output_oracle_challenger: Address,

    #[serde(default)]
    pub fund_dev_accounts: bool,

    // Fault proofs, only meaningful when `use_fault_proofs` is set.
    #[serde(default)]
    pub use_fault_proofs: bool,
    #[serde(default)]
    pub fault_game_absolute_prestate: B256,
    #[serde(default)]
    pub fault_game_max_depth: u64,
    #[serde(default)]
    pub fault_game_clock_extension: u64,
    #[serde(default)]
    pub fault_game_max_clock_duration: u64,
    #[serde(default)]
    pub fault_game_genesis_block: u64,
    #[serde(default)]
    pub fault_game_genesis_output_root: B256,
    #[serde(default)]
    pub fault_game_split_depth: u64,
    #[serde(default)]
    pub fault_game_withdrawal_delay: u64,
    #[serde(default)]
    pub preimage_oracle_min_proposal_size: u64,
    #[serde(default)]
    pub preimage_oracle_challenge_period: u64,

    // Alt-DA, only meaningful when `use_alt_da` is set.
    #[serde(rename = "useAltDA", default)]
    pub use_alt_da: bool,
    #[serde(rename = "daCommitmentType", default)]
    pub da_commitment_type: DaCommitmentType,
    #[serde(rename = "daChallengeWindow", default)]
    pub da_challenge_window: u64,
    #[serde(rename = "daResolveWindow", default)]
    pub da_resolve_window: u64,
    #[serde(rename = "daBondSize", default)]
    pub da_bond_size: u64,
    #[serde(rename = "daResolverRefundPercentage", default)]
    pub da_resolver_refund_percentage: u64,
}

impl DeployConfig {
    /// Activation offset of `fork` relative to genesis. Bedrock is always active.
    pub fn fork_offset(&self, fork: Fork) -> Option<u64> {
        match fork {
            Fork::Bedrock => Some(0),
            Fork::Regolith => self.l2_genesis_regolith_time_offset,
            Fork::Canyon => self.l2_genesis_canyon_time_offset,
            Fork::Delta => self.l2_genesis_delta_time_offset,
            Fork::Ecotone => self.l2_genesis_ecotone_time_offset,
            Fork::Fjord => self.l2_genesis_fjord_time_offset,
            Fork::Granite => self.l2_genesis_granite_time_offset,
            Fork::Holocene => self.l2_genesis_holocene_time_offset,
        }
    }

    /// Absolute activation time of `fork` for a chain starting at `genesis_time`.
    pub fn fork_time(&self, fork: Fork, genesis_time: u64) -> Option<u64> {
        self.fork_offset(fork)
            .map(|offset| genesis_time.saturating_add(offset))
    }

    pub fn is_active_at_genesis(&self, fork: Fork) -> bool {
        self.fork_offset(fork) == Some(0)
    }

    /// The most recent fork active from the genesis block.
    pub fn latest_genesis_fork(&self) -> Fork {
        <Fork as strum::IntoEnumIterator>::iter()
            .filter(|fork| self.is_active_at_genesis(*fork))
            .last()
            .unwrap_or(Fork::Bedrock)
    }

    /// Merge raw JSON overrides into the config. Overrides win; unknown keys are rejected.
    pub fn apply_overrides(&self, overrides: &Map<String, Value>) -> anyhow::Result<Self> {
        let Value::Object(mut doc) =
            serde_json::to_value(self).context("Failed to encode deploy config")?
        else {
            anyhow::bail!("deploy config did not encode to an object");
        };

        doc.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        serde_json::from_value(Value::Object(doc)).map_err(|e| {
            anyhow::Error::new(DeployError::validation(format!(
                "invalid deploy config override: {e}"
            )))
        })
    }

    /// Self-consistency checks. The first violation is returned.
    pub fn check(&self) -> anyhow::Result<()> {
        let invalid =
            |msg: &str| -> anyhow::Result<()> { Err(DeployError::validation(msg).into()) };

        if self.l1_chain_id == 0 {
            return invalid("l1ChainID must be non-zero");
        }
        if self.l2_chain_id == 0 {
            return invalid("l2ChainID must be non-zero");
        }
        if self.l1_chain_id == self.l2_chain_id {
            return invalid("l1ChainID and l2ChainID must differ");
        }
        if self.l1_starting_block_tag.is_zero() {
            return invalid("l1StartingBlockTag must be set");
        }
        if self.l2_block_time == 0 {
            return invalid("l2BlockTime must be non-zero");
        }
        if self.finalization_period_seconds == 0 {
            return invalid("finalizationPeriodSeconds must be non-zero");
        }
        if self.max_sequencer_drift == 0 {
            return invalid("maxSequencerDrift must be non-zero");
        }
        if self.sequencer_window_size == 0 {
            return invalid("sequencerWindowSize must be non-zero");
        }
        if self.channel_timeout_bedrock == 0 {
            return invalid("channelTimeout must be non-zero");
        }
        if self.l2_output_oracle_submission_interval == 0 {
            return invalid("l2OutputOracleSubmissionInterval must be non-zero");
        }
        if self.l2_genesis_block_gas_limit == 0 {
            return invalid("l2GenesisBlockGasLimit must be non-zero");
        }
        if self.l2_genesis_block_base_fee_per_gas.is_zero() {
            return invalid("l2GenesisBlockBaseFeePerGas must be non-zero");
        }
        if self.l2_genesis_block_base_fee_per_gas > U256::from(u64::MAX) {
            return invalid("l2GenesisBlockBaseFeePerGas must fit in 64 bits");
        }
        if self.eip1559_denominator == 0 || self.eip1559_elasticity == 0 {
            return invalid("eip1559Denominator and eip1559Elasticity must be non-zero");
        }
        if self.fork_offset(Fork::Canyon).is_some() && self.eip1559_denominator_canyon == 0 {
            return invalid("eip1559DenominatorCanyon must be non-zero when canyon is scheduled");
        }

        let required_addresses = [
            ("batchInboxAddress", self.batch_inbox_address),
            ("batchSenderAddress", self.batch_sender_address),
            ("p2pSequencerAddress", self.p2p_sequencer_address),
            ("proxyAdminOwner", self.proxy_admin_owner),
            ("finalSystemOwner", self.final_system_owner),
            ("superchainConfigGuardian", self.superchain_config_guardian),
            ("baseFeeVaultRecipient", self.base_fee_vault_recipient),
            ("l1FeeVaultRecipient", self.l1_fee_vault_recipient),
            ("sequencerFeeVaultRecipient", self.sequencer_fee_vault_recipient),
            ("l2OutputOracleProposer", self.l2_output_oracle_proposer),
            ("l2OutputOracleChallenger", self.l2_output_oracle_challenger),
        ];
        if let Some((name, _)) = required_addresses.iter().find(|(_, a)| a.is_zero()) {
            return Err(DeployError::validation(format!("{name} must be set")).into());
        }

        if self.enable_governance
            && (self.governance_token_symbol.is_empty()
                || self.governance_token_name.is_empty()
                || self.governance_token_owner.is_zero())
        {
            return invalid("governance token symbol, name and owner must be set");
        }

        self.check_fork_order()?;

        if self.use_fault_proofs && self.use_alt_da {
            return invalid("cannot use both fault proofs and alt-DA");
        }

        if self.use_fault_proofs {
            if self.fault_game_absolute_prestate.is_zero() {
                return invalid("faultGameAbsolutePrestate must be set");
            }
            if self.fault_game_max_depth == 0 || self.fault_game_max_clock_duration == 0 {
                return invalid("faultGameMaxDepth and faultGameMaxClockDuration must be non-zero");
            }
            if self.fault_game_split_depth >= self.fault_game_max_depth {
                return invalid("faultGameSplitDepth must be below faultGameMaxDepth");
            }
            if self.fault_game_clock_extension > self.fault_game_max_clock_duration {
                return invalid("faultGameClockExtension must not exceed faultGameMaxClockDuration");
            }
        }

        if self.use_alt_da
            && self.da_commitment_type == DaCommitmentType::KeccakCommitment
            && (self.da_challenge_window == 0 || self.da_resolve_window == 0)
        {
            return invalid("daChallengeWindow and daResolveWindow must be non-zero");
        }

        if self.da_resolver_refund_percentage > 100 {
            return invalid("daResolverRefundPercentage must be at most 100");
        }

        Ok(())
    }

    /// Scheduled forks must activate in order, and a fork needs every earlier fork scheduled.
    fn check_fork_order(&self) -> anyhow::Result<()> {
        let mut previous: Option<(Fork, Option<u64>)> = None;

        for fork in <Fork as strum::IntoEnumIterator>::iter() {
            let offset = self.fork_offset(fork);

            if let Some((prev_fork, prev_offset)) = previous {
                match (prev_offset, offset) {
                    (None, Some(_)) => anyhow::bail!(DeployError::validation(format!(
                        "{fork} is scheduled but {prev_fork} is not"
                    ))),
                    (Some(prev), Some(cur)) if cur < prev => {
                        anyhow::bail!(DeployError::validation(format!(
                            "{fork} activates before {prev_fork}"
                        )))
                    }
                    _ => {}
                }
            }

            previous = Some((fork, offset));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{ErrorKind, error_kind};

    /// A config with every field valid, used across the crate's tests.
    pub(crate) fn sample_config() -> DeployConfig {
        let addr = |b: u8| Address::repeat_byte(b);

        DeployConfig {
            l1_chain_id: 1,
            l2_chain_id: 42,
            l2_block_time: 2,
            max_sequencer_drift: 600,
            sequencer_window_size: 3600,
            channel_timeout_bedrock: 300,
            finalization_period_seconds: 12,
            batch_inbox_address: batch_inbox_address(42),
            batch_sender_address: addr(1),
            p2p_sequencer_address: addr(2),
            system_config_start_block: 0,
            l1_starting_block_tag: B256::repeat_byte(0xaa),
            l2_genesis_block_gas_limit: 30_000_000,
            l2_genesis_block_base_fee_per_gas: U256::from(1_000_000_000u64),
            l2_genesis_regolith_time_offset: Some(0),
            l2_genesis_canyon_time_offset: Some(0),
            l2_genesis_delta_time_offset: Some(0),
            l2_genesis_ecotone_time_offset: Some(0),
            l2_genesis_fjord_time_offset: Some(0),
            l2_genesis_granite_time_offset: Some(0),
            l2_genesis_holocene_time_offset: None,
            proxy_admin_owner: addr(3),
            final_system_owner: addr(4),
            superchain_config_guardian: addr(5),
            required_protocol_version: ProtocolVersion::SUPPORTED.encode(),
            recommended_protocol_version: ProtocolVersion::SUPPORTED.encode(),
            base_fee_vault_recipient: addr(6),
            l1_fee_vault_recipient: addr(7),
            sequencer_fee_vault_recipient: addr(8),
            base_fee_vault_minimum_withdrawal_amount: DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT,
            l1_fee_vault_minimum_withdrawal_amount: DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT,
            sequencer_fee_vault_minimum_withdrawal_amount: DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT,
            base_fee_vault_withdrawal_network: WithdrawalNetwork::Local,
            l1_fee_vault_withdrawal_network: WithdrawalNetwork::Local,
            sequencer_fee_vault_withdrawal_network: WithdrawalNetwork::Local,
            enable_governance: true,
            governance_token_symbol: "OP".to_string(),
            governance_token_name: "Optimism".to_string(),
            governance_token_owner: addr(3),
            gas_price_oracle_base_fee_scalar: 0,
            gas_price_oracle_blob_base_fee_scalar: 1_000_000,
            gas_price_oracle_overhead: 0,
            gas_price_oracle_scalar: 0,
            eip1559_denominator: 50,
            eip1559_denominator_canyon: 250,
            eip1559_elasticity: 6,
            l2_output_oracle_submission_interval: 10,
            l2_output_oracle_starting_block_number: 0,
            l2_output_oracle_starting_timestamp: 0,
            l2_output_oracle_proposer: addr(9),
            l2_output_oracle_challenger: addr(10),
            fund_dev_accounts: false,
            use_fault_proofs: false,
            fault_game_absolute_prestate: B256::ZERO,
            fault_game_max_depth: 0,
            fault_game_clock_extension: 0,
            fault_game_max_clock_duration: 0,
            fault_game_genesis_block: 0,
            fault_game_genesis_output_root: B256::ZERO,
            fault_game_split_depth: 0,
            fault_game_withdrawal_delay: 0,
            preimage_oracle_min_proposal_size: 0,
            preimage_oracle_challenge_period: 0,
            use_alt_da: false,
            da_commitment_type: DaCommitmentType::KeccakCommitment,
            da_challenge_window: 0,
            da_resolve_window: 0,
            da_bond_size: 0,
            da_resolver_refund_percentage: 0,
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        sample_config().check().expect("sample config should pass");
    }

    #[test]
    fn test_batch_inbox_address() {
        assert_eq!(
            batch_inbox_address(42),
            address!("420000000000000000000000000000000000002a")
        );
        assert_eq!(
            batch_inbox_address(11155420),
            address!("4200000000000000000000000000000000aa37dc")
        );
    }

    #[test]
    fn test_overrides_replace_only_named_fields() {
        let base = sample_config();
        let overrides = serde_json::json!({
            "l2BlockTime": 1,
            "governanceTokenSymbol": "TKN"
        });
        let Value::Object(overrides) = overrides else {
            unreachable!()
        };

        let merged = base.apply_overrides(&overrides).expect("Failed to apply overrides");

        let expected = DeployConfig {
            l2_block_time: 1,
            governance_token_symbol: "TKN".to_string(),
            ..base
        };
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_overrides_reject_unknown_keys() {
        let Value::Object(overrides) = serde_json::json!({ "l2BlockTimez": 1 }) else {
            unreachable!()
        };

        let err = sample_config().apply_overrides(&overrides).unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::Validation);
        assert!(err.to_string().contains("l2BlockTimez"));
    }

    #[test]
    fn test_check_rejects_zero_block_time() {
        let config = DeployConfig {
            l2_block_time: 0,
            ..sample_config()
        };
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("l2BlockTime"));
    }

    #[test]
    fn test_check_rejects_oversized_base_fee() {
        let config = DeployConfig {
            l2_genesis_block_base_fee_per_gas: U256::from(u64::MAX) + U256::from(8),
            ..sample_config()
        };
        let err = config.check().unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::Validation);
        assert!(err.to_string().contains("l2GenesisBlockBaseFeePerGas"));

        DeployConfig {
            l2_genesis_block_base_fee_per_gas: U256::from(u64::MAX),
            ..sample_config()
        }
        .check()
        .expect("u64::MAX base fee is valid");
    }

    #[test]
    fn test_check_rejects_missing_role_address() {
        let config = DeployConfig {
            batch_sender_address: Address::ZERO,
            ..sample_config()
        };
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("batchSenderAddress"));
    }

    #[test]
    fn test_check_rejects_out_of_order_forks() {
        let config = DeployConfig {
            l2_genesis_holocene_time_offset: Some(10),
            l2_genesis_granite_time_offset: Some(20),
            ..sample_config()
        };
        assert!(config.check().is_err());

        let config = DeployConfig {
            l2_genesis_delta_time_offset: None,
            ..sample_config()
        };
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("delta is not"));
    }

    #[test]
    fn test_check_fault_proof_depths() {
        let config = DeployConfig {
            use_fault_proofs: true,
            fault_game_absolute_prestate: DEFAULT_FAULT_GAME_ABSOLUTE_PRESTATE,
            fault_game_max_depth: 14,
            fault_game_split_depth: 14,
            fault_game_max_clock_duration: 1200,
            ..sample_config()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_latest_genesis_fork() {
        assert_eq!(sample_config().latest_genesis_fork(), Fork::Granite);

        let config = DeployConfig {
            l2_genesis_holocene_time_offset: Some(0),
            ..sample_config()
        };
        assert_eq!(config.latest_genesis_fork(), Fork::Holocene);
    }

    #[test]
    fn test_protocol_version_encoding() {
        let encoded = ProtocolVersion {
            major: 3,
            minor: 2,
            patch: 1,
            pre_release: 0,
        }
        .encode();

        assert_eq!(encoded[0], 0);
        assert_eq!(&encoded[16..20], &[0, 0, 0, 3]);
        assert_eq!(&encoded[20..24], &[0, 0, 0, 2]);
        assert_eq!(&encoded[24..28], &[0, 0, 0, 1]);
    }

    #[test]
    fn test_json_uses_toolchain_field_names() {
        let json = serde_json::to_value(sample_config()).expect("Failed to encode");
        assert_eq!(json["l2ChainID"], 42);
        assert_eq!(json["channelTimeout"], 300);
        assert_eq!(json["eip1559DenominatorCanyon"], 250);
        assert_eq!(json["baseFeeVaultWithdrawalNetwork"], "local");
        assert_eq!(json["daCommitmentType"], "KeccakCommitment");
        assert!(json.get("l2GenesisHoloceneTimeOffset").is_none());
    }
}
