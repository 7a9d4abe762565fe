//! Derives a complete [`DeployConfig`] from a [`ChainIntent`].

use alloy_core::primitives::{Address, U256};
use anyhow::Context;
use tracing::{Instrument, Span};

use crate::{
    ChainIntent, DeployError, L1Client,
    deploy_config::{
        DEFAULT_FAULT_GAME_ABSOLUTE_PRESTATE, DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT,
        DaCommitmentType, DeployConfig, ProtocolVersion, WithdrawalNetwork, batch_inbox_address,
    },
    keys::{KeyGenerator, Role},
};

/// Resolves role addresses, remembering the first failure instead of stopping on it.
struct RoleResolver<'a, K> {
    keygen: &'a K,
    l1_chain_id: u64,
    l2_chain_id: u64,
    first_err: Option<(Role, anyhow::Error)>,
    failures: usize,
}

impl<'a, K: KeyGenerator> RoleResolver<'a, K> {
    fn new(keygen: &'a K, intent: &ChainIntent) -> Self {
        Self {
            keygen,
            l1_chain_id: intent.l1_chain_id,
            l2_chain_id: intent.l2_chain_id,
            first_err: None,
            failures: 0,
        }
    }

    fn addr(&mut self, role: Role) -> Address {
        let chain_id = if role.is_superchain() {
            self.l1_chain_id
        } else {
            self.l2_chain_id
        };

        match self.keygen.address(role, chain_id) {
            Ok(addr) => addr,
            Err(e) => {
                self.failures += 1;
                self.first_err.get_or_insert((role, e));
                Address::ZERO
            }
        }
    }

    fn finish(self) -> anyhow::Result<()> {
        match self.first_err {
            None => Ok(()),
            Some((role, err)) => Err(DeployError::Derivation {
                role: role.to_string(),
                reason: format!("{err:#}"),
                failures: self.failures,
            }
            .into()),
        }
    }
}

/// Builds deploy configs from intents.
pub struct Configurator<'a, K, L> {
    keygen: &'a K,
    l1: &'a L,
    span: Span,
}

impl<'a, K: KeyGenerator + Sync, L: L1Client> Configurator<'a, K, L> {
    pub fn new(keygen: &'a K, l1: &'a L, span: Span) -> Self {
        Self { keygen, l1, span }
    }

    /// Derive and validate the deploy config. Nothing is returned unless every step succeeded.
    pub async fn derive(&self, intent: &ChainIntent) -> anyhow::Result<DeployConfig> {
        self.derive_inner(intent).instrument(self.span.clone()).await
    }

    async fn derive_inner(&self, intent: &ChainIntent) -> anyhow::Result<DeployConfig> {
        intent.check().context("Invalid chain intent")?;

        let head = self
            .l1
            .latest_block()
            .await
            .context("Failed to get L1 starting block")?;
        tracing::info!(
            l1_block = head.number,
            l1_hash = %head.hash,
            "Pinned L1 starting block"
        );

        let mut roles = RoleResolver::new(self.keygen, intent);

        let mut config = DeployConfig {
            l1_chain_id: intent.l1_chain_id,
            l2_chain_id: intent.l2_chain_id,
            l2_block_time: 2,
            max_sequencer_drift: 600,
            sequencer_window_size: 3600,
            channel_timeout_bedrock: 300,
            finalization_period_seconds: 12,
            batch_inbox_address: batch_inbox_address(intent.l2_chain_id),
            batch_sender_address: roles.addr(Role::Batcher),
            p2p_sequencer_address: roles.addr(Role::SequencerP2P),
            system_config_start_block: 0,
            l1_starting_block_tag: head.hash,

            l2_genesis_block_gas_limit: 30_000_000,
            l2_genesis_block_base_fee_per_gas: U256::from(1_000_000_000u64),
            l2_genesis_regolith_time_offset: Some(0),
            l2_genesis_canyon_time_offset: Some(0),
            l2_genesis_delta_time_offset: Some(0),
            l2_genesis_ecotone_time_offset: Some(0),
            l2_genesis_fjord_time_offset: Some(0),
            l2_genesis_granite_time_offset: Some(0),
            l2_genesis_holocene_time_offset: None,

            proxy_admin_owner: roles.addr(Role::L2ProxyAdminOwner),
            final_system_owner: roles.addr(Role::L1ProxyAdminOwner),
            superchain_config_guardian: roles.addr(Role::SuperchainGuardian),
            required_protocol_version: ProtocolVersion::SUPPORTED.encode(),
            recommended_protocol_version: ProtocolVersion::SUPPORTED.encode(),

            base_fee_vault_recipient: roles.addr(Role::BaseFeeVaultRecipient),
            l1_fee_vault_recipient: roles.addr(Role::L1FeeVaultRecipient),
            sequencer_fee_vault_recipient: roles.addr(Role::SequencerFeeVaultRecipient),
            base_fee_vault_minimum_withdrawal_amount: DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT,
            l1_fee_vault_minimum_withdrawal_amount: DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT,
            sequencer_fee_vault_minimum_withdrawal_amount: DEFAULT_VAULT_MINIMUM_WITHDRAWAL_AMOUNT,
            base_fee_vault_withdrawal_network: WithdrawalNetwork::Local,
            l1_fee_vault_withdrawal_network: WithdrawalNetwork::Local,
            sequencer_fee_vault_withdrawal_network: WithdrawalNetwork::Local,

            enable_governance: true,
            governance_token_symbol: "OP".to_string(),
            governance_token_name: "Optimism".to_string(),
            governance_token_owner: roles.addr(Role::L2ProxyAdminOwner),

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
            l2_output_oracle_proposer: roles.addr(Role::Proposer),
            l2_output_oracle_challenger: roles.addr(Role::Challenger),

            fund_dev_accounts: intent.fund_dev_accounts,

            use_fault_proofs: false,
            fault_game_absolute_prestate: Default::default(),
            fault_game_max_depth: 0,
            fault_game_clock_extension: 0,
            fault_game_max_clock_duration: 0,
            fault_game_genesis_block: 0,
            fault_game_genesis_output_root: Default::default(),
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
        };

        if intent.use_fault_proofs {
            config.use_fault_proofs = true;
            config.fault_game_absolute_prestate = DEFAULT_FAULT_GAME_ABSOLUTE_PRESTATE;
            config.fault_game_max_depth = 44;
            config.fault_game_clock_extension = 0;
            config.fault_game_max_clock_duration = 1200;
            config.fault_game_split_depth = 14;
            config.fault_game_withdrawal_delay = 600;
            config.preimage_oracle_min_proposal_size = 1_800_000;
            config.preimage_oracle_challenge_period = 300;
        }

        if intent.use_alt_da {
            config.use_alt_da = true;
            config.da_challenge_window = 140;
            config.da_resolve_window = 160;
            config.da_bond_size = 1_000_000;
            config.da_resolver_refund_percentage = 0;
        }

        roles.finish()?;

        if let Some(overrides) = &intent.overrides {
            tracing::debug!(keys = overrides.len(), "Applying deploy config overrides");
            config = config
                .apply_overrides(overrides)
                .context("Failed to apply overrides")?;
        }

        if config.l1_chain_id != intent.l1_chain_id || config.l2_chain_id != intent.l2_chain_id {
            anyhow::bail!(DeployError::validation(format!(
                "overrides cannot change chain ids (intent {}/{}, config {}/{})",
                intent.l1_chain_id, intent.l2_chain_id, config.l1_chain_id, config.l2_chain_id
            )));
        }

        config
            .check()
            .context("Deploy config failed validation")?;

        Ok(config)
    }
}
