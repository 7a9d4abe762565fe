//! Deterministic role keys derived from a single mnemonic.

use alloy_core::primitives::{Address, B256};
use alloy_signer_local::{LocalSignerError, MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use anyhow::Context;

/// A responsibility that gets its own key.
///
/// Chain operator roles are namespaced by the rollup chain id, superchain roles by the L1 chain
/// id (they are shared by every rollup settling on that L1).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Role {
    Deployer,
    Proposer,
    Batcher,
    SequencerP2P,
    Challenger,
    L2ProxyAdminOwner,
    L1ProxyAdminOwner,
    BaseFeeVaultRecipient,
    L1FeeVaultRecipient,
    SequencerFeeVaultRecipient,
    SystemConfigOwner,
    SuperchainDeployer,
    SuperchainProxyAdminOwner,
    SuperchainProtocolVersionsOwner,
    SuperchainGuardian,
}

impl Role {
    /// Whether the role belongs to the shared superchain rather than a single rollup.
    pub const fn is_superchain(&self) -> bool {
        matches!(
            self,
            Role::SuperchainDeployer
                | Role::SuperchainProxyAdminOwner
                | Role::SuperchainProtocolVersionsOwner
                | Role::SuperchainGuardian
        )
    }

    const fn index(&self) -> u64 {
        match self {
            Role::Deployer | Role::SuperchainDeployer => 0,
            Role::Proposer | Role::SuperchainProxyAdminOwner => 1,
            Role::Batcher | Role::SuperchainProtocolVersionsOwner => 2,
            Role::SequencerP2P | Role::SuperchainGuardian => 3,
            Role::Challenger => 4,
            Role::L2ProxyAdminOwner => 5,
            Role::L1ProxyAdminOwner => 6,
            Role::BaseFeeVaultRecipient => 7,
            Role::L1FeeVaultRecipient => 8,
            Role::SequencerFeeVaultRecipient => 9,
            Role::SystemConfigOwner => 10,
        }
    }

    /// The BIP-44 derivation path of this role on the given chain.
    pub fn derivation_path(&self, chain_id: u64) -> String {
        let account = if self.is_superchain() { 1 } else { 2 };
        format!("m/44'/60'/{account}'/{chain_id}/{}", self.index())
    }
}

/// Source of role keys.
pub trait KeyGenerator {
    fn private_key(&self, role: Role, chain_id: u64) -> anyhow::Result<B256>;

    fn address(&self, role: Role, chain_id: u64) -> anyhow::Result<Address>;
}

/// [`KeyGenerator`] backed by a BIP-39 mnemonic.
#[derive(Clone)]
pub struct MnemonicKeyGenerator {
    phrase: String,
}

impl std::fmt::Debug for MnemonicKeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MnemonicKeyGenerator").finish_non_exhaustive()
    }
}

impl MnemonicKeyGenerator {
    /// Validates the phrase once; later derivations can only fail on a bad path.
    pub fn new(phrase: impl Into<String>) -> anyhow::Result<Self> {
        let phrase = phrase.into();
        let phrase = phrase.trim().to_string();

        Self::signer_at(&phrase, "m/44'/60'/0'/0/0")
            .map_err(|e| crate::DeployError::validation(format!("invalid mnemonic: {e}")))?;

        Ok(Self { phrase })
    }

    fn signer_at(phrase: &str, path: &str) -> Result<PrivateKeySigner, LocalSignerError> {
        MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .derivation_path(path)?
            .build()
    }

    fn signer(&self, role: Role, chain_id: u64) -> anyhow::Result<PrivateKeySigner> {
        let path = role.derivation_path(chain_id);
        Self::signer_at(&self.phrase, &path)
            .with_context(|| format!("Failed to derive key at {path}"))
    }
}

impl KeyGenerator for MnemonicKeyGenerator {
    fn private_key(&self, role: Role, chain_id: u64) -> anyhow::Result<B256> {
        Ok(self.signer(role, chain_id)?.to_bytes())
    }

    fn address(&self, role: Role, chain_id: u64) -> anyhow::Result<Address> {
        Ok(self.signer(role, chain_id)?.address())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use alloy_core::primitives::address;
    use strum::IntoEnumIterator;

    use super::*;

    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_well_known_dev_account() {
        let signer = MnemonicKeyGenerator::signer_at(TEST_MNEMONIC, "m/44'/60'/0'/0/0")
            .expect("Failed to derive dev account");
        assert_eq!(
            signer.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = MnemonicKeyGenerator::new(TEST_MNEMONIC).expect("Failed to build generator");
        let b = MnemonicKeyGenerator::new(TEST_MNEMONIC).expect("Failed to build generator");

        for role in Role::iter() {
            assert_eq!(
                a.address(role, 42).expect("derive"),
                b.address(role, 42).expect("derive")
            );
        }
    }

    #[test]
    fn test_roles_are_distinct_and_non_zero() {
        let keygen = MnemonicKeyGenerator::new(TEST_MNEMONIC).expect("Failed to build generator");

        let addresses = Role::iter()
            .map(|role| keygen.address(role, 42).expect("derive"))
            .collect::<HashSet<_>>();

        assert_eq!(addresses.len(), Role::iter().count());
        assert!(!addresses.contains(&Address::ZERO));
    }

    #[test]
    fn test_roles_namespaced_by_chain() {
        let keygen = MnemonicKeyGenerator::new(TEST_MNEMONIC).expect("Failed to build generator");

        assert_ne!(
            keygen.address(Role::Batcher, 42).expect("derive"),
            keygen.address(Role::Batcher, 43).expect("derive")
        );
    }

    #[test]
    fn test_private_key_matches_address() {
        let keygen = MnemonicKeyGenerator::new(TEST_MNEMONIC).expect("Failed to build generator");

        let key = keygen.private_key(Role::Deployer, 1).expect("derive");
        let signer = PrivateKeySigner::from_bytes(&key).expect("valid key");
        assert_eq!(signer.address(), keygen.address(Role::Deployer, 1).expect("derive"));
    }

    #[test]
    fn test_rejects_malformed_mnemonic() {
        let err = MnemonicKeyGenerator::new("not a real mnemonic").unwrap_err();
        assert_eq!(crate::error_kind(&err), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_derivation_paths() {
        assert_eq!(Role::Batcher.derivation_path(42), "m/44'/60'/2'/42/2");
        assert_eq!(Role::SuperchainGuardian.derivation_path(1), "m/44'/60'/1'/1/3");
    }
}
