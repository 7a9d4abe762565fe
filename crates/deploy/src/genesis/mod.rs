//! L2 genesis construction.
//!
//! The allocation dump produced by the contract toolchain is combined with the deploy config and
//! the pinned L1 block into a genesis document. Its block hash is computed locally (state root
//! included) so the rollup config can reference it.

mod rollup;

use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

use alloy_consensus::{Header, constants::EMPTY_OMMER_ROOT_HASH};
use alloy_core::primitives::{Address, B64, B256, Bytes, KECCAK256_EMPTY, U256, keccak256};
use alloy_genesis::{ChainConfig, Genesis, GenesisAccount};
use alloy_trie::{EMPTY_ROOT_HASH, HashBuilder, Nibbles, TrieAccount};
use anyhow::Context;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};

pub use rollup::{
    AltDaConfig, BlockId, GenesisSystemConfig, RollupConfig, RollupGenesis, ecotone_scalar,
};

use crate::{
    L1Block,
    deploy_config::{DeployConfig, Fork, SEQUENCER_FEE_VAULT},
};

/// Extra data of pre-Holocene genesis blocks.
const BEDROCK_EXTRA_DATA: &[u8] = b"BEDROCK";

/// Account state as dumped by the contract toolchain, keyed by address.
pub type Allocs = BTreeMap<Address, GenesisAccount>;

/// Decode a raw allocation dump.
pub fn decode_allocs(raw: &[u8]) -> anyhow::Result<Allocs> {
    serde_json::from_slice(raw).context("Failed to unmarshal allocs")
}

/// Holocene genesis extra data: a zero version byte followed by the EIP-1559 parameters.
fn holocene_extra_data(denominator: u64, elasticity: u64) -> anyhow::Result<Bytes> {
    let denominator = u32::try_from(denominator).context("eip1559 denominator overflows u32")?;
    let elasticity = u32::try_from(elasticity).context("eip1559 elasticity overflows u32")?;

    let mut out = Vec::with_capacity(9);
    out.push(0);
    out.extend_from_slice(&denominator.to_be_bytes());
    out.extend_from_slice(&elasticity.to_be_bytes());
    Ok(out.into())
}

/// Build the L2 genesis document for `config` starting after `l1_start`.
pub fn build_l2_genesis(
    config: &DeployConfig,
    allocs: Allocs,
    l1_start: &L1Block,
) -> anyhow::Result<Genesis> {
    let genesis_time = l1_start.timestamp;
    let fork_time = |fork| config.fork_time(fork, genesis_time);

    let mut extra_fields = vec![
        ("bedrockBlock".to_string(), serde_json::json!(0)),
        (
            "optimism".to_string(),
            serde_json::json!({
                "eip1559Elasticity": config.eip1559_elasticity,
                "eip1559Denominator": config.eip1559_denominator,
                "eip1559DenominatorCanyon": config.eip1559_denominator_canyon,
            }),
        ),
    ];
    for fork in [
        Fork::Regolith,
        Fork::Canyon,
        Fork::Delta,
        Fork::Ecotone,
        Fork::Fjord,
        Fork::Granite,
        Fork::Holocene,
    ] {
        if let Some(time) = fork_time(fork) {
            extra_fields.push((format!("{fork}Time"), serde_json::json!(time)));
        }
    }

    let chain_config = ChainConfig {
        chain_id: config.l2_chain_id,
        homestead_block: Some(0),
        eip150_block: Some(0),
        eip155_block: Some(0),
        eip158_block: Some(0),
        byzantium_block: Some(0),
        constantinople_block: Some(0),
        petersburg_block: Some(0),
        istanbul_block: Some(0),
        muir_glacier_block: Some(0),
        berlin_block: Some(0),
        london_block: Some(0),
        arrow_glacier_block: Some(0),
        gray_glacier_block: Some(0),
        merge_netsplit_block: Some(0),
        shanghai_time: fork_time(Fork::Canyon),
        cancun_time: fork_time(Fork::Ecotone),
        terminal_total_difficulty: Some(U256::ZERO),
        terminal_total_difficulty_passed: true,
        extra_fields: extra_fields.into_iter().collect(),
        ..Default::default()
    };

    let extra_data = if config.is_active_at_genesis(Fork::Holocene) {
        holocene_extra_data(config.eip1559_denominator_canyon, config.eip1559_elasticity)?
    } else {
        Bytes::from_static(BEDROCK_EXTRA_DATA)
    };

    let base_fee = u64::try_from(config.l2_genesis_block_base_fee_per_gas)
        .ok()
        .context("l2GenesisBlockBaseFeePerGas does not fit in a block header")?;

    let ecotone = config.is_active_at_genesis(Fork::Ecotone);

    Ok(Genesis {
        config: chain_config,
        nonce: 0,
        timestamp: genesis_time,
        extra_data,
        gas_limit: config.l2_genesis_block_gas_limit,
        difficulty: U256::ZERO,
        mix_hash: B256::ZERO,
        coinbase: SEQUENCER_FEE_VAULT,
        alloc: allocs,
        base_fee_per_gas: Some(u128::from(base_fee)),
        excess_blob_gas: ecotone.then_some(0),
        blob_gas_used: ecotone.then_some(0),
        ..Default::default()
    })
}

fn storage_root(storage: &BTreeMap<B256, B256>) -> B256 {
    let mut leaves = storage
        .iter()
        .filter(|(_, value)| !value.is_zero())
        .map(|(slot, value)| {
            let value = U256::from_be_bytes(value.0);
            (keccak256(slot), alloy_rlp::encode(value))
        })
        .collect::<Vec<_>>();

    if leaves.is_empty() {
        return EMPTY_ROOT_HASH;
    }
    leaves.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut builder = HashBuilder::default();
    for (key, value) in leaves {
        builder.add_leaf(Nibbles::unpack(key), &value);
    }
    builder.root()
}

/// Merkle-Patricia root of the genesis allocations.
pub fn state_root(allocs: &Allocs) -> B256 {
    let mut leaves = allocs
        .iter()
        .map(|(address, account)| {
            let trie_account = TrieAccount {
                nonce: account.nonce.unwrap_or_default(),
                balance: account.balance,
                storage_root: account
                    .storage
                    .as_ref()
                    .map(storage_root)
                    .unwrap_or(EMPTY_ROOT_HASH),
                code_hash: account
                    .code
                    .as_ref()
                    .filter(|code| !code.is_empty())
                    .map(keccak256)
                    .unwrap_or(KECCAK256_EMPTY),
            };
            (keccak256(address), alloy_rlp::encode(trie_account))
        })
        .collect::<Vec<_>>();

    if leaves.is_empty() {
        return EMPTY_ROOT_HASH;
    }
    leaves.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut builder = HashBuilder::default();
    for (key, value) in leaves {
        builder.add_leaf(Nibbles::unpack(key), &value);
    }
    builder.root()
}

/// The header of the block the genesis document describes.
pub fn genesis_header(genesis: &Genesis) -> anyhow::Result<Header> {
    let shanghai = genesis
        .config
        .shanghai_time
        .is_some_and(|t| t <= genesis.timestamp);
    let cancun = genesis
        .config
        .cancun_time
        .is_some_and(|t| t <= genesis.timestamp);

    let base_fee_per_gas = genesis
        .base_fee_per_gas
        .map(u64::try_from)
        .transpose()
        .context("genesis base fee does not fit in a block header")?;

    Ok(Header {
        parent_hash: B256::ZERO,
        ommers_hash: EMPTY_OMMER_ROOT_HASH,
        beneficiary: genesis.coinbase,
        state_root: state_root(&genesis.alloc),
        transactions_root: EMPTY_ROOT_HASH,
        receipts_root: EMPTY_ROOT_HASH,
        difficulty: genesis.difficulty,
        number: 0,
        gas_limit: genesis.gas_limit,
        gas_used: 0,
        timestamp: genesis.timestamp,
        extra_data: genesis.extra_data.clone(),
        mix_hash: genesis.mix_hash,
        nonce: B64::from(genesis.nonce.to_be_bytes()),
        base_fee_per_gas,
        withdrawals_root: shanghai.then_some(EMPTY_ROOT_HASH),
        blob_gas_used: cancun.then(|| genesis.blob_gas_used.unwrap_or_default()),
        excess_blob_gas: cancun.then(|| genesis.excess_blob_gas.unwrap_or_default()),
        parent_beacon_block_root: cancun.then_some(B256::ZERO),
        ..Default::default()
    })
}

/// Gzip the JSON encoding of the genesis document.
pub fn compress_genesis(genesis: &Genesis) -> anyhow::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, genesis).context("Failed to encode genesis block")?;
    encoder.write_all(b"\n")?;
    encoder.finish().context("Failed to close gzip writer")
}

/// Inverse of [`compress_genesis`].
pub fn decompress_genesis(blob: &[u8]) -> anyhow::Result<Genesis> {
    let mut json = Vec::new();
    GzDecoder::new(blob)
        .read_to_end(&mut json)
        .context("Failed to decompress genesis")?;
    serde_json::from_slice(&json).context("Failed to decode genesis")
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;

    use super::*;
    use crate::deploy_config::tests::sample_config;

    fn l1_start() -> L1Block {
        L1Block {
            hash: B256::repeat_byte(0xaa),
            parent_hash: B256::repeat_byte(0xa9),
            number: 100,
            timestamp: 1_700_000_000,
        }
    }

    fn sample_allocs() -> Allocs {
        decode_allocs(
            br#"{
                "0x4200000000000000000000000000000000000011": {
                    "nonce": "0x1",
                    "balance": "0x0",
                    "code": "0x6080",
                    "storage": {
                        "0x0000000000000000000000000000000000000000000000000000000000000000": "0x0000000000000000000000000000000000000000000000000000000000000001"
                    }
                },
                "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266": {
                    "balance": "0x3635c9adc5dea00000"
                }
            }"#,
        )
        .expect("Failed to decode allocs")
    }

    #[test]
    fn test_empty_state_root() {
        assert_eq!(state_root(&Allocs::new()), EMPTY_ROOT_HASH);
    }

    #[test]
    fn test_state_root_tracks_account_changes() {
        let allocs = sample_allocs();
        let root = state_root(&allocs);
        assert_ne!(root, EMPTY_ROOT_HASH);
        assert_eq!(root, state_root(&sample_allocs()));

        let mut funded = allocs.clone();
        if let Some(account) = funded.values_mut().next() {
            account.balance += U256::from(1);
        }
        assert_ne!(state_root(&funded), root);
    }

    #[test]
    fn test_zero_storage_values_are_skipped() {
        let mut storage = BTreeMap::new();
        storage.insert(B256::ZERO, B256::ZERO);
        assert_eq!(storage_root(&storage), EMPTY_ROOT_HASH);
    }

    #[test]
    fn test_build_l2_genesis() {
        let config = sample_config();
        let genesis =
            build_l2_genesis(&config, sample_allocs(), &l1_start()).expect("Failed to build");

        assert_eq!(genesis.config.chain_id, 42);
        assert_eq!(genesis.timestamp, 1_700_000_000);
        assert_eq!(genesis.coinbase, address!("4200000000000000000000000000000000000011"));
        assert_eq!(genesis.extra_data, Bytes::from_static(b"BEDROCK"));
        assert_eq!(genesis.gas_limit, 30_000_000);
        assert_eq!(genesis.alloc.len(), 2);
        assert_eq!(genesis.config.cancun_time, Some(1_700_000_000));
        assert_eq!(
            genesis.config.extra_fields.get("graniteTime"),
            Some(&serde_json::json!(1_700_000_000u64))
        );
        assert!(genesis.config.extra_fields.get("holoceneTime").is_none());
    }

    #[test]
    fn test_holocene_extra_data() {
        let config = DeployConfig {
            l2_genesis_holocene_time_offset: Some(0),
            ..sample_config()
        };
        let genesis = build_l2_genesis(&config, Allocs::new(), &l1_start()).expect("build");

        assert_eq!(genesis.extra_data.as_ref(), &[0, 0, 0, 0, 250, 0, 0, 0, 6]);
    }

    #[test]
    fn test_genesis_header_fields() {
        let genesis =
            build_l2_genesis(&sample_config(), sample_allocs(), &l1_start()).expect("build");
        let header = genesis_header(&genesis).expect("Failed to build header");

        assert_eq!(header.number, 0);
        assert_eq!(header.base_fee_per_gas, Some(1_000_000_000));
        assert_eq!(header.withdrawals_root, Some(EMPTY_ROOT_HASH));
        assert_eq!(header.parent_beacon_block_root, Some(B256::ZERO));
        assert_ne!(header.state_root, EMPTY_ROOT_HASH);

        // Hashing is deterministic and sensitive to the allocations.
        let again = genesis_header(&genesis).expect("Failed to build header");
        assert_eq!(header.hash_slow(), again.hash_slow());
        let empty = build_l2_genesis(&sample_config(), Allocs::new(), &l1_start()).expect("build");
        let empty = genesis_header(&empty).expect("Failed to build header");
        assert_ne!(header.hash_slow(), empty.hash_slow());
    }

    #[test]
    fn test_base_fee_must_fit_in_header() {
        let config = DeployConfig {
            l2_genesis_block_base_fee_per_gas: U256::from(u64::MAX) + U256::from(8),
            ..sample_config()
        };
        assert!(build_l2_genesis(&config, Allocs::new(), &l1_start()).is_err());

        let mut genesis =
            build_l2_genesis(&sample_config(), Allocs::new(), &l1_start()).expect("build");
        genesis.base_fee_per_gas = Some(u128::from(u64::MAX) + 8);
        assert!(genesis_header(&genesis).is_err());
    }

    #[test]
    fn test_compressed_genesis_is_byte_exact() {
        let genesis =
            build_l2_genesis(&sample_config(), sample_allocs(), &l1_start()).expect("build");

        let blob = compress_genesis(&genesis).expect("compress");
        let decoded = decompress_genesis(&blob).expect("decompress");

        assert_eq!(decoded, genesis);
        assert_eq!(decoded.config.chain_id, 42);
    }
}
