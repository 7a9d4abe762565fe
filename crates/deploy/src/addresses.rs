//! Contract addresses produced by a deployment run.

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

/// The named L1 contracts (and their proxies) written by the deploy script.
///
/// Keys the deploy script emits but this record does not name are ignored, missing ones are
/// left zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Addresses {
    pub address_manager: Address,
    pub anchor_state_registry: Address,
    pub anchor_state_registry_proxy: Address,
    #[serde(rename = "DelayedWETH")]
    pub delayed_weth: Address,
    #[serde(rename = "DelayedWETHProxy")]
    pub delayed_weth_proxy: Address,
    pub dispute_game_factory: Address,
    pub dispute_game_factory_proxy: Address,
    pub l1_cross_domain_messenger: Address,
    pub l1_cross_domain_messenger_proxy: Address,
    #[serde(rename = "L1ERC721Bridge")]
    pub l1_erc721_bridge: Address,
    #[serde(rename = "L1ERC721BridgeProxy")]
    pub l1_erc721_bridge_proxy: Address,
    pub l1_standard_bridge: Address,
    pub l1_standard_bridge_proxy: Address,
    pub l2_output_oracle: Address,
    pub l2_output_oracle_proxy: Address,
    pub mips: Address,
    #[serde(rename = "OptimismMintableERC20Factory")]
    pub optimism_mintable_erc20_factory: Address,
    #[serde(rename = "OptimismMintableERC20FactoryProxy")]
    pub optimism_mintable_erc20_factory_proxy: Address,
    pub optimism_portal: Address,
    pub optimism_portal2: Address,
    pub optimism_portal_proxy: Address,
    pub preimage_oracle: Address,
    pub protocol_versions: Address,
    pub protocol_versions_proxy: Address,
    pub proxy_admin: Address,
    pub safe_proxy_factory: Address,
    pub safe_singleton: Address,
    pub superchain_config: Address,
    pub superchain_config_proxy: Address,
    pub system_config: Address,
    pub system_config_proxy: Address,
    pub system_owner_safe: Address,

    // Only deployed when alt-DA is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_availability_challenge: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_availability_challenge_proxy: Option<Address>,
}

impl Addresses {
    /// Every named address with the key it is serialized under.
    pub fn entries(&self) -> Vec<(&'static str, Address)> {
        let mut entries = vec![
            ("AddressManager", self.address_manager),
            ("AnchorStateRegistry", self.anchor_state_registry),
            ("AnchorStateRegistryProxy", self.anchor_state_registry_proxy),
            ("DelayedWETH", self.delayed_weth),
            ("DelayedWETHProxy", self.delayed_weth_proxy),
            ("DisputeGameFactory", self.dispute_game_factory),
            ("DisputeGameFactoryProxy", self.dispute_game_factory_proxy),
            ("L1CrossDomainMessenger", self.l1_cross_domain_messenger),
            ("L1CrossDomainMessengerProxy", self.l1_cross_domain_messenger_proxy),
            ("L1ERC721Bridge", self.l1_erc721_bridge),
            ("L1ERC721BridgeProxy", self.l1_erc721_bridge_proxy),
            ("L1StandardBridge", self.l1_standard_bridge),
            ("L1StandardBridgeProxy", self.l1_standard_bridge_proxy),
            ("L2OutputOracle", self.l2_output_oracle),
            ("L2OutputOracleProxy", self.l2_output_oracle_proxy),
            ("Mips", self.mips),
            ("OptimismMintableERC20Factory", self.optimism_mintable_erc20_factory),
            ("OptimismMintableERC20FactoryProxy", self.optimism_mintable_erc20_factory_proxy),
            ("OptimismPortal", self.optimism_portal),
            ("OptimismPortal2", self.optimism_portal2),
            ("OptimismPortalProxy", self.optimism_portal_proxy),
            ("PreimageOracle", self.preimage_oracle),
            ("ProtocolVersions", self.protocol_versions),
            ("ProtocolVersionsProxy", self.protocol_versions_proxy),
            ("ProxyAdmin", self.proxy_admin),
            ("SafeProxyFactory", self.safe_proxy_factory),
            ("SafeSingleton", self.safe_singleton),
            ("SuperchainConfig", self.superchain_config),
            ("SuperchainConfigProxy", self.superchain_config_proxy),
            ("SystemConfig", self.system_config),
            ("SystemConfigProxy", self.system_config_proxy),
            ("SystemOwnerSafe", self.system_owner_safe),
        ];

        entries.extend(
            [
                ("DataAvailabilityChallenge", self.data_availability_challenge),
                (
                    "DataAvailabilityChallengeProxy",
                    self.data_availability_challenge_proxy,
                ),
            ]
            .into_iter()
            .filter_map(|(name, addr)| addr.map(|addr| (name, addr))),
        );

        entries
    }

    /// True if the deploy script did not report a single address.
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, addr)| addr.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy_script_output() {
        let json = serde_json::json!({
            "AddressManager": "0x0000000000000000000000000000000000000001",
            "DelayedWETHProxy": "0x0000000000000000000000000000000000000002",
            "L1ERC721BridgeProxy": "0x0000000000000000000000000000000000000003",
            "OptimismMintableERC20Factory": "0x0000000000000000000000000000000000000004",
            "OptimismPortal2": "0x0000000000000000000000000000000000000005",
            "L1UpgradeKey": "0x0000000000000000000000000000000000000006"
        });

        let addresses: Addresses = serde_json::from_value(json).expect("Failed to parse addresses");

        assert_eq!(addresses.address_manager, Address::with_last_byte(1));
        assert_eq!(addresses.delayed_weth_proxy, Address::with_last_byte(2));
        assert_eq!(addresses.l1_erc721_bridge_proxy, Address::with_last_byte(3));
        assert_eq!(
            addresses.optimism_mintable_erc20_factory,
            Address::with_last_byte(4)
        );
        assert_eq!(addresses.optimism_portal2, Address::with_last_byte(5));
        assert!(!addresses.is_empty());
    }

    #[test]
    fn test_serialized_keys_match_entries() {
        let addresses = Addresses {
            data_availability_challenge: Some(Address::with_last_byte(9)),
            ..Default::default()
        };
        let json = serde_json::to_value(&addresses).expect("Failed to encode");
        let object = json.as_object().expect("object");

        let entries = addresses.entries();
        assert_eq!(object.len(), entries.len());
        assert_eq!(entries.len(), 33);
        for (name, _) in entries {
            assert!(object.contains_key(name), "missing key {name}");
        }
    }

    #[test]
    fn test_default_is_empty() {
        assert!(Addresses::default().is_empty());
    }
}
