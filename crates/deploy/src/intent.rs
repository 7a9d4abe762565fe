//! The declarative description of the chain to provision.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DeployError;

/// Everything an operator decides up front. The rest of the deployment is derived from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainIntent {
    #[serde(rename = "l1ChainID")]
    pub l1_chain_id: u64,
    #[serde(rename = "l2ChainID")]
    pub l2_chain_id: u64,
    #[serde(default)]
    pub use_fault_proofs: bool,
    #[serde(rename = "useAltDA", default)]
    pub use_alt_da: bool,
    #[serde(default)]
    pub fund_dev_accounts: bool,
    /// Raw deploy config fields that win over the derived values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Map<String, Value>>,
}

impl ChainIntent {
    pub fn new(l1_chain_id: u64, l2_chain_id: u64) -> Self {
        Self {
            l1_chain_id,
            l2_chain_id,
            ..Default::default()
        }
    }

    /// Structural checks, run before anything touches the network.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.l1_chain_id == 0 {
            anyhow::bail!(DeployError::validation("l1ChainID must be set"));
        }

        if self.l2_chain_id == 0 {
            anyhow::bail!(DeployError::validation("l2ChainID must be set"));
        }

        if self.use_fault_proofs && self.use_alt_da {
            anyhow::bail!(DeployError::validation(
                "cannot use both fault proofs and alt-DA"
            ));
        }

        Ok(())
    }
}
