//! The persisted deployment state document.
//!
//! Every stage reads the whole document, fills in its own fields and writes the whole document
//! back. Nothing else is durable, so any stage can be re-run from disk.

use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use derive_more::{Deref, From};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Addresses, ChainIntent, DeployConfig, RollupConfig};

/// Opaque bytes stored as a base64 string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, From)]
pub struct Base64Blob(pub Vec<u8>);

impl Serialize for Base64Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Blob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentState {
    pub intent: ChainIntent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_config: Option<DeployConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Addresses>,
    /// Gzipped genesis documents keyed by L2 chain id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_files: Option<BTreeMap<u64, Base64Blob>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_configs: Option<BTreeMap<u64, RollupConfig>>,
}

impl DeploymentState {
    pub fn new(intent: ChainIntent) -> Self {
        Self {
            intent,
            ..Default::default()
        }
    }

    /// Load a state document.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to decode state file {}", path.display()))
    }

    /// Persist the document in full.
    ///
    /// The JSON is written to a sibling temporary file first and then renamed over `path`, so a
    /// crash never leaves a truncated document behind.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("Failed to encode state")?;

        let tmp = sibling_tmp_path(path);
        {
            let mut file = std::fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            file.write_all(&json)
                .and_then(|()| file.write_all(b"\n"))
                .and_then(|()| file.sync_all())
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
        }

        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e)
                .with_context(|| format!("Failed to move state into place at {}", path.display()));
        }

        tracing::debug!(path = %path.display(), "State written");
        Ok(())
    }

    /// Record the genesis artifacts of one L2 chain, replacing any previous ones.
    pub fn insert_genesis(&mut self, chain_id: u64, genesis: Vec<u8>, rollup: RollupConfig) {
        self.genesis_files
            .get_or_insert_with(BTreeMap::new)
            .insert(chain_id, Base64Blob(genesis));
        self.rollup_configs
            .get_or_insert_with(BTreeMap::new)
            .insert(chain_id, rollup);
    }
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "state.json".into());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
