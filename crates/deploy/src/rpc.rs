//! Read/write access to the L1 chain over JSON-RPC.

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::DeployError;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The subset of an L1 block the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1Block {
    pub hash: B256,
    pub parent_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub number: u64,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub timestamp: u64,
}

/// The subset of a transaction receipt the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub block_number: u64,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub status: u64,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

/// Operations the pipeline performs against L1.
pub trait L1Client: Send + Sync {
    /// The current head of the chain.
    fn latest_block(&self) -> impl Future<Output = anyhow::Result<L1Block>> + Send;

    fn block_by_hash(&self, hash: B256) -> impl Future<Output = anyhow::Result<L1Block>> + Send;

    /// The canonical block at `number`, if the chain is that long.
    fn block_by_number(
        &self,
        number: u64,
    ) -> impl Future<Output = anyhow::Result<Option<L1Block>>> + Send;

    fn code_at(&self, address: Address) -> impl Future<Output = anyhow::Result<Bytes>> + Send;

    /// Broadcast a signed transaction and return its hash.
    fn send_raw_transaction(
        &self,
        raw: Bytes,
    ) -> impl Future<Output = anyhow::Result<B256>> + Send;

    /// `None` while the transaction is still pending.
    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = anyhow::Result<Option<TxReceipt>>> + Send;
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// Transport failures and error responses are tagged as connectivity errors.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let connectivity = || DeployError::Connectivity {
        method: method.to_string(),
    };

    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(connectivity)?;

    let result: Value = response.json().await.with_context(connectivity)?;

    if let Some(error) = result.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown");
        return Err(anyhow::anyhow!("RPC error: {message}").context(connectivity()));
    }

    let result_value = result
        .get("result")
        .cloned()
        .with_context(|| format!("No result in {method} response"))?;

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {method} result"))
}

/// [`L1Client`] talking to a JSON-RPC endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct RpcL1Client {
    client: reqwest::Client,
    url: Url,
}

impl RpcL1Client {
    pub fn new(url: Url) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client()?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> anyhow::Result<T> {
        json_rpc_call(&self.client, &self.url, method, params).await
    }
}

impl L1Client for RpcL1Client {
    async fn latest_block(&self) -> anyhow::Result<L1Block> {
        let block: Option<L1Block> = self
            .call("eth_getBlockByNumber", vec!["latest".into(), false.into()])
            .await?;
        block.context("L1 returned no latest block")
    }

    async fn block_by_hash(&self, hash: B256) -> anyhow::Result<L1Block> {
        let block: Option<L1Block> = self
            .call(
                "eth_getBlockByHash",
                vec![serde_json::to_value(hash)?, false.into()],
            )
            .await?;
        block.with_context(|| format!("L1 block {hash} not found"))
    }

    async fn block_by_number(&self, number: u64) -> anyhow::Result<Option<L1Block>> {
        self.call(
            "eth_getBlockByNumber",
            vec![format!("{number:#x}").into(), false.into()],
        )
        .await
    }

    async fn code_at(&self, address: Address) -> anyhow::Result<Bytes> {
        self.call(
            "eth_getCode",
            vec![serde_json::to_value(address)?, "latest".into()],
        )
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> anyhow::Result<B256> {
        self.call("eth_sendRawTransaction", vec![serde_json::to_value(raw)?])
            .await
    }

    async fn transaction_receipt(&self, hash: B256) -> anyhow::Result<Option<TxReceipt>> {
        self.call(
            "eth_getTransactionReceipt",
            vec![serde_json::to_value(hash)?],
        )
        .await
    }
}
