//! Makes sure the deterministic CREATE2 deployer exists on L1.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, address, hex};
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::{DeployError, L1Client, error::cancellable};

/// Where the deterministic deployment proxy lives on every chain it has been bootstrapped on.
pub const CREATE2_DEPLOYER_ADDRESS: Address = address!("4e59b44847b379578588920ca78fbf26c0b4956c");

/// Pre-signed, chain-id-less deployment of the proxy. Its sender must hold enough ether to pay
/// for it before submission.
pub const CREATE2_DEPLOYER_RAW_TX: &str = "0xf8a58085174876e800830186a08080b853604580600e600039806000f350fe7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe03601600081602082378035828234f58015156039578182fd5b8082525050506014600cf31ba02222222222222222222222222222222222222222222222222222222222222222a02222222222222222222222222222222222222222222222222222222222222222";

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What [`BootstrapChecker::ensure`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Code was already present, nothing was sent.
    AlreadyDeployed,
    /// The bootstrap transaction was sent and mined successfully.
    Deployed { tx_hash: B256 },
}

pub struct BootstrapChecker<'a, L> {
    l1: &'a L,
    poll_interval: Duration,
    span: Span,
}

impl<'a, L: L1Client> BootstrapChecker<'a, L> {
    pub fn new(l1: &'a L, span: Span) -> Self {
        Self {
            l1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            span,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Submits the bootstrap transaction at most once, then waits for it to be mined.
    pub async fn ensure(&self, cancel: &CancellationToken) -> anyhow::Result<BootstrapOutcome> {
        self.ensure_inner(cancel).instrument(self.span.clone()).await
    }

    async fn ensure_inner(&self, cancel: &CancellationToken) -> anyhow::Result<BootstrapOutcome> {
        let code = cancellable(cancel, self.l1.code_at(CREATE2_DEPLOYER_ADDRESS))
            .await
            .context("Failed to check for CREATE2 deployer code")?;

        if !code.is_empty() {
            tracing::info!(
                address = %CREATE2_DEPLOYER_ADDRESS,
                "CREATE2 deployer already present, skipping bootstrap"
            );
            return Ok(BootstrapOutcome::AlreadyDeployed);
        }

        let raw = Bytes::from(
            hex::decode(CREATE2_DEPLOYER_RAW_TX).context("Malformed bootstrap transaction")?,
        );

        tracing::info!(address = %CREATE2_DEPLOYER_ADDRESS, "Deploying CREATE2 deployer");
        let tx_hash = cancellable(cancel, self.l1.send_raw_transaction(raw))
            .await
            .context("Failed to submit bootstrap transaction")?;
        tracing::debug!(%tx_hash, "Bootstrap transaction submitted");

        loop {
            let receipt = cancellable(cancel, self.l1.transaction_receipt(tx_hash))
                .await
                .context("Failed to fetch bootstrap receipt")?;

            if let Some(receipt) = receipt {
                if !receipt.succeeded() {
                    anyhow::bail!(DeployError::BootstrapReverted { tx_hash });
                }

                tracing::info!(
                    %tx_hash,
                    block = receipt.block_number,
                    "CREATE2 deployer deployed"
                );
                return Ok(BootstrapOutcome::Deployed { tx_hash });
            }

            tracing::trace!(%tx_hash, "Bootstrap transaction not mined yet");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => anyhow::bail!(DeployError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, error_kind, test_utils::MockL1};

    const FAST: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn test_existing_code_sends_nothing() {
        let l1 = MockL1::new().with_code(CREATE2_DEPLOYER_ADDRESS, Bytes::from_static(&[0x60]));
        let checker = BootstrapChecker::new(&l1, Span::none()).poll_interval(FAST);

        let cancel = CancellationToken::new();
        assert_eq!(
            checker.ensure(&cancel).await.expect("bootstrap"),
            BootstrapOutcome::AlreadyDeployed
        );
        assert!(l1.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_second_call_is_a_no_op() {
        let l1 = MockL1::new().mine_after_polls(2);
        let checker = BootstrapChecker::new(&l1, Span::none()).poll_interval(FAST);
        let cancel = CancellationToken::new();

        let first = checker.ensure(&cancel).await.expect("first bootstrap");
        assert!(matches!(first, BootstrapOutcome::Deployed { .. }));
        assert_eq!(l1.sent_transactions().len(), 1);

        let second = checker.ensure(&cancel).await.expect("second bootstrap");
        assert_eq!(second, BootstrapOutcome::AlreadyDeployed);
        assert_eq!(l1.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_fatal() {
        let l1 = MockL1::new().mine_after_polls(0).revert_transactions();
        let checker = BootstrapChecker::new(&l1, Span::none()).poll_interval(FAST);

        let err = checker.ensure(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::Bootstrap);
        assert_eq!(l1.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_poll_does_not_resubmit() {
        let l1 = MockL1::new().never_mine();
        let checker = BootstrapChecker::new(&l1, Span::none()).poll_interval(FAST);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let err = checker.ensure(&cancel).await.unwrap_err();
        canceller.await.expect("canceller task");

        assert_eq!(error_kind(&err), ErrorKind::Cancelled);
        assert_eq!(l1.sent_transactions().len(), 1);
        assert!(l1.receipt_polls() > 1);
    }
}
