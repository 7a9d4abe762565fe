//! In-memory L1 used by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use alloy_core::primitives::{Address, B256, Bytes, keccak256};

use crate::{
    bootstrap::CREATE2_DEPLOYER_ADDRESS,
    rpc::{L1Block, L1Client, TxReceipt},
};

#[derive(Debug)]
pub(crate) struct MockL1 {
    head: L1Block,
    code: Mutex<HashMap<Address, Bytes>>,
    sent: Mutex<Vec<Bytes>>,
    requests: AtomicUsize,
    receipt_polls: AtomicUsize,
    /// `None` never mines.
    mine_after: Option<usize>,
    revert: bool,
    /// Serve a different block at the head's height.
    reorged: bool,
}

impl MockL1 {
    pub(crate) fn new() -> Self {
        Self {
            head: L1Block {
                hash: B256::repeat_byte(0xab),
                parent_hash: B256::repeat_byte(0xaa),
                number: 100,
                timestamp: 1_700_000_000,
            },
            code: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
            receipt_polls: AtomicUsize::new(0),
            mine_after: Some(0),
            revert: false,
            reorged: false,
        }
    }

    pub(crate) fn with_code(self, address: Address, code: Bytes) -> Self {
        self.code
            .lock()
            .expect("poisoned")
            .insert(address, code);
        self
    }

    pub(crate) fn mine_after_polls(mut self, polls: usize) -> Self {
        self.mine_after = Some(polls);
        self
    }

    pub(crate) fn never_mine(mut self) -> Self {
        self.mine_after = None;
        self
    }

    pub(crate) fn revert_transactions(mut self) -> Self {
        self.revert = true;
        self
    }

    pub(crate) fn reorged(mut self) -> Self {
        self.reorged = true;
        self
    }

    pub(crate) fn head(&self) -> L1Block {
        self.head
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn receipt_polls(&self) -> usize {
        self.receipt_polls.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_transactions(&self) -> Vec<Bytes> {
        self.sent.lock().expect("poisoned").clone()
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

impl L1Client for MockL1 {
    async fn latest_block(&self) -> anyhow::Result<L1Block> {
        self.hit();
        Ok(self.head)
    }

    async fn block_by_hash(&self, hash: B256) -> anyhow::Result<L1Block> {
        self.hit();
        anyhow::ensure!(hash == self.head.hash, "unknown block {hash}");
        Ok(self.head)
    }

    async fn block_by_number(&self, number: u64) -> anyhow::Result<Option<L1Block>> {
        self.hit();
        if number != self.head.number {
            return Ok(None);
        }
        if self.reorged {
            return Ok(Some(L1Block {
                hash: B256::repeat_byte(0xcd),
                ..self.head
            }));
        }
        Ok(Some(self.head))
    }

    async fn code_at(&self, address: Address) -> anyhow::Result<Bytes> {
        self.hit();
        Ok(self
            .code
            .lock()
            .expect("poisoned")
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> anyhow::Result<B256> {
        self.hit();
        let hash = keccak256(&raw);
        self.sent.lock().expect("poisoned").push(raw);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> anyhow::Result<Option<TxReceipt>> {
        self.hit();
        let polls = self.receipt_polls.fetch_add(1, Ordering::SeqCst);

        match self.mine_after {
            Some(after) if polls >= after => {
                if !self.revert {
                    self.code
                        .lock()
                        .expect("poisoned")
                        .insert(CREATE2_DEPLOYER_ADDRESS, Bytes::from_static(&[0x60, 0x00]));
                }
                Ok(Some(TxReceipt {
                    transaction_hash: hash,
                    block_number: self.head.number + 1,
                    status: if self.revert { 0 } else { 1 },
                }))
            }
            _ => Ok(None),
        }
    }
}
