//! The terminal artifact of a submission.

use alloy_primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::erc20::TransferEvent;

/// Where the transaction stood when the submitter returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionStatus {
    /// Accepted by the node, not yet waited for (`CONFIRMATIONS=0`).
    Pending,
    /// Mined and executed successfully.
    Succeeded,
    /// Mined but reverted; gas was still consumed.
    Reverted,
}

/// Outcome of a submitted transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub transaction_hash: B256,
    pub status: InclusionStatus,
    pub from: Address,
    pub token: Address,
    pub nonce: u64,
    /// The exact call data that was signed.
    pub call_data: Bytes,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub confirmations: u64,
    /// `Transfer` events the token contract emitted in this transaction.
    pub transfers: Vec<TransferEvent>,
    pub log_count: usize,
    pub submitted_at: DateTime<Utc>,
}

impl TransferReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == InclusionStatus::Succeeded
    }
}
