//! Submits one ERC20 `transfer` end to end: estimate, sign, broadcast, confirm.
//!
//! A submission walks `Built -> Estimated -> Signed -> Broadcast -> Confirmed`; any
//! failure ends it with the stage recorded on the error. Nothing is retried here:
//! after an ambiguous broadcast only the caller can decide whether sending again
//! is safe.

use alloy_primitives::{Address, Bytes};
use chrono::Utc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use crate::app::error::{InclusionTimeout, Stage, TransferError};
use crate::crypto::{LocalKeySigner, SignedTransfer, TransactionSigner, UnsignedTransfer};
use crate::domain::erc20::{decode_transfer_event, encode_transfer};
use crate::domain::{InclusionStatus, TransferReceipt, TransferRequest};
use crate::infra::config::{Config, GasPricePolicy, SubmitterSettings};
use crate::infra::rpc::{call_request, HttpLedgerClient, LedgerClient, TransactionReceipt};

pub struct TransferSubmitter<C, S> {
    client: C,
    signer: S,
    settings: SubmitterSettings,
    chain_id: OnceCell<u64>,
    /// Per-sender submission lock. Holds the nonce after the last successful
    /// broadcast; cleared whenever a broadcast fails or its receipt never shows up.
    next_nonce: Mutex<Option<u64>>,
}

impl TransferSubmitter<HttpLedgerClient, LocalKeySigner> {
    /// Wires the HTTP client and the configured key together.
    pub fn from_config(config: &Config) -> Result<Self, TransferError> {
        let client = HttpLedgerClient::new(config.rpc_url.clone(), config.rpc_timeout)
            .map_err(|e| TransferError::Configuration(format!("cannot build RPC client: {e}")))?;
        let signer = config.key.load()?;
        Ok(Self::new(client, signer, config.submitter.clone()))
    }
}

impl<C, S> TransferSubmitter<C, S>
where
    C: LedgerClient,
    S: TransactionSigner,
{
    pub fn new(client: C, signer: S, settings: SubmitterSettings) -> Self {
        Self {
            client,
            signer,
            settings,
            chain_id: OnceCell::new(),
            next_nonce: Mutex::new(None),
        }
    }

    /// The sending address, derived from the signer's key.
    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Validates raw input and submits it. Invalid input never reaches the network.
    pub async fn submit_transfer(
        &self,
        recipient: &str,
        amount: &str,
    ) -> Result<TransferReceipt, TransferError> {
        let request = TransferRequest::parse(recipient, amount, self.settings.denomination)?;
        self.submit(&request).await
    }

    #[instrument(
        skip_all,
        fields(token = %self.settings.token, recipient = %request.recipient(), amount = %request.amount())
    )]
    pub async fn submit(&self, request: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        let sender = self.sender();
        let token = self.settings.token;
        let call_data = encode_transfer(request.recipient(), request.amount().base_units());
        debug!(stage = %Stage::Built, %sender, "transfer call encoded");

        let mut next_nonce = self.next_nonce.lock().await;

        let chain_id = self.chain_id().await?;
        let pending = self
            .client
            .transaction_count(sender)
            .await
            .map_err(|e| TransferError::network(Stage::Built, e))?;
        // The node's pending count can lag behind our own last broadcast.
        let nonce = (*next_nonce).map_or(pending, |cached| cached.max(pending));

        let gas_limit = self
            .client
            .estimate_gas(&call_request(Some(sender), token, call_data.clone()))
            .await
            .map_err(TransferError::from_estimation)?;
        let gas_price = self.gas_price().await?;
        debug!(stage = %Stage::Estimated, gas_limit, gas_price, nonce, "gas estimated");

        let signed = self.signer.sign_transaction(UnsignedTransfer {
            chain_id,
            nonce,
            to: token,
            input: call_data,
            gas_limit,
            gas_price,
        })?;
        debug!(stage = %Stage::Signed, tx_hash = %signed.hash, "transaction signed");

        let submitted_at = Utc::now();
        match self.client.send_raw_transaction(&signed.raw).await {
            Ok(hash) => {
                if hash != signed.hash {
                    warn!(node_hash = %hash, local_hash = %signed.hash, "node reported a different transaction hash");
                }
                *next_nonce = Some(nonce + 1);
            }
            Err(e) => {
                *next_nonce = None;
                let err = TransferError::from_broadcast(signed.hash, e);
                warn!(stage = %err.stage(), tx_hash = %signed.hash, error = %err, "broadcast failed");
                return Err(err);
            }
        }
        drop(next_nonce);
        info!(stage = %Stage::Broadcast, tx_hash = %signed.hash, nonce, "transaction broadcast");

        let (rpc_receipt, confirmations) = match self.await_inclusion(&signed).await {
            Ok(found) => found,
            Err(err) => {
                // The node may have dropped it; resync from the pending count next time.
                *self.next_nonce.lock().await = None;
                warn!(tx_hash = %signed.hash, error = %err, "no receipt in time");
                return Err(err);
            }
        };
        let receipt = self.build_receipt(&signed, rpc_receipt.as_ref(), confirmations, submitted_at);
        match receipt.status {
            InclusionStatus::Reverted => warn!(
                tx_hash = %receipt.transaction_hash,
                block = ?receipt.block_number,
                "transfer mined but reverted"
            ),
            _ => info!(
                stage = %Stage::Confirmed,
                tx_hash = %receipt.transaction_hash,
                status = ?receipt.status,
                block = ?receipt.block_number,
                gas_used = ?receipt.gas_used,
                "transfer finished"
            ),
        }
        Ok(receipt)
    }

    async fn chain_id(&self) -> Result<u64, TransferError> {
        let id = self
            .chain_id
            .get_or_try_init(|| async {
                match self.settings.chain_id {
                    Some(id) => Ok(id),
                    None => self
                        .client
                        .chain_id()
                        .await
                        .map_err(|e| TransferError::network(Stage::Built, e)),
                }
            })
            .await?;
        Ok(*id)
    }

    async fn gas_price(&self) -> Result<u128, TransferError> {
        match self.settings.gas_price {
            GasPricePolicy::Fixed(price) => Ok(price),
            GasPricePolicy::Network => self
                .client
                .gas_price()
                .await
                .map_err(|e| TransferError::network(Stage::Estimated, e)),
        }
    }

    /// Polls for the receipt until the configured depth is reached. Poll errors are
    /// logged and polled through; only the deadline ends the wait.
    async fn await_inclusion(
        &self,
        signed: &SignedTransfer,
    ) -> Result<(Option<TransactionReceipt>, u64), TransferError> {
        let required = self.settings.confirmations;
        if required == 0 {
            return Ok((None, 0));
        }

        let poll = async {
            loop {
                match self.client.transaction_receipt(signed.hash).await {
                    Ok(Some(receipt)) => {
                        if let Some(depth) = self.depth_of(&receipt).await {
                            if depth >= required {
                                return (receipt, depth);
                            }
                            debug!(depth, required, "waiting for confirmations");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "receipt poll failed"),
                }
                tokio::time::sleep(self.settings.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.settings.receipt_timeout, poll).await {
            Ok((receipt, depth)) => Ok((Some(receipt), depth)),
            Err(_) => Err(TransferError::Inclusion {
                tx_hash: signed.hash,
                timeout: InclusionTimeout::Receipt(self.settings.receipt_timeout),
            }),
        }
    }

    /// Blocks on top of (and including) the receipt's block, or `None` while unknown.
    async fn depth_of(&self, receipt: &TransactionReceipt) -> Option<u64> {
        let block = receipt.block_number?;
        if self.settings.confirmations <= 1 {
            return Some(1);
        }
        match self.client.block_number().await {
            Ok(head) => Some(head.saturating_sub(block) + 1),
            Err(e) => {
                warn!(error = %e, "block number poll failed");
                None
            }
        }
    }

    fn build_receipt(
        &self,
        signed: &SignedTransfer,
        rpc: Option<&TransactionReceipt>,
        confirmations: u64,
        submitted_at: chrono::DateTime<Utc>,
    ) -> TransferReceipt {
        let token = self.settings.token;
        let status = match rpc {
            None => InclusionStatus::Pending,
            Some(r) if r.inner.status() => InclusionStatus::Succeeded,
            Some(_) => InclusionStatus::Reverted,
        };
        let logs = rpc.map(|r| r.inner.logs()).unwrap_or_default();

        TransferReceipt {
            transaction_hash: signed.hash,
            status,
            from: signed.from,
            token,
            nonce: signed.tx.nonce,
            call_data: Bytes::clone(&signed.tx.input),
            gas_limit: signed.tx.gas_limit,
            gas_price: signed.tx.gas_price,
            block_number: rpc.and_then(|r| r.block_number),
            gas_used: rpc.map(|r| r.gas_used),
            confirmations,
            transfers: logs
                .iter()
                .filter_map(|log| {
                    decode_transfer_event(
                        token,
                        log.inner.address,
                        log.inner.data.topics(),
                        &log.inner.data.data,
                    )
                })
                .collect(),
            log_count: logs.len(),
            submitted_at,
        }
    }
}
