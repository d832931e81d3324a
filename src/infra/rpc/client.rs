// Responsible for all communication with the ledger node.

use alloy_eips::BlockId;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_transport::TransportResult;
use alloy_transport_http::Http;
use async_trait::async_trait;
use reqwest::Url;
use std::future::IntoFuture;
use std::time::Duration;

use super::types::{RpcError, TransactionReceipt, TransactionRequest};

/// The ledger operations the transfer flow depends on.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Accounts managed by the node itself (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<Address>, RpcError>;

    async fn chain_id(&self) -> Result<u64, RpcError>;

    async fn block_number(&self) -> Result<u64, RpcError>;

    /// Next nonce for `address`, counting transactions still in the pool.
    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError>;

    async fn gas_price(&self) -> Result<u128, RpcError>;

    async fn balance(&self, address: Address) -> Result<U256, RpcError>;

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError>;

    async fn estimate_gas(&self, call: &TransactionRequest) -> Result<u64, RpcError>;

    async fn call(&self, call: &TransactionRequest) -> Result<Bytes, RpcError>;

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError>;

    async fn transaction_receipt(&self, hash: B256)
        -> Result<Option<TransactionReceipt>, RpcError>;
}

/// JSON-RPC over HTTP through an alloy provider. Every request is bounded by the
/// configured timeout.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    provider: RootProvider,
    timeout: Duration,
}

impl HttpLedgerClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(alloy_transport::TransportErrorKind::custom(e)))?;
        let client = RpcClient::new(Http::with_client(http, url), false);
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_client(client);
        Ok(Self { provider, timeout })
    }

    async fn bounded<T, F>(&self, method: &'static str, request: F) -> Result<T, RpcError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        tracing::trace!(method, "rpc request");
        match tokio::time::timeout(self.timeout, request.into_future()).await {
            Ok(result) => result.map_err(|e| RpcError::from_transport(e, self.timeout)),
            Err(_) => Err(RpcError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.bounded("eth_accounts", self.provider.get_accounts())
            .await
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.bounded("eth_chainId", self.provider.get_chain_id())
            .await
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.bounded("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        self.bounded(
            "eth_getTransactionCount",
            self.provider
                .get_transaction_count(address)
                .block_id(BlockId::pending()),
        )
        .await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.bounded("eth_gasPrice", self.provider.get_gas_price())
            .await
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        self.bounded("eth_getBalance", self.provider.get_balance(address))
            .await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
        self.bounded("eth_getCode", self.provider.get_code_at(address))
            .await
    }

    async fn estimate_gas(&self, call: &TransactionRequest) -> Result<u64, RpcError> {
        self.bounded("eth_estimateGas", self.provider.estimate_gas(call.clone()))
            .await
    }

    async fn call(&self, call: &TransactionRequest) -> Result<Bytes, RpcError> {
        self.bounded(
            "eth_call",
            self.provider.call(call.clone()).block(BlockId::latest()),
        )
        .await
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError> {
        let pending = self
            .bounded("eth_sendRawTransaction", self.provider.send_raw_transaction(raw))
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.bounded(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(hash),
        )
        .await
    }
}
