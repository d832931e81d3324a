//! In-process mock JSON-RPC node for the integration tests.

#![allow(dead_code)]

use alloy_consensus::TxEnvelope;
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{Revert, SolCall, SolError, SolEvent};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use erc20_transfer::domain::erc20::decode_transfer;
use erc20_transfer::domain::IERC20;
use erc20_transfer::crypto::{SignedTransfer, SigningError, UnsignedTransfer};
use erc20_transfer::{LocalKeySigner, SubmitterSettings, TransactionSigner};

// Well-known development key (anvil/hardhat account #0).
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
pub const TOKEN: Address = address!("c8eb86f06bc7ca8fed2ce9709a80529ad30e9108");
pub const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";
pub const CHAIN_ID: u64 = 534351;
pub const GWEI: u128 = 1_000_000_000;

/// How the mock node answers.
#[derive(Debug, Clone)]
pub struct Behavior {
    pub nonce: u64,
    /// When false the pending count includes transactions the mock accepted.
    pub stale_nonce: bool,
    pub gas_estimate: u64,
    pub estimate_revert: Option<String>,
    pub gas_price: u128,
    pub send_delay: Option<Duration>,
    pub send_error: Option<(i64, String)>,
    /// Receipt polls answered with `null` before the receipt appears.
    pub receipt_after_polls: u64,
    pub receipt_status: u64,
    pub inclusion_block: u64,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            nonce: 5,
            stale_nonce: false,
            gas_estimate: 21_000,
            estimate_revert: None,
            gas_price: 3 * GWEI,
            send_delay: None,
            send_error: None,
            receipt_after_polls: 0,
            receipt_status: 1,
            inclusion_block: 100,
        }
    }
}

#[derive(Default)]
pub struct MockNode {
    pub behavior: Behavior,
    calls: Mutex<Vec<(String, Value)>>,
    accepted: Mutex<Vec<Bytes>>,
    receipt_polls: Mutex<HashMap<B256, u64>>,
    /// Advances by one on every `eth_blockNumber`.
    head: AtomicU64,
}

impl MockNode {
    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Signed transactions the node accepted, decoded.
    pub fn accepted(&self) -> Vec<TxEnvelope> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|raw| TxEnvelope::decode_2718(&mut &raw[..]).unwrap())
            .collect()
    }

    fn answer(&self, method: &str, params: &Value) -> Result<Value, Value> {
        let b = &self.behavior;
        match method {
            "eth_chainId" => Ok(json!(format!("{CHAIN_ID:#x}"))),
            "eth_accounts" => Ok(json!([])),
            "eth_blockNumber" => {
                let head = self.head.fetch_add(1, Ordering::SeqCst) + b.inclusion_block;
                Ok(json!(format!("{head:#x}")))
            }
            "eth_getTransactionCount" => {
                let accepted = if b.stale_nonce {
                    0
                } else {
                    self.accepted.lock().unwrap().len() as u64
                };
                Ok(json!(format!("{:#x}", b.nonce + accepted)))
            }
            "eth_gasPrice" => Ok(json!(format!("{:#x}", b.gas_price))),
            "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
            "eth_getCode" => {
                let at: Address = params[0].as_str().unwrap().parse().unwrap();
                Ok(json!(if at == TOKEN { "0x6080604052" } else { "0x" }))
            }
            "eth_call" => {
                let call = &params[0];
                let data: Bytes = call["input"]
                    .as_str()
                    .or_else(|| call["data"].as_str())
                    .unwrap()
                    .parse()
                    .unwrap();
                let word = if data.starts_with(&IERC20::balanceOfCall::SELECTOR) {
                    U256::from(1_000)
                } else {
                    U256::ZERO
                };
                Ok(json!(Bytes::from(word.to_be_bytes::<32>().to_vec())))
            }
            "eth_estimateGas" => match &b.estimate_revert {
                Some(reason) => {
                    let data = Revert {
                        reason: reason.clone(),
                    }
                    .abi_encode();
                    Err(json!({
                        "code": 3,
                        "message": "execution reverted",
                        "data": format!("0x{}", hex::encode(data)),
                    }))
                }
                None => Ok(json!(format!("{:#x}", b.gas_estimate))),
            },
            "eth_sendRawTransaction" => {
                if let Some((code, message)) = &b.send_error {
                    return Err(json!({ "code": code, "message": message }));
                }
                let raw: Bytes = params[0].as_str().unwrap().parse().unwrap();
                let hash = keccak256(&raw);
                self.accepted.lock().unwrap().push(raw);
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                let hash: B256 = params[0].as_str().unwrap().parse().unwrap();
                let polls = {
                    let mut map = self.receipt_polls.lock().unwrap();
                    let n = map.entry(hash).or_default();
                    *n += 1;
                    *n
                };
                if polls <= b.receipt_after_polls {
                    return Ok(Value::Null);
                }
                Ok(self.receipt_for(hash).unwrap_or(Value::Null))
            }
            other => Err(json!({ "code": -32601, "message": format!("method {other} not found") })),
        }
    }

    fn receipt_for(&self, hash: B256) -> Option<Value> {
        let accepted = self.accepted.lock().unwrap();
        let raw = accepted.iter().find(|raw| keccak256(raw) == hash)?;
        let TxEnvelope::Legacy(signed) = TxEnvelope::decode_2718(&mut &raw[..]).ok()? else {
            return None;
        };
        let tx = signed.tx();
        let (to, amount) = decode_transfer(&tx.input)?;
        let token = tx.to.to().copied()?;

        let block_hash = B256::repeat_byte(0xbb);
        let block_number = format!("{:#x}", self.behavior.inclusion_block);
        let gas_used = format!("{:#x}", self.behavior.gas_estimate - 1_000);
        let logs = if self.behavior.receipt_status == 1 {
            json!([{
                "address": token,
                "topics": [
                    IERC20::Transfer::SIGNATURE_HASH,
                    DEV_ADDRESS.into_word(),
                    to.into_word(),
                ],
                "data": Bytes::from(amount.to_be_bytes::<32>().to_vec()),
                "blockHash": block_hash,
                "blockNumber": block_number,
                "transactionHash": hash,
                "transactionIndex": "0x0",
                "logIndex": "0x0",
                "removed": false,
            }])
        } else {
            json!([])
        };

        Some(json!({
            "type": "0x0",
            "status": format!("{:#x}", self.behavior.receipt_status),
            "cumulativeGasUsed": gas_used,
            "logs": logs,
            "logsBloom": Bytes::from(vec![0u8; 256]),
            "transactionHash": hash,
            "transactionIndex": "0x0",
            "blockHash": block_hash,
            "blockNumber": block_number,
            "gasUsed": gas_used,
            "effectiveGasPrice": format!("{:#x}", tx.gas_price),
            "from": DEV_ADDRESS,
            "to": token,
            "contractAddress": null,
        }))
    }
}

async fn rpc(State(node): State<Arc<MockNode>>, Json(req): Json<Value>) -> Json<Value> {
    let method = req["method"].as_str().unwrap_or_default().to_string();
    let params = req["params"].clone();
    node.calls.lock().unwrap().push((method.clone(), params.clone()));

    if method == "eth_sendRawTransaction" {
        if let Some(delay) = node.behavior.send_delay {
            tokio::time::sleep(delay).await;
        }
    }

    let body = match node.answer(&method, &params) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": req["id"], "error": error }),
    };
    Json(body)
}

/// Starts a mock node on an ephemeral port and returns its URL.
pub async fn spawn_node(behavior: Behavior) -> (reqwest::Url, Arc<MockNode>) {
    let node = Arc::new(MockNode {
        behavior,
        ..Default::default()
    });
    let app = Router::new()
        .route("/", post(rpc))
        .with_state(node.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = format!("http://{addr}/").parse().unwrap();
    (url, node)
}

pub fn signer() -> LocalKeySigner {
    LocalKeySigner::from_hex(DEV_KEY).unwrap()
}

pub fn settings() -> SubmitterSettings {
    let mut settings = SubmitterSettings::new(TOKEN);
    settings.poll_interval = Duration::from_millis(10);
    settings.receipt_timeout = Duration::from_secs(5);
    settings
}

/// The dev key behind a counter; optionally refuses to sign.
pub struct CountingSigner {
    inner: LocalKeySigner,
    refuse: bool,
    calls: AtomicUsize,
}

impl CountingSigner {
    pub fn new() -> Self {
        Self {
            inner: signer(),
            refuse: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransactionSigner for CountingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign_transaction(&self, tx: UnsignedTransfer) -> Result<SignedTransfer, SigningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(SigningError::InvalidKey("key store locked".into()));
        }
        self.inner.sign_transaction(tx)
    }
}
