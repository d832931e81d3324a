pub mod client;
pub mod types;

pub use client::{HttpLedgerClient, LedgerClient};
pub use types::{call_request, Log, RpcError, TransactionReceipt, TransactionRequest};
