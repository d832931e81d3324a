pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;

// Convenience re-exports (keeps call-sites clean)
pub use app::{Stage, TransferError, TransferSubmitter};
pub use crypto::{LocalKeySigner, TransactionSigner};
pub use domain::{Denomination, TokenAmount, TransferReceipt, TransferRequest};
pub use infra::config::{Config, GasPricePolicy, SubmitterSettings};
pub use infra::rpc::{HttpLedgerClient, LedgerClient};
