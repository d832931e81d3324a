//! Transfer domain: requests, contract bindings and receipts.

pub mod erc20;
pub mod receipt;
pub mod request;

pub use erc20::{encode_transfer, TransferEvent, IERC20};
pub use receipt::{InclusionStatus, TransferReceipt};
pub use request::{parse_address, Denomination, TokenAmount, TransferRequest, ValidationError};
