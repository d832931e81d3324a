pub mod signer;

pub use signer::{LocalKeySigner, SignedTransfer, SigningError, TransactionSigner, UnsignedTransfer};
