// Local transaction signing. Nothing in this file touches the network.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("chain id must be non-zero")]
    MissingChainId,
    #[error(transparent)]
    Signer(#[from] alloy_signer::Error),
}

/// Everything a signer needs to authorize one token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsignedTransfer {
    pub chain_id: u64,
    pub nonce: u64,
    /// The token contract, never the token recipient.
    pub to: Address,
    pub input: Bytes,
    pub gas_limit: u64,
    pub gas_price: u128,
}

impl UnsignedTransfer {
    fn to_legacy(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(self.to),
            value: U256::ZERO,
            input: self.input.clone(),
        }
    }
}

/// A signed, EIP-2718 encoded transfer ready for `eth_sendRawTransaction`.
///
/// Single-use: broadcasting the same envelope twice is a replay of the same nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub hash: B256,
    pub from: Address,
    pub raw: Bytes,
    pub tx: UnsignedTransfer,
}

/// Holds key material and turns unsigned transfers into signed envelopes.
pub trait TransactionSigner: Send + Sync {
    /// Address derived from the held key.
    fn address(&self) -> Address;

    fn sign_transaction(&self, tx: UnsignedTransfer) -> Result<SignedTransfer, SigningError>;
}

/// secp256k1 signer backed by an in-memory private key.
#[derive(Clone)]
pub struct LocalKeySigner {
    inner: PrivateKeySigner,
}

impl LocalKeySigner {
    /// Parses a 32-byte hex key, with or without a `0x` prefix.
    pub fn from_hex(key: &str) -> Result<Self, SigningError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let bytes = hex::decode(key)
            .map_err(|_| SigningError::InvalidKey("expected 32 bytes of hex".to_string()))?;
        if bytes.len() != 32 {
            return Err(SigningError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let inner = PrivateKeySigner::from_slice(&bytes)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Reads a hex key from a file. `~` is expanded.
    pub fn from_file(path: &str) -> Result<Self, SigningError> {
        let expanded = shellexpand::tilde(path).to_string();
        let content = std::fs::read_to_string(Path::new(&expanded)).map_err(|source| {
            SigningError::KeyFile {
                path: expanded.clone(),
                source,
            }
        })?;
        Self::from_hex(&content)
    }
}

impl fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.inner.address())
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign_transaction(&self, tx: UnsignedTransfer) -> Result<SignedTransfer, SigningError> {
        if tx.chain_id == 0 {
            return Err(SigningError::MissingChainId);
        }

        let legacy = tx.to_legacy();
        let signature = self.inner.sign_hash_sync(&legacy.signature_hash())?;
        let signed = legacy.into_signed(signature);
        let hash = *signed.hash();
        let envelope = TxEnvelope::from(signed);

        Ok(SignedTransfer {
            hash,
            from: self.inner.address(),
            raw: envelope.encoded_2718().into(),
            tx,
        })
    }
}
