//! Error taxonomy of the transfer flow.

use alloy_primitives::{Bytes, B256};
use alloy_sol_types::decode_revert_reason;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::crypto::SigningError;
use crate::domain::ValidationError;
use crate::infra::rpc::RpcError;

/// Stages a submission moves through. None is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Before anything was sent anywhere: config, validation, chain id and nonce lookups.
    Built,
    Estimated,
    Signed,
    Broadcast,
    Confirmed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Built => "built",
            Self::Estimated => "estimated",
            Self::Signed => "signed",
            Self::Broadcast => "broadcast",
            Self::Confirmed => "confirmed",
        })
    }
}

/// Why a broadcast transaction could not be confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionTimeout {
    /// `eth_sendRawTransaction` itself timed out; the node may or may not have it.
    Broadcast(Duration),
    /// The node accepted it, but no receipt (or not enough confirmations) in time.
    Receipt(Duration),
}

impl fmt::Display for InclusionTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast(d) => write!(f, "broadcast timed out after {d:?}"),
            Self::Receipt(d) => write!(f, "not confirmed within {d:?}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid transfer: {0}")]
    Validation(#[from] ValidationError),

    #[error("gas estimation failed: {reason}")]
    Estimation {
        reason: String,
        revert_data: Option<Bytes>,
    },

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("network error while {stage}: {source}")]
    Network {
        stage: Stage,
        #[source]
        source: RpcError,
    },

    #[error("transaction rejected by the node: {message} (code {code})")]
    Rejected { code: i64, message: String },

    /// The transaction left this process but its fate is unknown. It may still be
    /// included later, so the caller must check `tx_hash` before sending again.
    #[error("transaction {tx_hash} not confirmed: {timeout}")]
    Inclusion {
        tx_hash: B256,
        timeout: InclusionTimeout,
    },
}

impl TransferError {
    /// The last stage the submission completed before failing. A broadcast only
    /// counts once the node acknowledged it.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) | Self::Validation(_) => Stage::Built,
            Self::Estimation { .. } => Stage::Built,
            Self::Signing(_) => Stage::Estimated,
            Self::Network { stage, .. } => *stage,
            Self::Rejected { .. } => Stage::Signed,
            Self::Inclusion {
                timeout: InclusionTimeout::Broadcast(_),
                ..
            } => Stage::Signed,
            Self::Inclusion {
                timeout: InclusionTimeout::Receipt(_),
                ..
            } => Stage::Broadcast,
        }
    }

    /// Whether the signed transaction may have reached the network.
    pub fn possibly_broadcast(&self) -> bool {
        match self {
            Self::Inclusion { .. } => true,
            Self::Network { stage, .. } => *stage >= Stage::Signed,
            _ => false,
        }
    }

    pub(crate) fn network(stage: Stage, source: RpcError) -> Self {
        Self::Network { stage, source }
    }

    /// Maps an `eth_estimateGas` failure. Only a node-side rejection is an
    /// estimation failure; transport problems stay network errors.
    pub(crate) fn from_estimation(source: RpcError) -> Self {
        match source {
            RpcError::Rpc { message, data, .. } => {
                let reason = data
                    .as_ref()
                    .and_then(|d| decode_revert_reason(d))
                    .unwrap_or(message);
                Self::Estimation {
                    reason,
                    revert_data: data,
                }
            }
            other => Self::network(Stage::Built, other),
        }
    }

    /// Maps an `eth_sendRawTransaction` failure.
    pub(crate) fn from_broadcast(tx_hash: B256, source: RpcError) -> Self {
        match source {
            RpcError::Timeout(d) => Self::Inclusion {
                tx_hash,
                timeout: InclusionTimeout::Broadcast(d),
            },
            RpcError::Rpc { code, message, .. } => Self::Rejected { code, message },
            other => Self::network(Stage::Signed, other),
        }
    }
}
