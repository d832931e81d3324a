//! Validated transfer intents.
//!
//! Everything here is pure: a `TransferRequest` can only be built from input that
//! passed validation, so the submitter never issues an RPC call for a malformed one.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Input that was rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("recipient address is empty")]
    EmptyRecipient,
    #[error("recipient `{0}` is not a 20-byte hex address")]
    MalformedRecipient(String),
    #[error("recipient `{0}` fails its EIP-55 checksum")]
    BadChecksum(String),
    #[error("recipient is the zero address")]
    ZeroRecipient,
    #[error("amount is empty")]
    EmptyAmount,
    #[error("amount `{0}` is negative")]
    NegativeAmount(String),
    #[error("amount `{0}` is not a non-negative integer")]
    NotAnInteger(String),
    #[error("amount `{amount}` has more than {decimals} fractional digits")]
    TooPrecise { amount: String, decimals: u8 },
    #[error("amount `{0}` does not fit in uint256")]
    Overflow(String),
}

/// How the caller expresses an amount.
///
/// Tokens are always moved in their smallest unit on chain; `Decimals` scales a
/// human value such as `1.5` by `10^decimals` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Denomination {
    #[default]
    BaseUnits,
    Decimals(u8),
}

/// Token amount in the token's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TokenAmount(U256);

impl TokenAmount {
    pub const fn base_units(&self) -> U256 {
        self.0
    }

    /// Parses an amount string under the given denomination.
    pub fn parse(input: &str, denomination: Denomination) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError::EmptyAmount);
        }
        if s.starts_with('-') {
            return Err(ValidationError::NegativeAmount(s.to_string()));
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
            return Err(ValidationError::NotAnInteger(s.to_string()));
        }

        let digits = match denomination {
            Denomination::BaseUnits => {
                // "100.000" is still an integer; "100.5" is not.
                if fraction.bytes().any(|b| b != b'0') {
                    return Err(ValidationError::NotAnInteger(s.to_string()));
                }
                whole.to_string()
            }
            Denomination::Decimals(decimals) => {
                let fraction = fraction.trim_end_matches('0');
                if fraction.len() > decimals as usize {
                    return Err(ValidationError::TooPrecise {
                        amount: s.to_string(),
                        decimals,
                    });
                }
                format!("{whole}{fraction:0<width$}", width = decimals as usize)
            }
        };

        U256::from_str_radix(&digits, 10)
            .map(Self)
            .map_err(|_| ValidationError::Overflow(s.to_string()))
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parses a recipient address.
///
/// All-lowercase and all-uppercase hex are accepted as-is; mixed case must carry a
/// valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Result<Address, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError::EmptyRecipient);
    }
    let hex_part = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| ValidationError::MalformedRecipient(s.to_string()))?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ValidationError::MalformedRecipient(s.to_string()));
    }

    let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let normalized = format!("0x{hex_part}");
        return Address::parse_checksummed(&normalized, None)
            .map_err(|_| ValidationError::BadChecksum(s.to_string()));
    }

    Address::from_str(hex_part).map_err(|_| ValidationError::MalformedRecipient(s.to_string()))
}

/// Intent to move `amount` tokens to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    recipient: Address,
    amount: TokenAmount,
}

impl TransferRequest {
    pub fn new(recipient: Address, amount: TokenAmount) -> Result<Self, ValidationError> {
        if recipient.is_zero() {
            return Err(ValidationError::ZeroRecipient);
        }
        Ok(Self { recipient, amount })
    }

    /// Validates raw caller input.
    pub fn parse(
        recipient: &str,
        amount: &str,
        denomination: Denomination,
    ) -> Result<Self, ValidationError> {
        let recipient = parse_address(recipient)?;
        let amount = TokenAmount::parse(amount, denomination)?;
        Self::new(recipient, amount)
    }

    pub const fn recipient(&self) -> Address {
        self.recipient
    }

    pub const fn amount(&self) -> TokenAmount {
        self.amount
    }
}
