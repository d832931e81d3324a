//! Centralized configuration (environment variables + defaults).
//!
//! | Variable                   | Default            |
//! |----------------------------|--------------------|
//! | `RPC_URL`                  | required           |
//! | `PRIVATE_KEY`              | required, or ...   |
//! | `PRIVATE_KEY_FILE`         | ... a key file     |
//! | `TOKEN_CONTRACT_ADDRESS`   | required           |
//! | `CHAIN_ID`                 | `eth_chainId`      |
//! | `GAS_PRICE_GWEI`           | `10` (`auto` asks the node) |
//! | `CONFIRMATIONS`            | `1`                |
//! | `RPC_TIMEOUT_SECS`         | `30`               |
//! | `RECEIPT_TIMEOUT_SECS`     | `120`              |
//! | `RECEIPT_POLL_INTERVAL_MS` | `2000`             |
//! | `TOKEN_DECIMALS`           | unset: base units  |

use alloy_primitives::Address;
use reqwest::Url;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::app::error::TransferError;
use crate::crypto::LocalKeySigner;
use crate::domain::{parse_address, Denomination};

const WEI_PER_GWEI: u128 = 1_000_000_000;

pub const DEFAULT_GAS_PRICE_GWEI: u128 = 10;
pub const DEFAULT_CONFIRMATIONS: u64 = 1;
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Where the gas price comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPricePolicy {
    /// Fixed price in wei.
    Fixed(u128),
    /// Ask the node (`eth_gasPrice`) for every submission.
    Network,
}

impl Default for GasPricePolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_GAS_PRICE_GWEI * WEI_PER_GWEI)
    }
}

/// Where the signing key is loaded from. The key itself never lives here for
/// longer than it takes to build the signer.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    Hex(String),
    File(String),
}

impl KeySource {
    pub fn load(&self) -> Result<LocalKeySigner, TransferError> {
        let signer = match self {
            Self::Hex(key) => LocalKeySigner::from_hex(key),
            Self::File(path) => LocalKeySigner::from_file(path),
        };
        signer.map_err(|e| TransferError::Configuration(e.to_string()))
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(_) => f.write_str("Hex(<redacted>)"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Submission behavior, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterSettings {
    pub token: Address,
    /// `None` means ask the node once and reuse the answer.
    pub chain_id: Option<u64>,
    pub gas_price: GasPricePolicy,
    pub confirmations: u64,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
    pub denomination: Denomination,
}

impl SubmitterSettings {
    pub fn new(token: Address) -> Self {
        Self {
            token,
            chain_id: None,
            gas_price: GasPricePolicy::default(),
            confirmations: DEFAULT_CONFIRMATIONS,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            denomination: Denomination::BaseUnits,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: Url,
    pub rpc_timeout: Duration,
    pub key: KeySource,
    pub submitter: SubmitterSettings,
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, TransferError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TransferError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| get(name).ok_or_else(|| missing(name));

        let rpc_url = required("RPC_URL")?;
        let rpc_url = Url::parse(&rpc_url).map_err(|e| invalid("RPC_URL", e))?;
        if !matches!(rpc_url.scheme(), "http" | "https") {
            return Err(invalid("RPC_URL", "only http(s) endpoints are supported"));
        }

        let key = match (get("PRIVATE_KEY"), get("PRIVATE_KEY_FILE")) {
            (Some(_), Some(_)) => {
                return Err(TransferError::Configuration(
                    "set only one of PRIVATE_KEY and PRIVATE_KEY_FILE".to_string(),
                ))
            }
            (Some(key), None) => KeySource::Hex(key),
            (None, Some(path)) => KeySource::File(path),
            (None, None) => return Err(missing("PRIVATE_KEY")),
        };

        let token = required("TOKEN_CONTRACT_ADDRESS")?;
        let token = parse_address(&token).map_err(|e| invalid("TOKEN_CONTRACT_ADDRESS", e))?;
        if token.is_zero() {
            return Err(invalid("TOKEN_CONTRACT_ADDRESS", "zero address"));
        }

        let chain_id = parse_opt::<u64>(get("CHAIN_ID"), "CHAIN_ID")?;
        if chain_id == Some(0) {
            return Err(invalid("CHAIN_ID", "must be non-zero"));
        }

        let gas_price = match get("GAS_PRICE_GWEI") {
            None => GasPricePolicy::default(),
            Some(v) if v.eq_ignore_ascii_case("auto") => GasPricePolicy::Network,
            Some(v) => {
                let gwei: u128 = v.parse().map_err(|e| invalid("GAS_PRICE_GWEI", e))?;
                let wei = gwei
                    .checked_mul(WEI_PER_GWEI)
                    .ok_or_else(|| invalid("GAS_PRICE_GWEI", "too large"))?;
                GasPricePolicy::Fixed(wei)
            }
        };

        let denomination = match parse_opt::<u8>(get("TOKEN_DECIMALS"), "TOKEN_DECIMALS")? {
            Some(decimals) if decimals > 77 => {
                return Err(invalid("TOKEN_DECIMALS", "uint256 holds at most 77 decimals"))
            }
            Some(decimals) => Denomination::Decimals(decimals),
            None => Denomination::BaseUnits,
        };

        let secs = |name: &str, default: Duration| -> Result<Duration, TransferError> {
            Ok(parse_opt::<u64>(get(name), name)?
                .map(Duration::from_secs)
                .unwrap_or(default))
        };
        let rpc_timeout = secs("RPC_TIMEOUT_SECS", DEFAULT_RPC_TIMEOUT)?;
        let receipt_timeout = secs("RECEIPT_TIMEOUT_SECS", DEFAULT_RECEIPT_TIMEOUT)?;
        let poll_interval = parse_opt::<u64>(
            get("RECEIPT_POLL_INTERVAL_MS"),
            "RECEIPT_POLL_INTERVAL_MS",
        )?
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL);
        if rpc_timeout.is_zero() {
            return Err(invalid("RPC_TIMEOUT_SECS", "must be non-zero"));
        }
        if poll_interval.is_zero() {
            return Err(invalid("RECEIPT_POLL_INTERVAL_MS", "must be non-zero"));
        }

        let confirmations = parse_opt::<u64>(get("CONFIRMATIONS"), "CONFIRMATIONS")?
            .unwrap_or(DEFAULT_CONFIRMATIONS);
        if confirmations > 0 && receipt_timeout.is_zero() {
            return Err(invalid(
                "RECEIPT_TIMEOUT_SECS",
                "must be non-zero while CONFIRMATIONS is above 0",
            ));
        }

        Ok(Self {
            rpc_url,
            rpc_timeout,
            key,
            submitter: SubmitterSettings {
                token,
                chain_id,
                gas_price,
                confirmations,
                receipt_timeout,
                poll_interval,
                denomination,
            },
        })
    }
}

fn missing(name: &str) -> TransferError {
    TransferError::Configuration(format!("{name} must be set"))
}

fn invalid(name: &str, reason: impl fmt::Display) -> TransferError {
    TransferError::Configuration(format!("{name} is invalid: {reason}"))
}

fn parse_opt<T>(value: Option<String>, name: &str) -> Result<Option<T>, TransferError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .map(|v| v.parse::<T>().map_err(|e| invalid(name, e)))
        .transpose()
}
