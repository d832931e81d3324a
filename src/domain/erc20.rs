//! ERC20 token contract bindings.

use alloy_primitives::{Address, Bytes, Log, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use serde::Serialize;

sol! {
    /// The subset of the ERC20 interface the transfer flow touches.
    interface IERC20 {
        /// Emitted when tokens are transferred
        event Transfer(address indexed from, address indexed to, uint256 value);

        /// Transfer tokens to recipient
        function transfer(address to, uint256 amount) external returns (bool);

        /// Get token balance of an account
        function balanceOf(address account) external view returns (uint256);

        /// Get token decimals
        function decimals() external view returns (uint8);

        /// Get token symbol
        function symbol() external view returns (string memory);
    }
}

/// ABI-encodes `transfer(to, amount)`.
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

/// Decodes `transfer(address,uint256)` call data back into its arguments.
pub fn decode_transfer(data: &[u8]) -> Option<(Address, U256)> {
    let call = IERC20::transferCall::abi_decode(data).ok()?;
    Some((call.to, call.amount))
}

/// A `Transfer` event emitted by the token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Decodes a raw log into a `Transfer` event when it was emitted by `token`.
pub fn decode_transfer_event(
    token: Address,
    emitter: Address,
    topics: &[B256],
    data: &Bytes,
) -> Option<TransferEvent> {
    if emitter != token || topics.first() != Some(&IERC20::Transfer::SIGNATURE_HASH) {
        return None;
    }
    let log = Log::new(emitter, topics.to_vec(), data.clone())?;
    let event = IERC20::Transfer::decode_log(&log).ok()?;
    Some(TransferEvent {
        from: event.from,
        to: event.to,
        value: event.value,
    })
}
