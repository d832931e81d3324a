//! Errors of the ledger client, mapped from the alloy transport.

use alloy_primitives::{Address, Bytes};
use alloy_transport::{TransportError, TransportErrorKind};
use std::time::Duration;
use thiserror::Error;

pub use alloy_rpc_types_eth::{Log, TransactionInput, TransactionReceipt, TransactionRequest};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
    #[error("endpoint answered with HTTP {0}")]
    HttpStatus(u16),
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Bytes>,
    },
}

impl RpcError {
    /// The node answered, so the request itself was delivered and rejected.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }

    pub(crate) fn from_transport(err: TransportError, timeout: Duration) -> Self {
        match err {
            TransportError::ErrorResp(payload) => Self::Rpc {
                code: payload.code,
                data: payload.as_revert_data(),
                message: payload.message.into_owned(),
            },
            // Some gateways answer errors with an HTML page; report the status instead.
            TransportError::Transport(TransportErrorKind::HttpError(http)) => {
                Self::HttpStatus(http.status)
            }
            TransportError::Transport(TransportErrorKind::Custom(ref inner))
                if inner
                    .downcast_ref::<reqwest::Error>()
                    .is_some_and(reqwest::Error::is_timeout) =>
            {
                Self::Timeout(timeout)
            }
            other => Self::Transport(other),
        }
    }
}

/// A read-only call (`eth_call`, `eth_estimateGas`) against `to`.
pub fn call_request(from: Option<Address>, to: Address, data: Bytes) -> TransactionRequest {
    let request = TransactionRequest::default()
        .to(to)
        .input(TransactionInput::new(data));
    match from {
        Some(from) => request.from(from),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_rpc::ErrorPayload;

    fn error_response(body: &str) -> RpcError {
        let payload: ErrorPayload = serde_json::from_str(body).unwrap();
        RpcError::from_transport(TransportError::ErrorResp(payload), Duration::from_secs(1))
    }

    #[test]
    fn revert_data_shapes() {
        let flat = error_response(r#"{"code":3,"message":"execution reverted","data":"0x08c379a0"}"#);
        match flat {
            RpcError::Rpc { code, data, .. } => {
                assert_eq!(code, 3);
                assert_eq!(data, Some(Bytes::from(vec![0x08, 0xc3, 0x79, 0xa0])));
            }
            other => panic!("unexpected {other}"),
        }

        let nested = error_response(
            r#"{"code":-32000,"message":"execution reverted","data":{"data":"0x01"}}"#,
        );
        assert!(
            matches!(nested, RpcError::Rpc { data: Some(ref d), .. } if d[..] == [0x01]),
            "{nested}"
        );

        let none = error_response(r#"{"code":-32000,"message":"insufficient funds"}"#);
        assert!(none.is_rejection());
        assert!(
            matches!(none, RpcError::Rpc { data: None, ref message, .. } if message == "insufficient funds"),
            "{none}"
        );
    }

    #[test]
    fn http_errors_keep_the_status() {
        let err = RpcError::from_transport(
            TransportErrorKind::http_error(502, "<html>bad gateway</html>".into()),
            Duration::from_secs(1),
        );
        assert!(matches!(err, RpcError::HttpStatus(502)));
        assert!(!err.is_rejection());
    }

    #[test]
    fn call_request_shape() {
        let call = call_request(None, Address::ZERO, Bytes::from(vec![0xa9]));
        let value = serde_json::to_value(&call).unwrap();
        assert!(value.get("from").is_none());
        assert_eq!(value["to"], "0x0000000000000000000000000000000000000000");
        assert_eq!(value["input"], "0xa9");
    }
}
