use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use thiserror::Error;

/// Which side of the swap a token identifier was supplied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSide {
    Sell,
    Buy,
}

impl fmt::Display for TokenSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sell => f.write_str("sell"),
            Self::Buy => f.write_str("buy"),
        }
    }
}

fn held_suffix(held: &[String]) -> String {
    if held.is_empty() {
        String::new()
    } else {
        format!(" (wallet holds: {})", held.join(", "))
    }
}

/// Every way a swap or balances request can fail.
#[derive(Debug, Error, Clone)]
pub enum SwapError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported chain id: {0}")]
    UnsupportedChain(u64),

    #[error("{side} token not found: {token}{}", held_suffix(.held))]
    TokenNotFound {
        side: TokenSide,
        token: String,
        held: Vec<String>,
    },

    #[error("no route found on chain {chain_id} for {request}")]
    RouteNotFound { chain_id: u64, request: String },

    #[error("quote provider unavailable: {0}")]
    QuoteProviderUnavailable(String),

    #[error("balance provider unavailable: {0}")]
    BalanceProviderUnavailable(String),

    #[error("allowance check failed for token {token}: {reason}")]
    AllowanceCheckFailed { token: Address, reason: String },

    #[error("allowance read failed for token {token}: {reason}")]
    AllowanceUnavailable { token: Address, reason: String },

    #[error("token metadata unavailable for {token}: {reason}")]
    TokenMetadataUnavailable { token: Address, reason: String },

    #[error("service misconfigured: {0}")]
    EnvMisconfigured(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl SwapError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UnsupportedChain(_) => "unsupported_chain",
            Self::TokenNotFound { .. } => "token_not_found",
            Self::RouteNotFound { .. } => "route_not_found",
            Self::QuoteProviderUnavailable(_) => "quote_provider_unavailable",
            Self::BalanceProviderUnavailable(_) => "balance_provider_unavailable",
            Self::AllowanceCheckFailed { .. } => "allowance_check_failed",
            Self::AllowanceUnavailable { .. } => "allowance_unavailable",
            Self::TokenMetadataUnavailable { .. } => "token_metadata_unavailable",
            Self::EnvMisconfigured(_) => "env_misconfigured",
            Self::Timeout(_) => "timeout",
        }
    }

    /// HTTP status for the transport boundary. Client-side failures are 400, upstream faults 5xx.
    pub const fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_)
            | Self::UnsupportedChain(_)
            | Self::TokenNotFound { .. }
            | Self::RouteNotFound { .. }
            | Self::AllowanceCheckFailed { .. } => 400,
            Self::QuoteProviderUnavailable(_)
            | Self::BalanceProviderUnavailable(_)
            | Self::AllowanceUnavailable { .. }
            | Self::TokenMetadataUnavailable { .. } => 502,
            Self::EnvMisconfigured(_) => 503,
            Self::Timeout(_) => 504,
        }
    }
}

/// Wire shape of a failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl ErrorBody {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_owned(),
        }
    }
}

impl From<&SwapError> for ErrorBody {
    fn from(e: &SwapError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

/// Heuristic split between "the contract said no" and "the node could not be reached".
///
/// Reverts and ABI decoding failures (calling a non-contract returns empty data) are
/// deterministic for a given input; everything else is treated as a transport fault.
pub fn is_revert_or_decode_error(err: &eyre::Report) -> bool {
    let s = format!("{err:#}").to_lowercase();
    s.contains("revert")
        || s.contains("zero data")
        || s.contains("abi decod")
        || s.contains("buffer overrun")
        || s.contains("invalid opcode")
        || s.contains("type check failed")
}

/// A [`SwapError`] raised before any RPC call (unsupported chain, no configured URL) and
/// carried inside a report.
pub fn swap_error_in(err: &eyre::Report) -> Option<SwapError> {
    err.downcast_ref::<SwapError>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_not_found_lists_held_symbols() {
        let e = SwapError::TokenNotFound {
            side: TokenSide::Sell,
            token: "USDT".to_owned(),
            held: vec!["ETH".to_owned(), "USDC".to_owned()],
        };
        let s = e.to_string();
        assert!(s.contains("sell token not found: USDT"), "got {s}");
        assert!(s.contains("ETH, USDC"), "got {s}");
        assert_eq!(e.status(), 400, "token errors are client errors");
    }

    #[test]
    fn upstream_faults_are_5xx() {
        assert_eq!(
            SwapError::QuoteProviderUnavailable("x".into()).status(),
            502,
            "quote outage"
        );
        assert_eq!(
            SwapError::BalanceProviderUnavailable("x".into()).status(),
            502,
            "balance outage"
        );
        assert_eq!(
            SwapError::AllowanceUnavailable {
                token: Address::ZERO,
                reason: "x".into()
            }
            .status(),
            502,
            "allowance outage"
        );
        assert_eq!(
            SwapError::EnvMisconfigured("ANKR_API_KEY".into()).status(),
            503,
            "misconfigured"
        );
        assert_eq!(
            SwapError::Timeout(Duration::from_secs(3)).status(),
            504,
            "timeout"
        );
    }

    #[test]
    fn error_body_carries_code() {
        let e = SwapError::UnsupportedChain(999);
        let body = ErrorBody::from(&e);
        assert_eq!(body.code, "unsupported_chain", "code");
        assert_eq!(body.error, "unsupported chain id: 999", "message");
    }

    #[test]
    fn wrapped_swap_error_is_recovered() {
        let report = eyre::Report::new(SwapError::EnvMisconfigured("no rpc url configured for chain 1".into()));
        let got = swap_error_in(&report);
        assert!(
            matches!(got, Some(SwapError::EnvMisconfigured(_))),
            "got {got:?}"
        );
        assert!(
            swap_error_in(&eyre::eyre!("connection refused")).is_none(),
            "plain report"
        );
    }

    #[test]
    fn classifies_reverts() {
        assert!(
            is_revert_or_decode_error(&eyre::eyre!("server returned an error response: execution reverted")),
            "revert"
        );
        assert!(
            is_revert_or_decode_error(&eyre::eyre!("contract call to `decimals` returned no data (\"0x\"); zero data")),
            "empty return"
        );
        assert!(
            !is_revert_or_decode_error(&eyre::eyre!("error sending request: connection refused")),
            "transport"
        );
    }
}
