//! Inbound request parsing: validation first, then one concurrent fetch of the wallet's
//! balances and the token directory, then pure token resolution.

use crate::{
    amount::{ensure_positive_decimal, parse_units},
    balances::BalanceProvider,
    chains::networks::{chain_def, ChainDef},
    directory::DirectoryCache,
    errors::SwapError,
    quote::QuoteRequest,
    tokens::{is_native, parse_address_loose, resolve_buy_token, resolve_sell_token},
};
use alloy::primitives::Address;
use serde::Deserialize;
use std::sync::Arc;

/// A JSON value that may arrive as either a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(serde_json::Number),
    Text(String),
}

impl Numeric {
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_owned(),
        }
    }
}

/// `POST /swap` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequestBody {
    pub chain_id: Numeric,
    pub sell_token: String,
    pub buy_token: String,
    /// Decimal amount in token units, not atoms.
    pub sell_amount_before_fee: Numeric,
    pub safe_address: String,
}

/// `GET /api/tools/balances` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesQuery {
    pub chain_id: String,
    pub safe_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuoteRequest {
    pub chain_id: u64,
    pub quote_request: QuoteRequest,
}

pub fn parse_chain(raw: &str) -> Result<&'static ChainDef, SwapError> {
    let id: u64 = raw
        .trim()
        .parse()
        .map_err(|_| SwapError::invalid(format!("chainId must be a positive integer, got {raw:?}")))?;
    chain_def(id).ok_or(SwapError::UnsupportedChain(id))
}

pub fn parse_wallet(raw: &str) -> Result<Address, SwapError> {
    parse_address_loose(raw)
        .ok_or_else(|| SwapError::invalid(format!("safeAddress is not a valid address: {raw:?}")))
}

pub fn parse_balances_query(q: &BalancesQuery) -> Result<(u64, Address), SwapError> {
    let chain = parse_chain(&q.chain_id)?;
    let wallet = parse_wallet(&q.safe_address)?;
    Ok((chain.chain_id, wallet))
}

/// Turn a swap body into a [`QuoteRequest`].
///
/// Malformed input (bad amount, address, or chain) is rejected before anything is fetched.
/// A native buy token is replaced with the chain's wrapped native token.
pub async fn parse_quote_request(
    body: &SwapRequestBody,
    balances: &dyn BalanceProvider,
    directory: &Arc<DirectoryCache>,
) -> Result<ParsedQuoteRequest, SwapError> {
    let amount_text = body.sell_amount_before_fee.as_text();
    ensure_positive_decimal(&amount_text)
        .map_err(|e| SwapError::invalid(format!("sellAmountBeforeFee: {e}")))?;
    let wallet = parse_wallet(&body.safe_address)?;
    let chain = parse_chain(&body.chain_id.as_text())?;
    let chain_id = chain.chain_id;
    if body.sell_token.trim().is_empty() || body.buy_token.trim().is_empty() {
        return Err(SwapError::invalid("sellToken and buyToken are required"));
    }

    let (held, dir) = tokio::try_join!(balances.balances(chain_id, wallet), async {
        Ok::<_, SwapError>(directory.snapshot().await)
    })?;

    let sell = resolve_sell_token(&held, &body.sell_token)?;
    let buy = resolve_buy_token(chain_id, &held, &dir, &body.buy_token)?;

    let amount = parse_units(&amount_text, sell.decimals)
        .map_err(|e| SwapError::invalid(format!("sellAmountBeforeFee: {e}")))?;
    if amount.is_zero() {
        return Err(SwapError::invalid(format!(
            "sellAmountBeforeFee {amount_text} is zero in {} atoms",
            sell.symbol
        )));
    }

    let buy_token = if is_native(buy.address) {
        chain.wrapped_native
    } else {
        buy.address
    };
    let effective_sell = if is_native(sell.address) {
        chain.wrapped_native
    } else {
        sell.address
    };
    if effective_sell == buy_token {
        return Err(SwapError::invalid(format!(
            "sell and buy token are the same ({})",
            sell.symbol
        )));
    }

    tracing::debug!(
        chain_id,
        wallet = %wallet,
        sell_token = %sell.symbol,
        buy_token = %buy.symbol,
        amount = %amount,
        "parsed swap request"
    );
    Ok(ParsedQuoteRequest {
        chain_id,
        quote_request: QuoteRequest {
            chain_id,
            sell_token: sell.address,
            buy_token,
            amount,
            wallet_address: wallet,
        },
    })
}
