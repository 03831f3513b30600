use crate::{
    chains::{
        evm::{exact_input_single_calldata, EvmRpc, ExactInputSingle},
        networks::chain_def,
    },
    errors::{is_revert_or_decode_error, SwapError},
    slippage::min_out,
    tokens::Token,
};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Uniswap V3 pool fee tiers, in hundredths of a bip.
pub const FEE_TIERS: [u32; 4] = [100, 500, 3000, 10_000];

/// Resolved swap intent handed from request parsing to the order flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub sell_token: Address,
    pub buy_token: Address,
    /// Sell amount in atoms. Never zero.
    pub amount: U256,
    pub wallet_address: Address,
}

#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub chain_id: u64,
    pub amount_in: U256,
    pub token_in: Token,
    pub token_out: Token,
    pub recipient: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub calldata: Bytes,
    pub value: U256,
    pub amount_out: U256,
    pub amount_out_min: U256,
    pub fee_tier: u32,
    pub deadline: u64,
}

/// Prices a swap and encodes the router call. `Ok(None)` means no liquidity.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn route(&self, req: &RouteRequest) -> Result<Option<Route>, SwapError>;
}

/// Best single-pool route across [`FEE_TIERS`], quoted through QuoterV2 and executed through
/// SwapRouter02.
#[derive(Debug, Clone)]
pub struct UniswapV3Quoter {
    evm: Arc<EvmRpc>,
    slippage_bps: u32,
    deadline_seconds: u64,
}

impl UniswapV3Quoter {
    pub const fn new(evm: Arc<EvmRpc>, slippage_bps: u32, deadline_seconds: u64) -> Self {
        Self {
            evm,
            slippage_bps,
            deadline_seconds,
        }
    }

    fn deadline(&self) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        now.saturating_add(self.deadline_seconds)
    }
}

/// Collapse per-tier quote outcomes into the best tier.
///
/// Any positive quote wins. With no quote at all, a transport failure on some tier means the
/// answer is unknown, while reverts everywhere mean there is no pool.
fn pick_best_tier(
    outcomes: Vec<(u32, eyre::Result<U256>)>,
) -> Result<Option<(u32, U256)>, SwapError> {
    let mut best: Option<(u32, U256)> = None;
    let mut transport_err: Option<eyre::Report> = None;
    for (fee, outcome) in outcomes {
        match outcome {
            Ok(out) if out.is_zero() => {}
            Ok(out) => {
                if best.is_none_or(|(_, b)| out > b) {
                    best = Some((fee, out));
                }
            }
            Err(e) if is_revert_or_decode_error(&e) => {
                tracing::debug!(fee_tier = fee, error = %format!("{e:#}"), "no pool at fee tier");
            }
            Err(e) => {
                tracing::warn!(fee_tier = fee, error = %format!("{e:#}"), "quote failed at fee tier");
                transport_err.get_or_insert(e);
            }
        }
    }
    match (best, transport_err) {
        (Some(b), _) => Ok(Some(b)),
        (None, Some(e)) => Err(SwapError::QuoteProviderUnavailable(format!("{e:#}"))),
        (None, None) => Ok(None),
    }
}

#[async_trait]
impl QuoteProvider for UniswapV3Quoter {
    async fn route(&self, req: &RouteRequest) -> Result<Option<Route>, SwapError> {
        let def = chain_def(req.chain_id).ok_or(SwapError::UnsupportedChain(req.chain_id))?;
        let chain = self.evm.chain(req.chain_id)?;
        let token_in = req.token_in.address;
        let token_out = req.token_out.address;
        let quote = |fee: u32| {
            let chain = &chain;
            async move {
                let r = chain
                    .quote_exact_input_single(def.quoter_v2, token_in, token_out, req.amount_in, fee)
                    .await;
                (fee, r)
            }
        };
        let [t0, t1, t2, t3] = FEE_TIERS;
        let (a, b, c, d) = tokio::join!(quote(t0), quote(t1), quote(t2), quote(t3));

        let Some((fee_tier, amount_out)) = pick_best_tier(vec![a, b, c, d])? else {
            return Ok(None);
        };
        let route = assemble_route(req, fee_tier, amount_out, self.slippage_bps, self.deadline());
        tracing::info!(
            chain_id = req.chain_id,
            fee_tier,
            amount_in = %req.amount_in,
            amount_out = %amount_out,
            amount_out_min = %route.amount_out_min,
            "uniswap v3 route"
        );
        Ok(Some(route))
    }
}

/// Router call for the winning tier, with the slippage floor and deadline baked in.
fn assemble_route(
    req: &RouteRequest,
    fee_tier: u32,
    amount_out: U256,
    slippage_bps: u32,
    deadline: u64,
) -> Route {
    let amount_out_min = min_out(amount_out, slippage_bps);
    let calldata = exact_input_single_calldata(&ExactInputSingle {
        token_in: req.token_in.address,
        token_out: req.token_out.address,
        fee: fee_tier,
        recipient: req.recipient,
        amount_in: req.amount_in,
        amount_out_min,
        deadline,
    });
    Route {
        calldata,
        value: U256::ZERO,
        amount_out,
        amount_out_min,
        fee_tier,
        deadline,
    }
}
