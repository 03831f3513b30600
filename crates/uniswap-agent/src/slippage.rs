//! Slippage tolerance on quoted amounts.
//!
//! A SELL order fixes the input and protects the output (minimum received); a BUY order fixes
//! the output and protects the input (maximum spent). All math is integer basis points.

use alloy::primitives::U256;

pub const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Sell,
    Buy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedAmounts {
    pub kind: OrderKind,
    pub sell_amount: U256,
    pub buy_amount: U256,
}

/// The one side of a quote that slippage adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlippageBound {
    /// Minimum acceptable `buy_amount` for a SELL order.
    MinBuyAmount(U256),
    /// Maximum acceptable `sell_amount` for a BUY order.
    MaxSellAmount(U256),
}

impl SlippageBound {
    pub const fn amount(self) -> U256 {
        match self {
            Self::MinBuyAmount(v) | Self::MaxSellAmount(v) => v,
        }
    }
}

pub fn apply_slippage(quote: &QuotedAmounts, bps: u32) -> SlippageBound {
    match quote.kind {
        OrderKind::Sell => {
            SlippageBound::MinBuyAmount(scale_bps(quote.buy_amount, BPS_DENOMINATOR.saturating_sub(bps)))
        }
        OrderKind::Buy => {
            SlippageBound::MaxSellAmount(scale_bps(quote.sell_amount, BPS_DENOMINATOR.saturating_add(bps)))
        }
    }
}

/// `floor(amount * factor_bps / 10_000)` without a full-width intermediate product.
///
/// Splitting `amount` into quotient and remainder by the denominator keeps every partial
/// product in range; only a result that truly exceeds `U256::MAX` saturates.
fn scale_bps(amount: U256, factor_bps: u32) -> U256 {
    let denom = U256::from(BPS_DENOMINATOR);
    let factor = U256::from(factor_bps);
    let whole = (amount / denom).saturating_mul(factor);
    let part = (amount % denom) * factor / denom;
    whole.saturating_add(part)
}

/// Minimum output for an exact-input swap quote.
pub fn min_out(amount_out: U256, bps: u32) -> U256 {
    apply_slippage(
        &QuotedAmounts {
            kind: OrderKind::Sell,
            sell_amount: U256::ZERO,
            buy_amount: amount_out,
        },
        bps,
    )
    .amount()
}
