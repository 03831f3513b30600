use crate::{
    allowance::approval_if_needed,
    amount::format_units,
    chains::{
        networks::{chain_def, swap_router_address},
        TokenReader,
    },
    errors::{is_revert_or_decode_error, swap_error_in, SwapError, TokenSide},
    order::{wrap_tx, MetaTransaction, OrderMeta, OrderSteps, SwapResponse},
    quote::{QuoteProvider, Route, RouteRequest},
    request::ParsedQuoteRequest,
    tokens::{is_native, Token},
};
use alloy::primitives::{Address, U256};
use std::sync::Arc;

/// Turns a resolved swap intent into an ordered signing request.
#[derive(Clone)]
pub struct OrderFlow {
    reader: Arc<dyn TokenReader>,
    quoter: Arc<dyn QuoteProvider>,
}

impl OrderFlow {
    pub fn new(reader: Arc<dyn TokenReader>, quoter: Arc<dyn QuoteProvider>) -> Self {
        Self { reader, quoter }
    }

    async fn token_metadata(
        &self,
        chain_id: u64,
        address: Address,
        side: TokenSide,
    ) -> Result<Token, SwapError> {
        self.reader.token(chain_id, address).await.map_err(|e| {
            if let Some(known) = swap_error_in(&e) {
                known
            } else if is_revert_or_decode_error(&e) {
                SwapError::TokenNotFound {
                    side,
                    token: address.to_checksum(None),
                    held: Vec::new(),
                }
            } else {
                SwapError::TokenMetadataUnavailable {
                    token: address,
                    reason: format!("{e:#}"),
                }
            }
        })
    }

    #[tracing::instrument(
        name = "order_flow",
        skip_all,
        fields(chain_id = parsed.chain_id, wallet = %parsed.quote_request.wallet_address)
    )]
    pub async fn run(&self, parsed: ParsedQuoteRequest) -> Result<SwapResponse, SwapError> {
        let ParsedQuoteRequest {
            chain_id,
            quote_request,
        } = parsed;
        if quote_request.amount.is_zero() {
            return Err(SwapError::invalid("sell amount must be greater than zero"));
        }
        let chain = chain_def(chain_id).ok_or(SwapError::UnsupportedChain(chain_id))?;
        let wallet = quote_request.wallet_address;
        let amount = quote_request.amount;

        // Native sells are wrapped first; everything after trades the wrapped token.
        let (wrap, sell_address) = if is_native(quote_request.sell_token) {
            (Some(wrap_tx(chain.wrapped_native, amount)), chain.wrapped_native)
        } else {
            (None, quote_request.sell_token)
        };

        let (sell, buy) = tokio::try_join!(
            self.token_metadata(chain_id, sell_address, TokenSide::Sell),
            self.token_metadata(chain_id, quote_request.buy_token, TokenSide::Buy),
        )?;

        let route = self
            .quoter
            .route(&RouteRequest {
                chain_id,
                amount_in: amount,
                token_in: sell.clone(),
                token_out: buy.clone(),
                recipient: wallet,
            })
            .await?;
        let Some(route) = route.filter(|r| !r.calldata.is_empty()) else {
            return Err(SwapError::RouteNotFound {
                chain_id,
                request: serde_json::to_string(&quote_request).unwrap_or_default(),
            });
        };

        // The router is both the approval spender and the swap target.
        let router = swap_router_address(chain_id);
        let approval =
            approval_if_needed(self.reader.as_ref(), chain_id, wallet, sell.address, router, amount)
                .await?;

        let swap = MetaTransaction::new(router, &route.calldata, route.value);
        let transaction = OrderSteps::new(chain_id, wallet)
            .wrap(wrap)
            .approve(approval)
            .swap(swap);

        tracing::info!(
            sell_token = %sell.symbol,
            buy_token = %buy.symbol,
            fee_tier = route.fee_tier,
            amount_out = %route.amount_out,
            steps = transaction.params.len(),
            "built swap"
        );

        Ok(SwapResponse {
            transaction,
            meta: OrderMeta {
                order_data: order_summary(&sell, &buy, amount, &route),
            },
        })
    }
}

fn fee_percent(fee: u32) -> String {
    format!("{}.{:02}%", fee / 10_000, (fee % 10_000) / 100)
}

/// Human-readable summary returned alongside the transactions.
fn order_summary(sell: &Token, buy: &Token, amount_in: U256, route: &Route) -> String {
    let deadline = i64::try_from(route.deadline)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map_or_else(|| route.deadline.to_string(), |d| d.to_rfc3339());
    format!(
        "Swap {} {} for at least {} {} via Uniswap V3 ({} pool), valid until {}",
        format_units(amount_in, sell.decimals),
        sell.symbol,
        format_units(route.amount_out_min, buy.decimals),
        buy.symbol,
        fee_percent(route.fee_tier),
        deadline,
    )
}
