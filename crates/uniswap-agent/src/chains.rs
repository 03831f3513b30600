pub mod evm;
pub mod networks;

use crate::tokens::Token;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;

/// Read-only ERC-20 access used by the order pipeline.
///
/// Errors are raw `eyre` reports; callers classify them (not-a-token vs. node outage).
#[async_trait]
pub trait TokenReader: Send + Sync {
    async fn token(&self, chain_id: u64, address: Address) -> eyre::Result<Token>;

    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> eyre::Result<U256>;
}
