//! Transaction bundle assembly.
//!
//! The step order (wrap, approve, swap) is encoded in the builder's types: each stage only
//! exposes the methods that may follow it, and only the swap stage can finish.

use crate::chains::evm::wrap_native_calldata;
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

pub const SEND_TRANSACTION_METHOD: &str = "eth_sendTransaction";

/// One call for the external signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransaction {
    /// Checksummed sender, stamped by the builder when the bundle is finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Checksummed target.
    pub to: String,
    /// `0x`-prefixed calldata.
    pub data: String,
    /// `0x`-prefixed hex wei amount.
    pub value: String,
}

impl MetaTransaction {
    pub fn new(to: Address, data: &Bytes, value: U256) -> Self {
        Self {
            from: None,
            to: to.to_checksum(None),
            data: format!("0x{}", hex::encode(data)),
            value: format!("{value:#x}"),
        }
    }
}

/// WETH9-style `deposit()` of `amount` native units into `wrapped_native`.
pub fn wrap_tx(wrapped_native: Address, amount: U256) -> MetaTransaction {
    MetaTransaction::new(wrapped_native, &wrap_native_calldata(), amount)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub method: String,
    pub chain_id: u64,
    pub params: Vec<MetaTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMeta {
    pub order_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    pub transaction: SignRequest,
    pub meta: OrderMeta,
}

#[derive(Debug)]
pub struct OrderSteps {
    chain_id: u64,
    from: Address,
    txs: Vec<MetaTransaction>,
}

#[derive(Debug)]
pub struct AfterWrap(OrderSteps);

#[derive(Debug)]
pub struct AfterApproval(OrderSteps);

impl OrderSteps {
    pub const fn new(chain_id: u64, from: Address) -> Self {
        Self {
            chain_id,
            from,
            txs: Vec::new(),
        }
    }

    pub fn wrap(mut self, tx: Option<MetaTransaction>) -> AfterWrap {
        self.txs.extend(tx);
        AfterWrap(self)
    }
}

impl AfterWrap {
    pub fn approve(mut self, tx: Option<MetaTransaction>) -> AfterApproval {
        self.0.txs.extend(tx);
        AfterApproval(self.0)
    }
}

impl AfterApproval {
    pub fn swap(self, tx: MetaTransaction) -> SignRequest {
        let Self(mut steps) = self;
        steps.txs.push(tx);
        let from = steps.from.to_checksum(None);
        for t in &mut steps.txs {
            t.from = Some(from.clone());
        }
        SignRequest {
            method: SEND_TRANSACTION_METHOD.to_owned(),
            chain_id: steps.chain_id,
            params: steps.txs,
        }
    }
}
