use crate::{
    chains::{evm::erc20_approve_calldata, TokenReader},
    errors::{is_revert_or_decode_error, swap_error_in, SwapError},
    order::MetaTransaction,
    tokens::is_native,
};
use alloy::primitives::{Address, U256};

/// Approval needed before `spender` can pull `required` of `token` from `owner`.
///
/// Returns `None` for the native asset or when the current allowance already covers the
/// amount. A reverted or undecodable read means the token is not an ERC-20 and is the caller's
/// error; any other failure is an upstream fault.
pub async fn approval_if_needed(
    reader: &dyn TokenReader,
    chain_id: u64,
    owner: Address,
    token: Address,
    spender: Address,
    required: U256,
) -> Result<Option<MetaTransaction>, SwapError> {
    if is_native(token) {
        return Ok(None);
    }
    let current = reader
        .allowance(chain_id, token, owner, spender)
        .await
        .map_err(|e| {
            if let Some(known) = swap_error_in(&e) {
                known
            } else if is_revert_or_decode_error(&e) {
                SwapError::AllowanceCheckFailed {
                    token,
                    reason: format!("{e:#}"),
                }
            } else {
                SwapError::AllowanceUnavailable {
                    token,
                    reason: format!("{e:#}"),
                }
            }
        })?;
    if current >= required {
        tracing::debug!(chain_id, token = %token, allowance = %current, "allowance sufficient");
        return Ok(None);
    }
    tracing::debug!(chain_id, token = %token, allowance = %current, required = %required, "approval required");
    Ok(Some(MetaTransaction::new(
        token,
        &erc20_approve_calldata(spender, U256::MAX),
        U256::ZERO,
    )))
}
