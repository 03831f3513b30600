//! Token data model and the resolver that maps user-supplied identifiers onto canonical tokens.
//!
//! Resolution is pure: callers fetch the wallet balances and a directory snapshot first and
//! pass them in.

use crate::{
    directory::TokenDirectory,
    errors::{SwapError, TokenSide},
};
use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::str::FromStr as _;

/// Placeholder address that stands for a chain's native currency on every chain.
pub const NATIVE_ASSET: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Whether `address` is the [`NATIVE_ASSET`] placeholder rather than a contract.
pub fn is_native(address: Address) -> bool {
    address == NATIVE_ASSET
}

/// Parse a `0x`-prefixed 20-byte hex address, ignoring checksum casing.
pub fn parse_address_loose(s: &str) -> Option<Address> {
    let t = s.trim();
    let hex_part = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X"))?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Address::from_str(t).ok()
}

/// Fully resolved token, read from the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

/// Directory entry or the subset of a balance entry the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTokenMeta {
    pub symbol: String,
    pub decimals: u8,
    pub name: String,
}

/// One wallet holding as reported by the balance provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    /// Contract address, or [`NATIVE_ASSET`] for the chain's native currency.
    pub token_address: Address,
    /// Human-readable decimal amount.
    pub balance: String,
    pub token: BalanceTokenMeta,
    /// USD value; zero when the provider has no price.
    pub value: f64,
}

impl TokenBalance {
    pub fn info(&self) -> TokenInfo {
        TokenInfo {
            address: self.token_address,
            symbol: self.token.symbol.clone(),
            decimals: self.token.decimals,
            name: Some(self.token.name.clone()),
        }
    }
}

fn held_symbols(balances: &[TokenBalance]) -> Vec<String> {
    balances.iter().map(|b| b.token.symbol.clone()).collect()
}

fn find_in_balances<'a>(balances: &'a [TokenBalance], ident: &str) -> Option<&'a TokenBalance> {
    parse_address_loose(ident).map_or_else(
        || {
            let sym = ident.trim().to_lowercase();
            balances.iter().find(|b| b.token.symbol.to_lowercase() == sym)
        },
        |addr| balances.iter().find(|b| b.token_address == addr),
    )
}

/// The sell token must be something the wallet holds.
pub fn resolve_sell_token(balances: &[TokenBalance], ident: &str) -> Result<TokenInfo, SwapError> {
    find_in_balances(balances, ident)
        .map(TokenBalance::info)
        .ok_or_else(|| SwapError::TokenNotFound {
            side: TokenSide::Sell,
            token: ident.trim().to_owned(),
            held: held_symbols(balances),
        })
}

/// The buy token may come from the wallet or from the chain's token directory.
pub fn resolve_buy_token(
    chain_id: u64,
    balances: &[TokenBalance],
    directory: &TokenDirectory,
    ident: &str,
) -> Result<TokenInfo, SwapError> {
    if let Some(b) = find_in_balances(balances, ident) {
        return Ok(b.info());
    }
    let from_dir = parse_address_loose(ident).map_or_else(
        || directory.by_symbol(chain_id, ident),
        |addr| directory.by_address(chain_id, addr),
    );
    from_dir.cloned().ok_or_else(|| SwapError::TokenNotFound {
        side: TokenSide::Buy,
        token: ident.trim().to_owned(),
        held: held_symbols(balances),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn balance(addr: Address, symbol: &str, decimals: u8, amount: &str) -> TokenBalance {
        TokenBalance {
            token_address: addr,
            balance: amount.to_owned(),
            token: BalanceTokenMeta {
                symbol: symbol.to_owned(),
                decimals,
                name: symbol.to_owned(),
            },
            value: 0.0,
        }
    }

    pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    pub const DAI_BASE: Address = address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb");

    fn wallet() -> Vec<TokenBalance> {
        vec![
            balance(NATIVE_ASSET, "ETH", 18, "0.5"),
            balance(USDC_BASE, "USDC", 6, "120.5"),
        ]
    }

    fn native_str(s: &str) -> bool {
        parse_address_loose(s).is_some_and(is_native)
    }

    #[test]
    fn native_check_ignores_case() {
        assert!(
            native_str("0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"),
            "lowercase"
        );
        assert!(
            native_str("0xEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEE"),
            "uppercase"
        );
        assert!(
            native_str("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE"),
            "checksummed"
        );
        assert!(
            !native_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            "unrelated address"
        );
        assert!(!native_str("ETH"), "symbol");
    }

    #[test]
    fn loose_address_parsing() {
        assert_eq!(
            parse_address_loose("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            Some(USDC_BASE),
            "lowercase accepted"
        );
        assert!(parse_address_loose("833589fcd6edb6e08f4c7c32d4f71b54bda02913").is_none(), "no prefix");
        assert!(parse_address_loose("0x1234").is_none(), "short");
        assert!(parse_address_loose("USDC").is_none(), "symbol");
    }

    #[test]
    fn sell_token_by_symbol_is_case_insensitive() -> eyre::Result<()> {
        let t = resolve_sell_token(&wallet(), "usdc")?;
        assert_eq!(t.address, USDC_BASE, "address");
        assert_eq!(t.decimals, 6, "decimals");
        Ok(())
    }

    #[test]
    fn sell_token_by_address_matches_native_sentinel() -> eyre::Result<()> {
        let t = resolve_sell_token(&wallet(), "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee")?;
        assert_eq!(t.address, NATIVE_ASSET, "native");
        assert_eq!(t.symbol, "ETH", "symbol");
        Ok(())
    }

    #[test]
    fn missing_sell_token_lists_holdings() -> eyre::Result<()> {
        let Err(SwapError::TokenNotFound { side, token, held }) = resolve_sell_token(&wallet(), "USDT")
        else {
            eyre::bail!("expected TokenNotFound");
        };
        assert_eq!(side, TokenSide::Sell, "side");
        assert_eq!(token, "USDT", "token");
        assert_eq!(held, vec!["ETH".to_owned(), "USDC".to_owned()], "held symbols");
        Ok(())
    }

    #[test]
    fn buy_token_falls_back_to_directory() -> eyre::Result<()> {
        let dir = TokenDirectory::from_entries([(
            8453,
            TokenInfo {
                address: DAI_BASE,
                symbol: "DAI".into(),
                decimals: 18,
                name: Some("Dai Stablecoin".into()),
            },
        )]);
        let by_symbol = resolve_buy_token(8453, &wallet(), &dir, "dai")?;
        assert_eq!(by_symbol.address, DAI_BASE, "symbol lookup");
        let by_addr = resolve_buy_token(8453, &wallet(), &dir, &DAI_BASE.to_string())?;
        assert_eq!(by_addr.symbol, "DAI", "address lookup");
        let held = resolve_buy_token(8453, &wallet(), &dir, "USDC")?;
        assert_eq!(held.address, USDC_BASE, "wallet takes precedence");

        let wrong_chain = resolve_buy_token(1, &wallet(), &dir, "DAI");
        assert!(
            matches!(wrong_chain, Err(SwapError::TokenNotFound { side: TokenSide::Buy, .. })),
            "directory is per chain: {wrong_chain:?}"
        );
        Ok(())
    }
}
