use crate::{
    chains::networks::chain_def,
    errors::SwapError,
    retry::{try_all_with_backoff, BackoffConfig},
    tokens::{parse_address_loose, BalanceTokenMeta, TokenBalance, NATIVE_ASSET},
};
use alloy::primitives::Address;
use async_trait::async_trait;
use eyre::Context as _;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Wallet holdings for one chain.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn balances(&self, chain_id: u64, wallet: Address) -> Result<Vec<TokenBalance>, SwapError>;
}

/// Ankr multichain `ankr_getAccountBalance`.
#[derive(Debug)]
pub struct AnkrBalances {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    backoff: BackoffConfig,
}

#[derive(Debug, thiserror::Error)]
#[error("ankr returned http {0}")]
struct HttpStatus(u16);

fn is_retryable(err: &eyre::Report) -> bool {
    match err.downcast_ref::<HttpStatus>() {
        Some(HttpStatus(code)) => *code == 429 || *code >= 500,
        None => true,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnkrAsset {
    #[serde(default)]
    token_name: String,
    #[serde(default)]
    token_symbol: String,
    #[serde(default)]
    token_decimals: Option<u8>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    balance: String,
    #[serde(default)]
    balance_usd: Value,
}

fn usd_value(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => 0.0,
    }
}

fn asset_to_balance(a: AnkrAsset) -> Option<TokenBalance> {
    let is_native = a
        .token_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("NATIVE"))
        || a.contract_address.as_deref().is_none_or(|c| c.trim().is_empty());
    let token_address = if is_native {
        NATIVE_ASSET
    } else {
        parse_address_loose(a.contract_address.as_deref().unwrap_or_default())?
    };
    let symbol = if a.token_symbol.trim().is_empty() {
        "UNKNOWN".to_owned()
    } else {
        a.token_symbol.trim().to_owned()
    };
    Some(TokenBalance {
        token_address,
        balance: a.balance,
        value: usd_value(&a.balance_usd),
        token: BalanceTokenMeta {
            name: if a.token_name.is_empty() {
                symbol.clone()
            } else {
                a.token_name
            },
            symbol,
            decimals: a.token_decimals.unwrap_or(18),
        },
    })
}

/// Decode a JSON-RPC response body into balances. Unparseable assets are skipped.
fn parse_account_balance(body: &Value) -> eyre::Result<Vec<TokenBalance>> {
    if let Some(err) = body.get("error") {
        eyre::bail!("ankr rpc error: {err}");
    }
    let assets = body
        .pointer("/result/assets")
        .and_then(Value::as_array)
        .ok_or_else(|| eyre::eyre!("ankr response missing result.assets"))?;
    Ok(assets
        .iter()
        .filter_map(|a| serde_json::from_value::<AnkrAsset>(a.clone()).ok())
        .filter_map(asset_to_balance)
        .collect())
}

impl AnkrBalances {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("build ankr http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            api_key: api_key
                .map(|k| k.trim().to_owned())
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            backoff: BackoffConfig::default(),
        })
    }

    async fn fetch_once(&self, url: &str, body: &Value) -> eyre::Result<Vec<TokenBalance>> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            // The url embeds the key; reqwest includes it in error text.
            .map_err(|e| eyre::eyre!("ankr request failed: {}", e.without_url()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(eyre::Report::new(HttpStatus(status.as_u16())));
        }
        let v: Value = resp
            .json()
            .await
            .map_err(|e| eyre::eyre!("ankr response decode failed: {}", e.without_url()))?;
        parse_account_balance(&v)
    }
}

#[async_trait]
impl BalanceProvider for AnkrBalances {
    async fn balances(&self, chain_id: u64, wallet: Address) -> Result<Vec<TokenBalance>, SwapError> {
        let chain = chain_def(chain_id).ok_or(SwapError::UnsupportedChain(chain_id))?;
        let Some(key) = &self.api_key else {
            return Err(SwapError::EnvMisconfigured(
                "ANKR_API_KEY is required for balance lookups".to_owned(),
            ));
        };
        let url = format!("{}/{}", self.base_url, key.expose_secret());
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "ankr_getAccountBalance",
            "params": {
                "blockchain": chain.ankr_slug,
                "walletAddress": wallet.to_checksum(None),
                "onlyWhitelisted": true,
            },
        });

        let urls = [url];
        let out = try_all_with_backoff(
            &urls,
            &self.backoff,
            |u| {
                let u = u.clone();
                let body = &body;
                async move { self.fetch_once(&u, body).await }
            },
            is_retryable,
            "ankr balances",
        )
        .await
        .map_err(|e| SwapError::BalanceProviderUnavailable(format!("{e:#}")))?;

        tracing::debug!(chain_id, wallet = %wallet, assets = out.len(), "fetched balances");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_native_and_erc20_assets() -> eyre::Result<()> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "totalBalanceUsd": "301.5",
                "assets": [
                    {
                        "blockchain": "base",
                        "tokenName": "Ethereum",
                        "tokenSymbol": "ETH",
                        "tokenDecimals": 18,
                        "tokenType": "NATIVE",
                        "holderAddress": "0x7f01d9b227593e033bf8d6fc86e634d27aa85568",
                        "balance": "0.1",
                        "balanceRawInteger": "100000000000000000",
                        "balanceUsd": "300.00"
                    },
                    {
                        "blockchain": "base",
                        "tokenName": "USD Coin",
                        "tokenSymbol": "USDC",
                        "tokenDecimals": 6,
                        "tokenType": "ERC20",
                        "contractAddress": "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913",
                        "balance": "1.5",
                        "balanceRawInteger": "1500000",
                        "balanceUsd": 1.5
                    },
                    {
                        "tokenSymbol": "BROKEN",
                        "tokenType": "ERC20",
                        "contractAddress": "0xnothex"
                    }
                ]
            }
        });
        let got = parse_account_balance(&body)?;
        assert_eq!(got.len(), 2, "broken asset skipped");
        let eth = got.first().ok_or_else(|| eyre::eyre!("missing eth"))?;
        assert_eq!(eth.token_address, NATIVE_ASSET, "native maps to sentinel");
        assert_eq!(eth.token.decimals, 18, "decimals");
        assert!((eth.value - 300.0).abs() < f64::EPSILON, "usd from string");
        let usdc = got.get(1).ok_or_else(|| eyre::eyre!("missing usdc"))?;
        assert_eq!(usdc.token.symbol, "USDC", "symbol");
        assert!((usdc.value - 1.5).abs() < f64::EPSILON, "usd from number");
        Ok(())
    }

    #[test]
    fn rpc_error_is_reported() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "invalid params"}});
        let err = parse_account_balance(&body).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("invalid params"), "got {err}");
    }

    #[test]
    fn client_errors_are_not_retried() {
        assert!(!is_retryable(&eyre::Report::new(HttpStatus(401))), "401");
        assert!(is_retryable(&eyre::Report::new(HttpStatus(429))), "429");
        assert!(is_retryable(&eyre::Report::new(HttpStatus(503))), "503");
        assert!(is_retryable(&eyre::eyre!("connection reset")), "transport");
    }

    #[tokio::test]
    async fn missing_key_is_misconfiguration() -> eyre::Result<()> {
        let p = AnkrBalances::new("https://rpc.ankr.com/multichain", Some("  ".into()), Duration::from_secs(1))?;
        let r = p.balances(8453, Address::ZERO).await;
        assert!(matches!(r, Err(SwapError::EnvMisconfigured(_))), "got {r:?}");
        let r = p.balances(5, Address::ZERO).await;
        assert!(matches!(r, Err(SwapError::UnsupportedChain(5))), "got {r:?}");
        Ok(())
    }
}
