use crate::chains::networks::CHAINS;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

pub const DEFAULT_ANKR_BASE_URL: &str = "https://rpc.ankr.com/multichain";
pub const DEFAULT_TOKEN_MAP_URL: &str = "https://tokens.uniswap.org";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single swap/balances request, including every upstream call it makes.
    pub request_timeout_seconds: u64,
    /// Comma-separated list of allowed origins, or `*`.
    pub cors_allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            request_timeout_seconds: 60,
            cors_allowed_origins: "*".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Ankr multichain JSON-RPC base URL. The API key is appended as a path segment.
    pub ankr_base_url: String,
    /// Ankr API key. Required for balance lookups.
    pub ankr_api_key: Option<String>,
    /// Token directory source. Accepts a chain→symbol mapping or a Uniswap token list.
    pub token_map_url: String,
    pub token_map_refresh_seconds: u64,
    /// Per-call timeout for outbound HTTP (balances, token map, RPC).
    pub upstream_timeout_seconds: u64,
    /// Public URL of this deployment, advertised in the plugin manifest.
    pub base_url: String,
    /// Agent platform account that owns the plugin.
    pub account_id: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            ankr_base_url: DEFAULT_ANKR_BASE_URL.into(),
            ankr_api_key: None,
            token_map_url: DEFAULT_TOKEN_MAP_URL.into(),
            token_map_refresh_seconds: 24 * 60 * 60,
            upstream_timeout_seconds: 20,
            base_url: "http://localhost:3000".into(),
            account_id: None,
        }
    }
}

impl HttpConfig {
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    pub fn ankr_api_key_configured(&self) -> bool {
        self.ankr_api_key
            .as_ref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Primary EVM RPC endpoint keyed by decimal chain id (TOML keys are strings).
    pub evm_rpc_urls: BTreeMap<String, String>,
    /// Fallback EVM RPC endpoints keyed by decimal chain id.
    pub evm_fallback_rpc_urls: BTreeMap<String, Vec<String>>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        let mut evm_rpc_urls = BTreeMap::new();
        let mut evm_fallback_rpc_urls = BTreeMap::new();
        for def in CHAINS {
            evm_rpc_urls.insert(def.chain_id.to_string(), def.rpc_url.to_owned());
            evm_fallback_rpc_urls.insert(
                def.chain_id.to_string(),
                def.fallbacks.iter().map(|&s| s.to_owned()).collect(),
            );
        }
        Self {
            evm_rpc_urls,
            evm_fallback_rpc_urls,
        }
    }
}

impl RpcConfig {
    /// Primary first, then fallbacks, trimmed and de-duplicated.
    pub fn urls_for(&self, chain_id: u64) -> Vec<String> {
        let key = chain_id.to_string();
        let mut urls: Vec<String> = vec![];
        let primary = self.evm_rpc_urls.get(&key).map(String::as_str);
        let fallbacks = self
            .evm_fallback_rpc_urls
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for u in primary.into_iter().chain(fallbacks.iter().map(String::as_str)) {
            let t = u.trim();
            if t.is_empty() || urls.iter().any(|x| x == t) {
                continue;
            }
            urls.push(t.to_owned());
        }
        urls
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Maximum slippage applied to the quoted output, in basis points.
    pub slippage_bps: u32,
    /// Swap deadline, relative to the time the route is built.
    pub deadline_seconds: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 100,
            deadline_seconds: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Also write JSON logs to `<data_dir>/uniswap-agent.log.jsonl`.
    pub file_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub rpc: RpcConfig,
    pub swap: SwapConfig,
    pub log: LogConfig,
}

impl ServiceConfig {
    /// Problems that will make some operation fail. Empty means fully configured.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = vec![];
        if !self.http.ankr_api_key_configured() {
            issues.push("ANKR_API_KEY is not set; balance lookups will fail".to_owned());
        }
        if self.http.token_map_url.trim().is_empty() {
            issues.push("token_map_url is empty; buy tokens must be held or given by address".to_owned());
        }
        if self.swap.slippage_bps >= crate::slippage::BPS_DENOMINATOR {
            issues.push(format!(
                "slippage_bps={} must be below {}",
                self.swap.slippage_bps,
                crate::slippage::BPS_DENOMINATOR
            ));
        }
        if self.server.request_timeout_seconds == 0 {
            issues.push("server.request_timeout_seconds must be > 0".to_owned());
        }
        if self.http.upstream_timeout_seconds == 0 {
            issues.push("http.upstream_timeout_seconds must be > 0".to_owned());
        }
        for def in CHAINS {
            if self.rpc.urls_for(def.chain_id).is_empty() {
                issues.push(format!("no rpc url configured for {} ({})", def.name, def.chain_id));
            }
        }
        issues
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }
}
