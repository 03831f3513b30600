//! Chain → token directory used to resolve buy tokens the wallet does not hold yet.
//!
//! The directory is fetched from a remote token map and kept as an immutable snapshot behind an
//! `Arc`. Readers clone the `Arc` and never wait on a refresh once a snapshot exists; at most one
//! refresh runs at a time and swaps the whole snapshot in one write.

use crate::tokens::{parse_address_loose, TokenInfo};
use alloy::primitives::Address;
use async_trait::async_trait;
use eyre::Context as _;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
struct ChainTokens {
    by_symbol: HashMap<String, TokenInfo>,
    by_address: HashMap<Address, TokenInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenDirectory {
    chains: HashMap<u64, ChainTokens>,
}

impl TokenDirectory {
    pub fn from_entries(entries: impl IntoIterator<Item = (u64, TokenInfo)>) -> Self {
        let mut d = Self::default();
        for (chain_id, info) in entries {
            d.insert(chain_id, info);
        }
        d
    }

    /// First entry for a symbol wins; later duplicates are still reachable by address.
    pub fn insert(&mut self, chain_id: u64, info: TokenInfo) {
        let chain = self.chains.entry(chain_id).or_default();
        chain
            .by_symbol
            .entry(info.symbol.to_lowercase())
            .or_insert_with(|| info.clone());
        chain.by_address.entry(info.address).or_insert(info);
    }

    pub fn by_symbol(&self, chain_id: u64, symbol: &str) -> Option<&TokenInfo> {
        self.chains
            .get(&chain_id)?
            .by_symbol
            .get(&symbol.trim().to_lowercase())
    }

    pub fn by_address(&self, chain_id: u64, address: Address) -> Option<&TokenInfo> {
        self.chains.get(&chain_id)?.by_address.get(&address)
    }

    pub fn len(&self) -> usize {
        self.chains.values().map(|c| c.by_address.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accepts either `{ "<chainId>": { "<symbol>": TokenInfo } }` or a Uniswap token list
    /// (`{ "tokens": [{ chainId, address, symbol, decimals, name }] }`). Malformed entries are
    /// skipped.
    pub fn from_json(v: &Value) -> eyre::Result<Self> {
        let obj = v
            .as_object()
            .ok_or_else(|| eyre::eyre!("token map must be a JSON object"))?;
        if let Some(tokens) = obj.get("tokens").and_then(Value::as_array) {
            return Ok(Self::from_entries(tokens.iter().filter_map(|t| {
                Some((t.get("chainId")?.as_u64()?, token_info_from_json(t)?))
            })));
        }

        let mut d = Self::default();
        for (chain_key, symbols) in obj {
            let Ok(chain_id) = chain_key.trim().parse::<u64>() else {
                continue;
            };
            let Some(symbols) = symbols.as_object() else {
                continue;
            };
            for t in symbols.values() {
                if let Some(info) = token_info_from_json(t) {
                    d.insert(chain_id, info);
                }
            }
        }
        Ok(d)
    }
}

fn token_info_from_json(t: &Value) -> Option<TokenInfo> {
    let address = parse_address_loose(t.get("address")?.as_str()?)?;
    let symbol = t.get("symbol")?.as_str()?.trim().to_owned();
    if symbol.is_empty() {
        return None;
    }
    let decimals = u8::try_from(t.get("decimals")?.as_u64()?).ok()?;
    let name = t.get("name").and_then(Value::as_str).map(str::to_owned);
    Some(TokenInfo {
        address,
        symbol,
        decimals,
        name,
    })
}

/// Where directory snapshots come from.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn fetch(&self) -> eyre::Result<TokenDirectory>;
}

/// Token map served as JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDirectorySource {
    client: reqwest::Client,
    url: String,
}

impl HttpDirectorySource {
    pub fn new(url: &str, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("build token map http client")?;
        Ok(Self {
            client,
            url: url.trim().to_owned(),
        })
    }
}

#[async_trait]
impl DirectorySource for HttpDirectorySource {
    async fn fetch(&self) -> eyre::Result<TokenDirectory> {
        if self.url.is_empty() {
            return Ok(TokenDirectory::default());
        }
        let v: Value = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("token map request")?
            .error_for_status()
            .context("token map status")?
            .json()
            .await
            .context("token map json")?;
        TokenDirectory::from_json(&v)
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    directory: Arc<TokenDirectory>,
    fresh_until: Instant,
}

/// How long to wait before retrying after a failed refresh.
const RETRY_AFTER_FAILURE: Duration = Duration::from_secs(5 * 60);

pub struct DirectoryCache {
    source: Arc<dyn DirectorySource>,
    ttl: Duration,
    fetch_timeout: Duration,
    current: RwLock<Option<Snapshot>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl DirectoryCache {
    pub fn new(source: Arc<dyn DirectorySource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            current: RwLock::new(None),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current snapshot. Stale snapshots are returned as-is while a background refresh runs.
    /// Only the very first call (nothing loaded yet) waits for a fetch.
    pub async fn snapshot(self: &Arc<Self>) -> Arc<TokenDirectory> {
        let existing = self.current.read().await.clone();
        if let Some(s) = existing {
            if Instant::now() >= s.fresh_until {
                self.spawn_refresh();
            }
            return s.directory;
        }

        let guard = self.refresh_lock.lock().await;
        let loaded_meanwhile = self.current.read().await.clone();
        if let Some(s) = loaded_meanwhile {
            return s.directory;
        }
        self.refresh_locked().await;
        drop(guard);
        self.current
            .read()
            .await
            .as_ref()
            .map_or_else(|| Arc::new(TokenDirectory::default()), |s| Arc::clone(&s.directory))
    }

    /// Start loading in the background so the first request does not pay for it.
    pub fn warm(self: &Arc<Self>) {
        self.spawn_refresh();
    }

    fn spawn_refresh(self: &Arc<Self>) {
        let Ok(guard) = Arc::clone(&self.refresh_lock).try_lock_owned() else {
            return;
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.refresh_locked().await;
            drop(guard);
        });
    }

    /// Caller holds `refresh_lock`.
    async fn refresh_locked(&self) {
        let start = Instant::now();
        let fetched = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(r) => r,
            Err(_) => Err(eyre::eyre!(
                "token map fetch timed out after {}s",
                self.fetch_timeout.as_secs()
            )),
        };

        let mut current = self.current.write().await;
        match fetched {
            Ok(dir) => {
                if dir.is_empty() {
                    warn!("token map has no usable entries; buy tokens must be held or given by address");
                }
                info!(
                    tokens = dir.len(),
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "token directory refreshed"
                );
                *current = Some(Snapshot {
                    directory: Arc::new(dir),
                    fresh_until: Instant::now() + self.ttl,
                });
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "token directory refresh failed; keeping previous snapshot");
                let directory = current
                    .as_ref()
                    .map_or_else(|| Arc::new(TokenDirectory::default()), |s| Arc::clone(&s.directory));
                *current = Some(Snapshot {
                    directory,
                    fresh_until: Instant::now() + RETRY_AFTER_FAILURE.min(self.ttl),
                });
            }
        }
    }
}
