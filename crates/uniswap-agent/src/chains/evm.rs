use crate::{
    chains::{networks::chain_def, TokenReader},
    config::RpcConfig,
    errors::{is_revert_or_decode_error, SwapError},
    retry::{try_all_with_backoff, BackoffConfig},
    tokens::Token,
};
use alloy::{
    primitives::{aliases::U24, Address, Bytes, U160, U256},
    providers::RootProvider,
    sol,
    sol_types::SolCall as _,
};
use async_trait::async_trait;
use eyre::Context as _;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_RPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type EvmProvider = RootProvider;

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function name() external view returns (string);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) returns (bool);
    }
}

sol! {
    contract IWETH9 {
        function deposit() external payable;
    }
}

sol! {
    #[sol(rpc)]
    contract IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }
        function quoteExactInputSingle(QuoteExactInputSingleParams params)
            external returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }
}

sol! {
    contract ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }
        function exactInputSingle(ExactInputSingleParams params)
            external payable returns (uint256 amountOut);
        function multicall(uint256 deadline, bytes[] data) external payable returns (bytes[] results);
    }
}

/// `approve(spender, value)` calldata.
pub fn erc20_approve_calldata(spender: Address, value: U256) -> Bytes {
    Bytes::from(IERC20::approveCall { spender, value }.abi_encode())
}

/// WETH9 `deposit()` calldata. The amount travels as the call value.
pub fn wrap_native_calldata() -> Bytes {
    Bytes::from(IWETH9::depositCall {}.abi_encode())
}

#[derive(Debug, Clone)]
pub struct ExactInputSingle {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub deadline: u64,
}

/// SwapRouter02 `multicall(deadline, [exactInputSingle(..)])` calldata.
pub fn exact_input_single_calldata(req: &ExactInputSingle) -> Bytes {
    let params = ISwapRouter02::ExactInputSingleParams {
        tokenIn: req.token_in,
        tokenOut: req.token_out,
        fee: U24::from(req.fee),
        recipient: req.recipient,
        amountIn: req.amount_in,
        amountOutMinimum: req.amount_out_min,
        sqrtPriceLimitX96: U160::ZERO,
    };
    let inner = ISwapRouter02::exactInputSingleCall { params }.abi_encode();
    let outer = ISwapRouter02::multicallCall {
        deadline: U256::from(req.deadline),
        data: vec![Bytes::from(inner)],
    };
    Bytes::from(outer.abi_encode())
}

/// Inverse of [`exact_input_single_calldata`].
#[cfg(test)]
pub fn decode_exact_input_single(data: &[u8]) -> eyre::Result<ExactInputSingle> {
    let outer = ISwapRouter02::multicallCall::abi_decode(data)?;
    let [inner] = outer.data.as_slice() else {
        eyre::bail!("expected one inner call, got {}", outer.data.len());
    };
    let p = ISwapRouter02::exactInputSingleCall::abi_decode(inner)?.params;
    Ok(ExactInputSingle {
        token_in: p.tokenIn,
        token_out: p.tokenOut,
        fee: p.fee.to::<u32>(),
        recipient: p.recipient,
        amount_in: p.amountIn,
        amount_out_min: p.amountOutMinimum,
        deadline: u64::try_from(outer.deadline).map_err(|_| eyre::eyre!("deadline out of range"))?,
    })
}

#[derive(Debug, Clone)]
pub struct EvmChain {
    pub name: String,
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    pub timeout: Duration,
}

impl EvmChain {
    fn provider_for_url(&self, url: &str) -> eyre::Result<EvmProvider> {
        let u: reqwest::Url = url
            .parse()
            .with_context(|| format!("invalid rpc url: {url}"))?;
        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(DEFAULT_RPC_CONNECT_TIMEOUT)
            .build()
            .context("build rpc http client")?;
        let http = alloy::transports::http::Http::with_client(client, u);
        let rpc_client = alloy::rpc::client::RpcClient::new(http, false);
        Ok(RootProvider::new(rpc_client))
    }

    /// Run `f` against each RPC endpoint until one answers. Reverts are final: the same call
    /// reverts on every node.
    async fn with_fallback_and_backoff<T, Fut>(
        &self,
        context_label: &'static str,
        f: impl Fn(EvmProvider) -> Fut + Sync,
    ) -> eyre::Result<T>
    where
        T: Send,
        Fut: std::future::Future<Output = eyre::Result<T>> + Send,
    {
        let cfg = BackoffConfig::default();
        try_all_with_backoff(
            &self.rpc_urls,
            &cfg,
            |u| {
                let u = u.clone();
                let f = &f;
                async move {
                    let p = self.provider_for_url(&u)?;
                    f(p).await
                }
            },
            |e| !is_revert_or_decode_error(e),
            context_label,
        )
        .await
        .with_context(|| format!("{} ({})", self.name, self.chain_id))
    }

    pub async fn erc20_details(&self, token: Address) -> eyre::Result<(u8, String, String)> {
        self.with_fallback_and_backoff("erc20 details", |p| async move {
            let c = IERC20::new(token, &p);
            let decimals = c.decimals().call().await.context("erc20 decimals")?;
            let symbol = c
                .symbol()
                .call()
                .await
                .unwrap_or_else(|_| "UNKNOWN".to_owned());
            let name = c.name().call().await.unwrap_or_else(|_| symbol.clone());
            Ok((decimals, symbol, name))
        })
        .await
    }

    pub async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> eyre::Result<U256> {
        self.with_fallback_and_backoff("erc20 allowance", |p| async move {
            let c = IERC20::new(token, &p);
            let v = c
                .allowance(owner, spender)
                .call()
                .await
                .context("erc20 allowance")?;
            Ok(v)
        })
        .await
    }

    pub async fn quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: u32,
    ) -> eyre::Result<U256> {
        self.with_fallback_and_backoff("uniswap quote", |p| async move {
            let q = IQuoterV2::new(quoter, &p);
            let params = IQuoterV2::QuoteExactInputSingleParams {
                tokenIn: token_in,
                tokenOut: token_out,
                amountIn: amount_in,
                fee: U24::from(fee),
                sqrtPriceLimitX96: U160::ZERO,
            };
            let out = q
                .quoteExactInputSingle(params)
                .call()
                .await
                .context("uniswap quote")?;
            Ok(out.amountOut)
        })
        .await
    }
}

/// Builds [`EvmChain`] handles from the configured RPC endpoints.
#[derive(Debug, Clone)]
pub struct EvmRpc {
    rpc: RpcConfig,
    timeout: Duration,
}

impl EvmRpc {
    pub const fn new(rpc: RpcConfig, timeout: Duration) -> Self {
        Self { rpc, timeout }
    }

    pub fn chain(&self, chain_id: u64) -> Result<EvmChain, SwapError> {
        let def = chain_def(chain_id).ok_or(SwapError::UnsupportedChain(chain_id))?;
        let rpc_urls = self.rpc.urls_for(chain_id);
        if rpc_urls.is_empty() {
            return Err(SwapError::EnvMisconfigured(format!(
                "no rpc url configured for chain {chain_id}"
            )));
        }
        Ok(EvmChain {
            name: def.name.to_owned(),
            chain_id,
            rpc_urls,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl TokenReader for EvmRpc {
    async fn token(&self, chain_id: u64, address: Address) -> eyre::Result<Token> {
        let chain = self.chain(chain_id)?;
        let (decimals, symbol, name) = chain.erc20_details(address).await?;
        Ok(Token {
            chain_id,
            address,
            decimals,
            symbol,
            name,
        })
    }

    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> eyre::Result<U256> {
        let chain = self.chain(chain_id)?;
        chain.erc20_allowance(token, owner, spender).await
    }
}
