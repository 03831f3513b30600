use crate::{
    balances::{AnkrBalances, BalanceProvider},
    chains::evm::EvmRpc,
    config::ServiceConfig,
    directory::{DirectoryCache, HttpDirectorySource},
    errors::{ErrorBody, SwapError},
    flow::OrderFlow,
    manifest::plugin_manifest,
    quote::UniswapV3Quoter,
    request::{parse_balances_query, parse_quote_request, BalancesQuery, SwapRequestBody},
    slippage::BPS_DENOMINATOR,
};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use eyre::Context as _;
use serde::Serialize;
use serde_json::{json, Value};
use std::{future::Future, sync::Arc, time::Duration};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Instrument as _;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const HEALTH_MESSAGE: &str = "Ok lets go!";

#[derive(Clone)]
pub struct AppState {
    pub flow: OrderFlow,
    pub balances: Arc<dyn BalanceProvider>,
    pub directory: Arc<DirectoryCache>,
    pub request_timeout: Duration,
    pub manifest: Arc<Value>,
}

impl IntoResponse for SwapError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::BAD_REQUEST);
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

/// Run a tool handler under the request timeout, tagging logs and the response with a fresh
/// request id.
async fn run_tool<T, Fut>(label: &'static str, timeout: Duration, fut: Fut) -> Response
where
    T: Serialize,
    Fut: Future<Output = Result<T, SwapError>>,
{
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("tool", tool = label, request_id = %request_id);
    let outcome = async {
        match tokio::time::timeout(timeout, fut).await {
            Ok(r) => r,
            Err(_) => Err(SwapError::Timeout(timeout)),
        }
    }
    .instrument(span.clone())
    .await;

    let mut resp = match outcome {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            span.in_scope(|| {
                if e.status() >= 500 {
                    tracing::error!(code = e.code(), error = %e, "request failed");
                } else {
                    tracing::warn!(code = e.code(), error = %e, "request rejected");
                }
            });
            e.into_response()
        }
    };
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        resp.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), v);
    }
    resp
}

async fn swap(
    State(state): State<AppState>,
    payload: Result<Json<SwapRequestBody>, JsonRejection>,
) -> Response {
    run_tool("swap", state.request_timeout, async move {
        let Json(body) = payload.map_err(|e| SwapError::invalid(e.body_text()))?;
        let parsed = parse_quote_request(&body, state.balances.as_ref(), &state.directory).await?;
        state.flow.run(parsed).await
    })
    .await
}

async fn balances(
    State(state): State<AppState>,
    query: Result<Query<BalancesQuery>, QueryRejection>,
) -> Response {
    run_tool("balances", state.request_timeout, async move {
        let Query(q) = query.map_err(|e| SwapError::invalid(e.body_text()))?;
        let (chain_id, wallet) = parse_balances_query(&q)?;
        state.balances.balances(chain_id, wallet).await
    })
    .await
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true, "message": HEALTH_MESSAGE}))
}

async fn manifest(State(state): State<AppState>) -> Json<Value> {
    Json(state.manifest.as_ref().clone())
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("not_found", "Not Found")),
    )
}

fn cors_from_config(origins: &str) -> CorsLayer {
    let raw = origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("no valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router(state: AppState, cors_origins: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/swap", post(swap))
        .route("/api/tools/uniswap", post(swap))
        .route("/api/tools/balances", get(balances))
        .route("/.well-known/ai-plugin.json", get(manifest))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_from_config(cors_origins))
        .with_state(state)
}

/// Wire the production providers from config.
///
/// Refuses a slippage of 100% or more: every swap would be built with a zero minimum output.
pub fn build_state(cfg: &ServiceConfig) -> eyre::Result<AppState> {
    eyre::ensure!(
        cfg.swap.slippage_bps < BPS_DENOMINATOR,
        "swap.slippage_bps={} must be below {BPS_DENOMINATOR}",
        cfg.swap.slippage_bps
    );
    let upstream = cfg.http.upstream_timeout();
    let evm = Arc::new(EvmRpc::new(cfg.rpc.clone(), upstream));
    let quoter = Arc::new(UniswapV3Quoter::new(
        Arc::clone(&evm),
        cfg.swap.slippage_bps,
        cfg.swap.deadline_seconds,
    ));
    let balances = Arc::new(AnkrBalances::new(
        &cfg.http.ankr_base_url,
        cfg.http.ankr_api_key.clone(),
        upstream,
    )?);
    let source = Arc::new(HttpDirectorySource::new(&cfg.http.token_map_url, upstream)?);
    let directory = Arc::new(DirectoryCache::new(
        source,
        Duration::from_secs(cfg.http.token_map_refresh_seconds),
        upstream,
    ));
    Ok(AppState {
        flow: OrderFlow::new(evm, quoter),
        balances,
        directory,
        request_timeout: cfg.request_timeout(),
        manifest: Arc::new(plugin_manifest(
            &cfg.http.base_url,
            cfg.http.account_id.as_deref(),
        )),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

pub async fn serve(cfg: ServiceConfig) -> eyre::Result<()> {
    for issue in cfg.validate() {
        tracing::warn!(issue = %issue, "configuration issue");
    }
    let state = build_state(&cfg)?;
    state.directory.warm();
    let app = create_router(state, &cfg.server.cors_allowed_origins);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(addr = %addr, "uniswap agent listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chains::TokenReader,
        flow::tests::{FakeChain, FakeQuoter},
        quote::QuoteProvider,
        request::tests::{directory, StaticBalances, WALLET},
        tokens::TokenBalance,
    };
    use alloy::primitives::Address;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    fn state_with(balances: Arc<dyn BalanceProvider>, request_timeout: Duration) -> AppState {
        AppState {
            flow: OrderFlow::new(
                Arc::new(FakeChain::base()) as Arc<dyn TokenReader>,
                Arc::new(FakeQuoter::quoting(9_000_000_000_000_000_000)) as Arc<dyn QuoteProvider>,
            ),
            balances,
            directory: directory(),
            request_timeout,
            manifest: Arc::new(plugin_manifest("http://localhost:3000", None)),
        }
    }

    fn app() -> Router {
        create_router(
            state_with(Arc::new(StaticBalances::base_wallet()), Duration::from_secs(5)),
            "*",
        )
    }

    async fn call(router: Router, req: Request<Body>) -> eyre::Result<(StatusCode, Option<String>, Value)> {
        let resp = router.oneshot(req).await?;
        let status = resp.status();
        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
        let v: Value = serde_json::from_slice(&bytes)?;
        Ok((status, request_id, v))
    }

    fn post_json(uri: &str, body: &Value) -> eyre::Result<Request<Body>> {
        Ok(Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?)
    }

    fn get_req(uri: &str) -> eyre::Result<Request<Body>> {
        Ok(Request::builder().uri(uri).body(Body::empty())?)
    }

    fn swap_body(amount: &str) -> Value {
        json!({
            "chainId": 8453,
            "sellToken": "USDC",
            "buyToken": "DAI",
            "sellAmountBeforeFee": amount,
            "safeAddress": WALLET.to_string(),
        })
    }

    #[test]
    fn full_slippage_refuses_to_start() {
        let mut cfg = ServiceConfig::default();
        assert!(build_state(&cfg).is_ok(), "defaults are valid");
        cfg.swap.slippage_bps = BPS_DENOMINATOR;
        let err = build_state(&cfg).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("slippage_bps=10000"), "got {err:?}");
    }

    #[tokio::test]
    async fn health_on_both_paths() -> eyre::Result<()> {
        for path in ["/health", "/api/health"] {
            let (status, _, v) = call(app(), get_req(path)?).await?;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(v, json!({"ok": true, "message": "Ok lets go!"}), "{path}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() -> eyre::Result<()> {
        let (status, _, v) = call(app(), get_req("/nope")?).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "status");
        assert_eq!(v, json!({"error": "Not Found", "code": "not_found"}), "body");
        Ok(())
    }

    #[tokio::test]
    async fn swap_returns_sign_request() -> eyre::Result<()> {
        for path in ["/swap", "/api/tools/uniswap"] {
            let (status, request_id, v) = call(app(), post_json(path, &swap_body("10"))?).await?;
            assert_eq!(status, StatusCode::OK, "{path}: {v}");
            assert!(request_id.is_some_and(|id| id.len() == 36), "{path}: uuid request id");
            assert_eq!(
                v.pointer("/transaction/method"),
                Some(&json!("eth_sendTransaction")),
                "{path}: method"
            );
            assert_eq!(v.pointer("/transaction/chainId"), Some(&json!(8453)), "{path}: chain");
            let params = v
                .pointer("/transaction/params")
                .and_then(Value::as_array)
                .map(Vec::len);
            assert_eq!(params, Some(2), "{path}: approve + swap");
            assert!(
                v.pointer("/meta/orderData").and_then(Value::as_str).is_some(),
                "{path}: order data"
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn zero_amount_is_400() -> eyre::Result<()> {
        let (status, request_id, v) = call(app(), post_json("/swap", &swap_body("0"))?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "status");
        assert!(request_id.is_some(), "errors carry a request id");
        assert_eq!(v.get("code"), Some(&json!("invalid_input")), "code: {v}");
        assert!(v.get("error").and_then(Value::as_str).is_some(), "message");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_400() -> eyre::Result<()> {
        let (status, _, v) = call(app(), post_json("/swap", &json!({"chainId": 8453}))?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "status");
        assert_eq!(v.get("code"), Some(&json!("invalid_input")), "code: {v}");
        Ok(())
    }

    #[tokio::test]
    async fn balances_endpoint() -> eyre::Result<()> {
        let uri = format!("/api/tools/balances?chainId=8453&safeAddress={WALLET}");
        let (status, _, v) = call(app(), get_req(&uri)?).await?;
        assert_eq!(status, StatusCode::OK, "status: {v}");
        let symbols: Vec<&str> = v
            .as_array()
            .map(|a| a.iter().filter_map(|b| b.pointer("/token/symbol").and_then(Value::as_str)).collect())
            .unwrap_or_default();
        assert_eq!(symbols, vec!["ETH", "USDC"], "holdings");

        let uri = format!("/api/tools/balances?chainId=5&safeAddress={WALLET}");
        let (status, _, v) = call(app(), get_req(&uri)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "status");
        assert_eq!(v.get("code"), Some(&json!("unsupported_chain")), "code: {v}");
        Ok(())
    }

    #[tokio::test]
    async fn manifest_is_served() -> eyre::Result<()> {
        let (status, _, v) = call(app(), get_req("/.well-known/ai-plugin.json")?).await?;
        assert_eq!(status, StatusCode::OK, "status");
        assert_eq!(v.pointer("/info/title"), Some(&json!("Bitte Uniswap Agent")), "title");
        Ok(())
    }

    struct DownBalances;

    #[async_trait]
    impl BalanceProvider for DownBalances {
        async fn balances(&self, _chain_id: u64, _wallet: Address) -> Result<Vec<TokenBalance>, SwapError> {
            Err(SwapError::BalanceProviderUnavailable("ankr returned http 503".into()))
        }
    }

    struct SlowBalances;

    #[async_trait]
    impl BalanceProvider for SlowBalances {
        async fn balances(&self, _chain_id: u64, _wallet: Address) -> Result<Vec<TokenBalance>, SwapError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn upstream_failure_is_502() -> eyre::Result<()> {
        let router = create_router(state_with(Arc::new(DownBalances), Duration::from_secs(5)), "*");
        let (status, _, v) = call(router, post_json("/swap", &swap_body("1"))?).await?;
        assert_eq!(status, StatusCode::BAD_GATEWAY, "status");
        assert_eq!(v.get("code"), Some(&json!("balance_provider_unavailable")), "code: {v}");
        Ok(())
    }

    #[tokio::test]
    async fn slow_upstream_times_out_with_504() -> eyre::Result<()> {
        let router = create_router(state_with(Arc::new(SlowBalances), Duration::from_millis(50)), "*");
        let (status, _, v) = call(router, post_json("/swap", &swap_body("1"))?).await?;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT, "status");
        assert_eq!(v.get("code"), Some(&json!("timeout")), "code: {v}");
        Ok(())
    }
}
