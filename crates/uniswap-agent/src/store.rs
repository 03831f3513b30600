use crate::{config::ServiceConfig, paths::AgentPaths};
use eyre::Context as _;
use std::{fs, path::PathBuf};

/// Loads the service config: optional `config.toml`, then environment overrides.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

fn is_truthy_env(v: &str) -> bool {
    matches!(v, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

/// Apply environment variable overrides to the config.
pub fn apply_env_overrides(cfg: &mut ServiceConfig) {
    apply_env_overrides_from(cfg, |k| std::env::var(k).ok());
}

fn apply_env_overrides_from(cfg: &mut ServiceConfig, get: impl Fn(&str) -> Option<String>) {
    // If a var is set and non-empty, hand its trimmed value to `setter`.
    let apply_env = |var: &str, setter: &mut dyn FnMut(&str)| {
        if let Some(u) = get(var) {
            let t = u.trim();
            if !t.is_empty() {
                setter(t);
            }
        }
    };

    apply_env("HOST", &mut |v| v.clone_into(&mut cfg.server.host));
    apply_env("PORT", &mut |v| {
        if let Ok(n) = v.parse::<u16>() {
            cfg.server.port = n;
        }
    });
    apply_env("UNISWAP_AGENT_REQUEST_TIMEOUT_SECONDS", &mut |v| {
        if let Ok(n) = v.parse::<u64>() {
            if n > 0 {
                cfg.server.request_timeout_seconds = n;
            }
        }
    });
    apply_env("UNISWAP_AGENT_CORS_ORIGINS", &mut |v| {
        v.clone_into(&mut cfg.server.cors_allowed_origins);
    });
    apply_env("ANKR_API_KEY", &mut |v| cfg.http.ankr_api_key = Some(v.to_owned()));
    apply_env("ANKR_BASE_URL", &mut |v| v.clone_into(&mut cfg.http.ankr_base_url));
    apply_env("TOKEN_MAP_URL", &mut |v| v.clone_into(&mut cfg.http.token_map_url));
    apply_env("TOKEN_MAP_REFRESH_SECONDS", &mut |v| {
        if let Ok(n) = v.parse::<u64>() {
            if n > 0 {
                cfg.http.token_map_refresh_seconds = n;
            }
        }
    });
    // Hosted deployments only know their hostname.
    apply_env("VERCEL_URL", &mut |v| cfg.http.base_url = format!("https://{v}"));
    apply_env("UNISWAP_AGENT_BASE_URL", &mut |v| v.clone_into(&mut cfg.http.base_url));
    apply_env("BITTE_ACCOUNT_ID", &mut |v| cfg.http.account_id = Some(v.to_owned()));
    apply_env("UNISWAP_AGENT_SLIPPAGE_BPS", &mut |v| {
        if let Ok(n) = v.parse::<u32>() {
            cfg.swap.slippage_bps = n;
        }
    });
    apply_env("UNISWAP_AGENT_LOG_FILE", &mut |v| {
        cfg.log.file_enabled = is_truthy_env(v);
    });

    for def in crate::chains::networks::CHAINS {
        let id = def.chain_id.to_string();
        apply_env(&format!("RPC_URL_{id}"), &mut |v| {
            cfg.rpc.evm_rpc_urls.insert(id.clone(), v.to_owned());
        });
    }
}

impl ConfigStore {
    pub fn new(paths: &AgentPaths) -> Self {
        Self {
            path: paths.config_file(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// The file is optional; a service with only env configuration is a normal deployment.
    pub fn load(&self) -> eyre::Result<ServiceConfig> {
        let mut cfg = self.load_file()?.unwrap_or_default();
        apply_env_overrides(&mut cfg);
        Ok(cfg)
    }

    /// Parse the file without env overrides. `None` when it does not exist.
    pub fn load_file(&self) -> eyre::Result<Option<ServiceConfig>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let cfg: ServiceConfig = toml::from_str(&s).context("parse config.toml")?;
        Ok(Some(cfg))
    }
}
