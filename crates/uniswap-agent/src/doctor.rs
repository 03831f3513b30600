use crate::{
    chains::networks::CHAINS,
    config::ServiceConfig,
    paths::AgentPaths,
    store::ConfigStore,
};
use eyre::Context as _;
use serde_json::json;
use std::path::PathBuf;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

struct PathsReport {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_file: PathBuf,
}

struct ConfigReport {
    path: PathBuf,
    exists: bool,
    parse_ok: bool,
    error: Option<String>,
}

struct ServiceReport {
    listen: String,
    base_url: String,
    token_map_url: String,
    ankr_key_configured: bool,
    slippage_bps: u32,
    deadline_seconds: u64,
    chains: Vec<(u64, &'static str, usize)>,
    issues: Vec<String>,
}

struct DoctorReport {
    version: &'static str,
    paths: PathsReport,
    config: ConfigReport,
    service: ServiceReport,
    env: serde_json::Value,
}

fn service_report(cfg: &ServiceConfig) -> ServiceReport {
    ServiceReport {
        listen: format!("{}:{}", cfg.server.host, cfg.server.port),
        base_url: cfg.http.base_url.clone(),
        token_map_url: cfg.http.token_map_url.clone(),
        ankr_key_configured: cfg.http.ankr_api_key_configured(),
        slippage_bps: cfg.swap.slippage_bps,
        deadline_seconds: cfg.swap.deadline_seconds,
        chains: CHAINS
            .iter()
            .map(|c| (c.chain_id, c.name, cfg.rpc.urls_for(c.chain_id).len()))
            .collect(),
        issues: cfg.validate(),
    }
}

fn collect(paths: &AgentPaths) -> DoctorReport {
    let store = ConfigStore::new(paths);
    let config_path = store.path().to_path_buf();
    let config_exists = config_path.exists();
    let (config_ok, config_err) = match store.load_file() {
        Ok(Some(_)) => (true, None),
        Ok(None) => (false, None),
        Err(e) => (false, Some(format!("{e:#}"))),
    };
    // A broken file still gets a report built from defaults plus env.
    let effective = store.load().unwrap_or_else(|_| {
        let mut cfg = ServiceConfig::default();
        crate::store::apply_env_overrides(&mut cfg);
        cfg
    });

    let env = json!({
      "UNISWAP_AGENT_CONFIG_DIR": env_opt("UNISWAP_AGENT_CONFIG_DIR"),
      "UNISWAP_AGENT_DATA_DIR": env_opt("UNISWAP_AGENT_DATA_DIR"),
      "PORT": env_opt("PORT"),
      "TOKEN_MAP_URL": env_opt("TOKEN_MAP_URL"),
      "ANKR_API_KEY_set": env_opt("ANKR_API_KEY").is_some(),
    });

    DoctorReport {
        version: env!("CARGO_PKG_VERSION"),
        paths: PathsReport {
            config_dir: paths.config_dir.clone(),
            data_dir: paths.data_dir.clone(),
            log_file: paths.log_file.clone(),
        },
        config: ConfigReport {
            path: config_path,
            exists: config_exists,
            parse_ok: config_ok,
            error: config_err,
        },
        service: service_report(&effective),
        env,
    }
}

fn print_json(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    let chains: Vec<_> = r
        .service
        .chains
        .iter()
        .map(|(id, name, rpc_urls)| json!({"chain_id": id, "name": name, "rpc_urls": rpc_urls}))
        .collect();
    let s = serde_json::to_string_pretty(&json!({
      "ok": true,
      "version": r.version,
      "paths": {
        "config_dir": r.paths.config_dir,
        "data_dir": r.paths.data_dir,
        "log_file": r.paths.log_file,
      },
      "config": {
        "path": r.config.path,
        "exists": r.config.exists,
        "parse_ok": r.config.parse_ok,
        "error": r.config.error,
      },
      "service": {
        "listen": r.service.listen,
        "base_url": r.service.base_url,
        "token_map_url": r.service.token_map_url,
        "ankr_key_configured": r.service.ankr_key_configured,
        "slippage_bps": r.service.slippage_bps,
        "deadline_seconds": r.service.deadline_seconds,
        "chains": chains,
      },
      "issues": r.service.issues,
      "env": r.env,
    }))
    .context("serialize doctor json")?;
    writeln!(out, "{s}").context("write doctor json")?;
    Ok(())
}

fn print_human(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    writeln!(out, "Uniswap agent doctor (v{})", r.version).context("write header")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Paths:").context("write paths header")?;
    writeln!(out, "  config_dir: {}", r.paths.config_dir.display()).context("write paths")?;
    writeln!(out, "  data_dir:   {}", r.paths.data_dir.display()).context("write paths")?;
    writeln!(out, "  log_file:   {}", r.paths.log_file.display()).context("write paths")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Config:").context("write config header")?;
    writeln!(out, "  config.toml: {}", r.config.path.display()).context("write config")?;
    if !r.config.exists {
        writeln!(out, "  status: missing (defaults and environment only)").context("write config")?;
    } else if r.config.parse_ok {
        writeln!(out, "  status: ok").context("write config")?;
    } else {
        writeln!(out, "  status: parse failed").context("write config")?;
        if let Some(e) = &r.config.error {
            let first = e.lines().next().unwrap_or("parse error");
            writeln!(out, "  error: {first}").context("write config")?;
        }
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Service:").context("write service header")?;
    writeln!(out, "  listen:        {}", r.service.listen).context("write service")?;
    writeln!(out, "  base_url:      {}", r.service.base_url).context("write service")?;
    writeln!(out, "  token_map_url: {}", r.service.token_map_url).context("write service")?;
    writeln!(out, "  ankr_key:      {}", if r.service.ankr_key_configured { "set" } else { "missing" })
        .context("write service")?;
    writeln!(
        out,
        "  slippage:      {} bps, deadline {}s",
        r.service.slippage_bps, r.service.deadline_seconds
    )
    .context("write service")?;
    for (id, name, n) in &r.service.chains {
        writeln!(out, "  chain {id:>6} {name:<10} rpc_urls={n}").context("write chains")?;
    }
    writeln!(out).context("write newline")?;

    if r.service.issues.is_empty() {
        writeln!(out, "Issues: none").context("write issues")?;
    } else {
        writeln!(out, "Issues:").context("write issues header")?;
        for i in &r.service.issues {
            writeln!(out, "  - {i}").context("write issues")?;
        }
    }
    Ok(())
}

pub fn run(paths: &AgentPaths, as_json: bool) -> eyre::Result<()> {
    let report = collect(paths);
    let mut out = std::io::stdout().lock();
    if as_json {
        print_json(&mut out, &report)?;
    } else {
        print_human(&mut out, &report)?;
    }
    Ok(())
}
