use std::process::Command;

use assert_cmd::assert::OutputAssertExt as _;
use eyre::Context as _;
use predicates::prelude::*;

fn agent(cfg_dir: &tempfile::TempDir, data_dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("uniswap-agent"));
    cmd.env("UNISWAP_AGENT_CONFIG_DIR", cfg_dir.path())
        .env("UNISWAP_AGENT_DATA_DIR", data_dir.path())
        .env_remove("ANKR_API_KEY")
        .env_remove("TOKEN_MAP_URL");
    cmd
}

#[test]
fn doctor_json_runs_and_returns_valid_json() -> eyre::Result<()> {
    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;

    let out = agent(&cfg_dir, &data_dir)
        .args(["doctor", "--json"])
        .output()
        .context("run uniswap-agent doctor --json")?;

    assert!(
        out.status.success(),
        "doctor exited non-zero: status={:?}, stderr={}",
        out.status.code(),
        String::from_utf8_lossy(&out.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).context("parse doctor json")?;
    assert_eq!(v.get("ok").and_then(serde_json::Value::as_bool), Some(true), "ok flag");
    assert!(v.get("version").and_then(|x| x.as_str()).is_some(), "version present");
    assert!(v.get("paths").and_then(|x| x.as_object()).is_some(), "paths present");
    assert_eq!(
        v.pointer("/service/ankr_key_configured").and_then(serde_json::Value::as_bool),
        Some(false),
        "no key in a clean env"
    );
    let issues = v
        .get("issues")
        .and_then(|x| x.as_array())
        .ok_or_else(|| eyre::eyre!("issues missing"))?;
    assert!(!issues.is_empty(), "missing ANKR key is reported");
    Ok(())
}

#[test]
fn doctor_reads_config_file() -> eyre::Result<()> {
    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;
    std::fs::write(
        cfg_dir.path().join("config.toml"),
        "[swap]\nslippage_bps = 25\n",
    )?;

    agent(&cfg_dir, &data_dir)
        .args(["doctor", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"slippage_bps\": 25"));
    Ok(())
}

#[test]
fn chains_lists_base_with_its_router() -> eyre::Result<()> {
    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;

    agent(&cfg_dir, &data_dir)
        .arg("chains")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("8453")
                .and(predicate::str::contains("0x2626664c2603336E57B271c5C0b26F421741e481")),
        );

    let out = agent(&cfg_dir, &data_dir)
        .args(["chains", "--json"])
        .output()
        .context("run uniswap-agent chains --json")?;
    assert!(out.status.success(), "chains --json exited non-zero");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).context("parse chains json")?;
    let chains = v.as_array().ok_or_else(|| eyre::eyre!("expected an array"))?;
    assert!(
        chains
            .iter()
            .any(|c| c.get("chain_id").and_then(serde_json::Value::as_u64) == Some(1)),
        "mainnet listed"
    );
    Ok(())
}

#[test]
fn unknown_subcommand_fails() -> eyre::Result<()> {
    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;
    agent(&cfg_dir, &data_dir)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("frobnicate"));
    Ok(())
}
