//! Human-facing CLI output. Banners go to stderr so stdout stays machine-readable.

use crate::chains::networks::{swap_router_address, ChainDef};
use std::io::Write as _;

fn stderr_writeln(s: &str) {
    let mut stderr = std::io::stderr().lock();
    if stderr.write_all(s.as_bytes()).is_err() {
        return;
    }
    if stderr.write_all(b"\n").is_err() {
        return;
    }
    let _flush = stderr.flush();
}

/// Startup banner for `serve` (operator info only).
pub fn print_serve_banner(version: &str, listen: &str, base_url: &str, issues: usize) {
    let tip = if issues == 0 {
        String::new()
    } else {
        format!("\n\n{issues} configuration issue(s); run `uniswap-agent doctor` for details.")
    };
    stderr_writeln(&format!(
        "Uniswap Agent\n=============\nVersion  : v{version}\nListen   : {listen}\nManifest : {base_url}/.well-known/ai-plugin.json{tip}"
    ));
}

pub fn chain_json(c: &ChainDef) -> serde_json::Value {
    serde_json::json!({
        "chain_id": c.chain_id,
        "name": c.name,
        "native_symbol": c.native_symbol,
        "router": swap_router_address(c.chain_id).to_checksum(None),
        "wrapped_native": c.wrapped_native.to_checksum(None),
        "quoter_v2": c.quoter_v2.to_checksum(None),
    })
}

pub fn write_chains_table(out: &mut impl std::io::Write, chains: &[ChainDef]) -> std::io::Result<()> {
    writeln!(out, "{:>6}  {:<10} {:<6} {:<42} {:<42}", "id", "name", "native", "router", "wrapped")?;
    for c in chains {
        writeln!(
            out,
            "{:>6}  {:<10} {:<6} {:<42} {:<42}",
            c.chain_id,
            c.name,
            c.native_symbol,
            swap_router_address(c.chain_id).to_checksum(None),
            c.wrapped_native.to_checksum(None),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::networks::{chain_def, CHAINS};

    #[test]
    fn chain_json_uses_router_table() -> eyre::Result<()> {
        let base = chain_def(8453).ok_or_else(|| eyre::eyre!("base missing"))?;
        let v = chain_json(base);
        assert_eq!(
            v.get("router").and_then(serde_json::Value::as_str),
            Some("0x2626664c2603336E57B271c5C0b26F421741e481"),
            "base router"
        );
        Ok(())
    }

    #[test]
    fn table_has_a_row_per_chain() -> eyre::Result<()> {
        let mut buf = Vec::new();
        write_chains_table(&mut buf, CHAINS)?;
        let s = String::from_utf8(buf)?;
        assert_eq!(s.lines().count(), CHAINS.len() + 1, "header plus rows");
        Ok(())
    }
}
