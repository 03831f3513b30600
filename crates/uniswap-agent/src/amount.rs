use alloy::primitives::U256;
use eyre::Context as _;

/// Reject empty, negative, malformed and zero decimal amounts before any decimals are known.
pub fn ensure_positive_decimal(s: &str) -> eyre::Result<()> {
    let s = s.trim();
    if s.is_empty() {
        eyre::bail!("empty amount");
    }
    if s.starts_with('-') {
        eyre::bail!("amount must be positive");
    }
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        eyre::bail!("malformed amount: {s}");
    }
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        eyre::bail!("malformed amount: {s}");
    }
    if whole.bytes().chain(frac.bytes()).all(|b| b == b'0') {
        eyre::bail!("amount must be greater than zero");
    }
    Ok(())
}

/// Convert a decimal token amount into atoms (`amount * 10^decimals`) without floats.
pub fn parse_units(s: &str, decimals: u8) -> eyre::Result<U256> {
    let s = s.trim();
    if s.is_empty() {
        eyre::bail!("empty amount");
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

    if whole.starts_with('-') {
        eyre::bail!("amount must be non-negative");
    }

    let whole_v = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).context("parse whole")?
    };

    let decimals_len = usize::from(decimals);
    if frac.len() > decimals_len {
        eyre::bail!("too many decimal places for token (decimals={decimals})");
    }

    let mut frac_s = frac.to_owned();
    while frac_s.len() < decimals_len {
        frac_s.push('0');
    }
    let frac_v = if frac_s.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_s, 10).context("parse fractional")?
    };

    let scale = U256::from(10_u8)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| eyre::eyre!("decimals too large"))?;

    whole_v
        .checked_mul(scale)
        .and_then(|x| x.checked_add(frac_v))
        .ok_or_else(|| eyre::eyre!("amount overflow"))
}

/// Format atoms back into a trimmed decimal string.
///
/// Examples:
/// - base=1500000, decimals=6 => "1.5"
/// - base=1, decimals=6 => "0.000001"
pub fn format_units(base: U256, decimals: u8) -> String {
    let width = usize::from(decimals);
    if width == 0 {
        return base.to_string();
    }
    let digits = base.to_string();
    let padded = format!("{digits:0>w$}", w = width.saturating_add(1));
    let (whole, frac) = padded.split_at(padded.len().saturating_sub(width));
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_owned()
    } else {
        format!("{whole}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units_basic() -> eyre::Result<()> {
        assert_eq!(parse_units("1", 6)?, U256::from(1_000_000_u64), "whole");
        assert_eq!(parse_units("1.5", 6)?, U256::from(1_500_000_u64), "fraction");
        assert_eq!(parse_units("0.000001", 6)?, U256::from(1_u64), "smallest");
        assert_eq!(parse_units(".5", 1)?, U256::from(5_u64), "leading dot");
        assert_eq!(
            parse_units("2", 18)?,
            U256::from(2_000_000_000_000_000_000_u128),
            "18 decimals"
        );
        Ok(())
    }

    #[test]
    fn parse_units_rejects_too_many_decimals() {
        let r = parse_units("1.0000001", 6);
        assert!(r.is_err(), "expected error, got ok");
        if let Err(err) = r {
            assert!(
                err.to_string().contains("too many decimal places"),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn positivity_check() {
        assert!(ensure_positive_decimal("0").is_err(), "zero");
        assert!(ensure_positive_decimal("0.000").is_err(), "zero with fraction");
        assert!(ensure_positive_decimal("-1").is_err(), "negative");
        assert!(ensure_positive_decimal("abc").is_err(), "malformed");
        assert!(ensure_positive_decimal("1e18").is_err(), "scientific");
        assert!(ensure_positive_decimal("").is_err(), "empty");
        assert!(ensure_positive_decimal(".").is_err(), "lone dot");
        assert!(ensure_positive_decimal("0.01").is_ok(), "small positive");
        assert!(ensure_positive_decimal(" 12 ").is_ok(), "padded");
    }

    #[test]
    fn format_units_trims() {
        assert_eq!(format_units(U256::from(1_500_000_u64), 6), "1.5", "fraction");
        assert_eq!(format_units(U256::from(1_u64), 6), "0.000001", "smallest");
        assert_eq!(format_units(U256::from(10_000_000_u64), 6), "10", "whole");
        assert_eq!(format_units(U256::from(42_u64), 0), "42", "no decimals");
        assert_eq!(format_units(U256::from(7_u64), 200), format!("0.{}7", "0".repeat(199)), "huge decimals");
    }
}
