use alloy::primitives::U256;
use anyhow::{Context, Result};
use tron::SUN_PER_TRX;

pub const TRX_DECIMALS: u32 = 6;

/// Parses a positive decimal string (`"12"`, `"0.5"`, `"1.000001"`) into base units with
/// `decimals` fractional digits. Rejects zero, signs, exponents and over-precise input.
pub fn parse_units(label: &str, s: &str, decimals: u32) -> Result<u128> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("{label}: amount is empty");
    }
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        anyhow::bail!("{label}: invalid amount {s:?}");
    }
    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !digits(int_part) || !digits(frac_part) {
        anyhow::bail!("{label}: invalid amount {s:?} (digits and one '.' only)");
    }
    if frac_part.len() > decimals as usize {
        anyhow::bail!("{label}: at most {decimals} decimal places allowed (got {s:?})");
    }

    let scale = 10u128
        .checked_pow(decimals)
        .context("decimals out of range")?;
    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .with_context(|| format!("{label}: amount too large"))?
    };
    let mut frac_value: u128 = 0;
    if !frac_part.is_empty() {
        let padded = format!("{frac_part:0<width$}", width = decimals as usize);
        frac_value = padded
            .parse()
            .with_context(|| format!("{label}: invalid fraction"))?;
    }
    let total = int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .with_context(|| format!("{label}: amount too large"))?;
    if total == 0 {
        anyhow::bail!("{label}: amount must be greater than zero");
    }
    Ok(total)
}

pub fn parse_trx_to_sun(label: &str, s: &str) -> Result<u64> {
    let v = parse_units(label, s, TRX_DECIMALS)?;
    u64::try_from(v).with_context(|| format!("{label}: amount too large"))
}

pub fn parse_token_units(label: &str, s: &str, decimals: u32) -> Result<U256> {
    Ok(U256::from(parse_units(label, s, decimals)?))
}

pub fn format_units(v: u128, decimals: u32) -> String {
    if decimals == 0 {
        return v.to_string();
    }
    let scale = 10u128.pow(decimals);
    format!(
        "{}.{:0width$}",
        v / scale,
        v % scale,
        width = decimals as usize
    )
}

/// `12_500_000` → `"12.500000"`.
pub fn format_sun(sun: u64) -> String {
    format_units(u128::from(sun), TRX_DECIMALS)
}

pub fn format_token(v: U256, decimals: u32) -> String {
    match u128::try_from(v) {
        Ok(v) => format_units(v, decimals),
        Err(_) => format!("{v} (base units)"),
    }
}

pub fn trx_to_sun(trx: u64) -> u64 {
    trx.saturating_mul(SUN_PER_TRX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trx_exactly() {
        assert_eq!(parse_trx_to_sun("a", "30").unwrap(), 30_000_000);
        assert_eq!(parse_trx_to_sun("a", "0.5").unwrap(), 500_000);
        assert_eq!(parse_trx_to_sun("a", ".25").unwrap(), 250_000);
        assert_eq!(parse_trx_to_sun("a", "1.000001").unwrap(), 1_000_001);
        assert_eq!(parse_trx_to_sun("a", " 12. ").unwrap(), 12_000_000);
        // 0.1 + 0.2 style float drift must not happen.
        assert_eq!(parse_trx_to_sun("a", "0.3").unwrap(), 300_000);
    }

    #[test]
    fn rejects_zero_negative_and_malformed() {
        for bad in ["0", "0.0", "", "-1", "+1", "1e6", "abc", "1.2.3", ".", "1.0000001"] {
            assert!(parse_trx_to_sun("amount", bad).is_err(), "accepted {bad:?}");
        }
        let err = parse_trx_to_sun("amount", "0").unwrap_err().to_string();
        assert!(err.contains("greater than zero"));
    }

    #[test]
    fn token_units_follow_decimals() {
        assert_eq!(
            parse_token_units("t", "10.5", 6).unwrap(),
            U256::from(10_500_000u64)
        );
        assert_eq!(parse_token_units("t", "3", 0).unwrap(), U256::from(3u64));
        assert!(parse_token_units("t", "3.1", 0).is_err());
    }

    #[test]
    fn formats_sun_and_tokens() {
        assert_eq!(format_sun(12_500_000), "12.500000");
        assert_eq!(format_sun(1), "0.000001");
        assert_eq!(format_token(U256::from(42u64), 0), "42");
        assert_eq!(format_token(U256::from(1_234_567u64), 6), "1.234567");
        assert_eq!(trx_to_sun(10), 10_000_000);
    }
}
