use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tron::TronAddress;

pub(super) fn parse_tron_address(label: &str, s: &str) -> Result<TronAddress> {
    TronAddress::parse_text(s.trim()).with_context(|| format!("invalid {label}: {s}"))
}

pub(super) fn parse_url(label: &str, s: &str) -> Result<String> {
    let v = s.trim().trim_end_matches('/');
    if v.is_empty() {
        anyhow::bail!("{label} must be set");
    }
    if !v.starts_with("http://") && !v.starts_with("https://") {
        anyhow::bail!("{label} must be an http(s) url (got {v})");
    }
    Ok(v.to_string())
}

pub(super) fn parse_hex_32(label: &str, s: &str) -> Result<[u8; 32]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).with_context(|| format!("invalid hex for {label}"))?;
    if bytes.len() != 32 {
        anyhow::bail!("{label} must be 32 bytes (got {})", bytes.len());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Empty input yields an empty list.
pub(super) fn parse_hex_32_csv(label: &str, s: &str) -> Result<Vec<[u8; 32]>> {
    let mut out = Vec::new();
    for raw in s.split(',') {
        let v = raw.trim();
        if v.is_empty() {
            continue;
        }
        out.push(parse_hex_32(label, v)?);
    }
    Ok(out)
}

pub(super) fn opt_path(s: &str) -> Option<PathBuf> {
    let v = s.trim();
    if v.is_empty() {
        None
    } else {
        Some(PathBuf::from(v))
    }
}

pub(super) fn millis(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_32_csv_trims_and_skips_empty() {
        let k = "11".repeat(32);
        let out = parse_hex_32_csv("K", &format!(" 0x{k}, ,{k} ")).unwrap();
        assert_eq!(out, vec![[0x11u8; 32], [0x11u8; 32]]);
        assert!(parse_hex_32_csv("K", "").unwrap().is_empty());

        let err = parse_hex_32_csv("K", "0x11").unwrap_err().to_string();
        assert!(err.contains("must be 32 bytes"));
    }

    #[test]
    fn parse_url_requires_scheme_and_strips_slash() {
        assert_eq!(
            parse_url("U", " https://api.trongrid.io/ ").unwrap(),
            "https://api.trongrid.io"
        );
        assert!(parse_url("U", "api.trongrid.io").is_err());
        assert!(parse_url("U", " ").is_err());
    }

    #[test]
    fn opt_path_treats_blank_as_none() {
        assert_eq!(opt_path("  "), None);
        assert_eq!(opt_path("a.json"), Some(PathBuf::from("a.json")));
    }
}
