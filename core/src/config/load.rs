use std::path::{Path, PathBuf};

use super::types::LoaderConfig;

/// Config file location: `$MODLINK_CONFIG`, else `./modlink.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("MODLINK_CONFIG") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v),
        _ => PathBuf::from("modlink.toml"),
    }
}

pub fn load_default() -> anyhow::Result<LoaderConfig> {
    let path = config_path();
    let mut cfg = load_from(&path)?;
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

/// Parse `path` if it exists, defaults otherwise.
pub fn load_from(path: &Path) -> anyhow::Result<LoaderConfig> {
    if !path.exists() {
        return Ok(LoaderConfig::default());
    }
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<LoaderConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}

// Environment variable overrides (highest priority)
fn apply_env_overrides(cfg: &mut LoaderConfig) -> anyhow::Result<()> {
    if let Ok(v) = std::env::var("MODLINK_COMBINE") {
        if !v.trim().is_empty() {
            cfg.combine = parse_bool(&v)
                .ok_or_else(|| anyhow::anyhow!("MODLINK_COMBINE must be a boolean, got '{v}'"))?;
        }
    }
    if let Ok(v) = std::env::var("MODLINK_MAX_CONCURRENT_FETCHES") {
        if !v.trim().is_empty() {
            cfg.max_concurrent_fetches = v.trim().parse().map_err(|_| {
                anyhow::anyhow!("MODLINK_MAX_CONCURRENT_FETCHES must be a number, got '{v}'")
            })?;
        }
    }
    Ok(())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
