//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.deskpin/config.json`) and
//! environment. Defaults match the stock desk deployment; every section can
//! be omitted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Desk API settings (base url, credentials, forced page limit).
    #[serde(default)]
    pub api: ApiConfig,

    /// Bookmark poll settings.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Mount-point search heuristics.
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Row rendering settings.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Desk API base url, session cookie, and the widened page limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Base url of the desk API (default the hosted deployment).
    #[serde(default = "default_api_base")]
    pub base_url: String,

    /// Session cookie sent with synthetic fetches. Overridden by the
    /// DESKPIN_COOKIE env when set.
    pub cookie: Option<String>,

    /// Page-size limit forced onto bookmark listing requests. Observed
    /// requests are only widened to this, never shrunk.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_api_base() -> String {
    "https://desk-api.channel.io/desk".to_string()
}

fn default_page_limit() -> u32 {
    500
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            cookie: None,
            page_limit: default_page_limit(),
        }
    }
}

/// Resolve the session cookie: env DESKPIN_COOKIE overrides config.
pub fn resolve_cookie(config: &Config) -> Option<String> {
    std::env::var("DESKPIN_COOKIE")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .api
                .cookie
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Bookmark poll interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshConfig {
    /// Seconds between synthetic bookmark fetches (default 10).
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    10
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval(),
        }
    }
}

/// Heuristic thresholds for the host mount search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatorConfig {
    /// Navigation-rail width band, inclusive, in px.
    #[serde(default = "default_rail_min_width")]
    pub rail_min_width: u32,
    #[serde(default = "default_rail_max_width")]
    pub rail_max_width: u32,

    /// Minimum declared height of the single child for a container to count
    /// as a virtualized list.
    #[serde(default = "default_min_list_height")]
    pub min_list_height: u32,

    /// Delays (ms) of the scheduled locate attempts after a confirmed
    /// capture.
    #[serde(default = "default_attempt_delays")]
    pub attempt_delays_ms: Vec<u64>,
}

fn default_rail_min_width() -> u32 {
    280
}

fn default_rail_max_width() -> u32 {
    420
}

fn default_min_list_height() -> u32 {
    600
}

fn default_attempt_delays() -> Vec<u64> {
    vec![1000, 2000, 3000]
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            rail_min_width: default_rail_min_width(),
            rail_max_width: default_rail_max_width(),
            min_list_height: default_min_list_height(),
            attempt_delays_ms: default_attempt_delays(),
        }
    }
}

/// Row rendering knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Hard cap on excerpt characters before the ellipsis.
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
}

fn default_excerpt_max_chars() -> usize {
    80
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            excerpt_max_chars: default_excerpt_max_chars(),
        }
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("DESKPIN_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".deskpin").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or DESKPIN_CONFIG_PATH). Missing file
/// => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let c = Config::default();
        assert_eq!(c.api.base_url, "https://desk-api.channel.io/desk");
        assert_eq!(c.api.page_limit, 500);
        assert_eq!(c.refresh.interval_secs, 10);
        assert_eq!(c.locator.attempt_delays_ms, vec![1000, 2000, 3000]);
        assert_eq!(c.render.excerpt_max_chars, 80);
    }

    #[test]
    fn partial_config_fills_section_defaults() {
        let c: Config =
            serde_json::from_str(r#"{"refresh":{"intervalSecs":3}}"#).expect("parse config");
        assert_eq!(c.refresh.interval_secs, 3);
        assert_eq!(c.api.page_limit, 500);
        assert!(c.locator.rail_min_width < c.locator.rail_max_width);
    }

    #[test]
    fn cookie_resolution_trims_and_skips_empty() {
        let mut c = Config::default();
        c.api.cookie = Some("  ".into());
        assert_eq!(resolve_cookie(&c), None);
        c.api.cookie = Some(" sid=abc ".into());
        assert_eq!(resolve_cookie(&c), Some("sid=abc".to_string()));
    }
}
