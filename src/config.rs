//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/relaydeck/config.json`
//! (see [`config_dir`]).  The file is optional and every section falls back
//! to compiled-in defaults, so a missing file, a minimal `{}` file and a
//! partial file are all valid.
//!
//! # Example
//!
//! ```json
//! {
//!   "relay": { "listen": "127.0.0.1:8765" },
//!   "panel": {
//!     "decrement_value": 0.1,
//!     "check_delay_ms": 500,
//!     "result_check_delay_ms": 1500,
//!     "resubmit_delay_ms": 500,
//!     "max_random_delay_ms": 500,
//!     "card_columns": 3,
//!     "target_offset_secs": 30
//!   },
//!   "arranger": {
//!     "url_file": "itemurl.txt",
//!     "browser_path": null,
//!     "browser_titles": ["Chrome", "Firefox"],
//!     "launch_timeout_ms": 30000,
//!     "poll_interval_ms": 500,
//!     "restore_settle_ms": 200
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Control panel defaults.
    #[serde(default)]
    pub panel: PanelConfig,

    /// Browser grid arranger settings.
    #[serde(default)]
    pub arranger: ArrangerConfig,
}

/// WebSocket relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the listener binds to.  Clients connect to `ws://<listen>`.
    pub listen: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8765)),
        }
    }
}

/// Initial values of the control panel's global settings, and card layout.
///
/// All delays are in **milliseconds**.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub decrement_value: f64,
    pub check_delay_ms: u64,
    pub result_check_delay_ms: u64,
    pub resubmit_delay_ms: u64,
    /// Upper bound (inclusive) of the per-client start jitter.
    pub max_random_delay_ms: u64,
    /// Number of product cards per row.
    pub card_columns: usize,
    /// Offset applied by the "now + N s" button.
    pub target_offset_secs: i64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            decrement_value: 0.1,
            check_delay_ms: 500,
            result_check_delay_ms: 1500,
            resubmit_delay_ms: 500,
            max_random_delay_ms: 500,
            card_columns: 3,
            target_offset_secs: 30,
        }
    }
}

/// Browser grid arranger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrangerConfig {
    /// Newline-separated URL list.  Relative paths resolve against the
    /// config directory.
    pub url_file: PathBuf,
    /// Explicit browser executable; searched in standard locations if unset.
    pub browser_path: Option<PathBuf>,
    /// A window counts as a browser window if its title contains any of these.
    pub browser_titles: Vec<String>,
    /// How long to wait for launched windows to appear.
    pub launch_timeout_ms: u64,
    /// How often to re-enumerate windows while waiting.
    pub poll_interval_ms: u64,
    /// Pause after restoring a minimized/maximized window before moving it.
    pub restore_settle_ms: u64,
}

impl Default for ArrangerConfig {
    fn default() -> Self {
        Self {
            url_file: PathBuf::from("itemurl.txt"),
            browser_path: None,
            browser_titles: ["Chrome", "Firefox", "Edge", "Brave", "Opera", "谷歌浏览器"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            launch_timeout_ms: 30_000,
            poll_interval_ms: 500,
            restore_settle_ms: 200,
        }
    }
}

impl ArrangerConfig {
    /// The URL file path, resolved against `base` when relative.
    pub fn url_file_in(&self, base: &Path) -> PathBuf {
        if self.url_file.is_absolute() {
            self.url_file.clone()
        } else {
            base.join(&self.url_file)
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults.
    pub fn load_or_default() -> Self {
        let path = config_dir().join("config.json");
        match Self::load(&path) {
            Ok(cfg) => {
                log::info!("loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::info!("no config file ({}), using defaults", e);
                Self::default()
            }
        }
    }
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/relaydeck`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("relaydeck")
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "relay": { "listen": "0.0.0.0:9000" },
            "panel": {
                "decrement_value": 0.5,
                "check_delay_ms": 100,
                "result_check_delay_ms": 200,
                "resubmit_delay_ms": 300,
                "max_random_delay_ms": 50,
                "card_columns": 4,
                "target_offset_secs": 60
            },
            "arranger": {
                "url_file": "/srv/urls.txt",
                "browser_path": "/opt/chrome/chrome",
                "browser_titles": ["Vivaldi"],
                "launch_timeout_ms": 1000,
                "poll_interval_ms": 10,
                "restore_settle_ms": 0
            }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.relay.listen.port(), 9000);
        assert_eq!(cfg.panel.decrement_value, 0.5);
        assert_eq!(cfg.panel.card_columns, 4);
        assert_eq!(cfg.panel.target_offset_secs, 60);
        assert_eq!(cfg.arranger.browser_titles, vec!["Vivaldi".to_string()]);
        assert_eq!(
            cfg.arranger.browser_path,
            Some(PathBuf::from("/opt/chrome/chrome"))
        );
        assert_eq!(cfg.arranger.poll_interval_ms, 10);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.relay.listen, RelayConfig::default().listen);
        assert_eq!(cfg.relay.listen.port(), 8765);
        let pd = PanelConfig::default();
        assert_eq!(cfg.panel.check_delay_ms, pd.check_delay_ms);
        assert_eq!(cfg.panel.result_check_delay_ms, 1500);
        assert_eq!(cfg.panel.max_random_delay_ms, 500);
        assert_eq!(cfg.arranger.url_file, PathBuf::from("itemurl.txt"));
        assert_eq!(cfg.arranger.browser_titles.len(), 6);
    }

    #[test]
    fn deserialize_partial_panel() {
        let json = r#"{ "panel": { "resubmit_delay_ms": 900 } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.panel.resubmit_delay_ms, 900);
        assert_eq!(cfg.panel.decrement_value, PanelConfig::default().decrement_value);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "relay": {}, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn url_file_resolution() {
        let mut a = ArrangerConfig::default();
        assert_eq!(
            a.url_file_in(Path::new("/etc/relaydeck")),
            PathBuf::from("/etc/relaydeck/itemurl.txt")
        );
        a.url_file = PathBuf::from("/data/urls.txt");
        assert_eq!(
            a.url_file_in(Path::new("/etc/relaydeck")),
            PathBuf::from("/data/urls.txt")
        );
    }

    #[test]
    fn load_reads_file_and_reports_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "relay": {{ "listen": "127.0.0.1:1234" }} }}"#).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.relay.listen.port(), 1234);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "{{ not json").unwrap();
        let err = Config::load(bad.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        assert!(Config::load(Path::new("/nonexistent/relaydeck.json")).is_err());
    }
}
