//! Stockwatch configuration system.
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! environment variables (a `.env` file is loaded into the environment first).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub tracker: PollConfig,
    #[serde(default)]
    pub product: ProductConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TrackerConfig {
    /// Load the full configuration: file (explicit path, else the default
    /// path if it exists), then `.env`, then process environment. Validates
    /// before returning.
    pub fn load(config_path: Option<&Path>, env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    Self::default()
                }
            }
        };

        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile(e.to_string()))?;
            }
            None => {
                // A missing .env is normal in container deployments
                if let Err(e) = dotenvy::dotenv()
                    && !e.not_found()
                {
                    return Err(ConfigError::EnvFile(e.to_string()));
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a specific TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the default config path (~/.stockwatch/config.toml).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stockwatch")
            .join("config.toml")
    }

    /// Overlay values from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TELEGRAM_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get("CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = get("TELEGRAM_API_BASE") {
            self.telegram.api_base = v;
        }
        if let Some(v) = get("CHECK_INTERVAL") {
            self.tracker.check_interval_secs = parse_number("CHECK_INTERVAL", &v)?;
        }
        if let Some(v) = get("PORT") {
            self.gateway.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = get("PRODUCT_ALIAS") {
            self.product.alias = v;
        }
        if let Some(v) = get("PRODUCT_NAME") {
            self.product.display_name = v;
        }
        if let Some(v) = get("SITE_URL") {
            self.product.site_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("COOKIE_DOMAIN") {
            self.cookies.domain = v;
        }
        if let Some(v) = get("EXT_NAME") {
            self.cookies.ext_name = v;
        }
        if let Some(v) = get("CF_CLEARANCE") {
            self.cookies.cf_clearance = v;
        }
        if let Some(v) = get("JSESSIONID") {
            self.cookies.jsessionid = v;
        }
        if let Some(v) = get("CFUVID") {
            self.cookies.cfuvid = v;
        }
        if let Some(v) = get("CF_BM") {
            self.cookies.cf_bm = v;
        }
        // LOG_FILE may be set to an empty string to disable file logging
        if let Some(v) = lookup("LOG_FILE") {
            self.logging.file = v.trim().to_string();
        }
        Ok(())
    }

    /// Reject configurations the tracker cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_TOKEN"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::Missing("CHAT_ID"));
        }
        if self.tracker.check_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "CHECK_INTERVAL",
                value: "0".into(),
            });
        }
        if self.product.alias.trim().is_empty() {
            return Err(ConfigError::Missing("PRODUCT_ALIAS"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

/// Telegram notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Numeric chat id or `@channel` name.
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api_base(),
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".into()
}

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
        }
    }
}

fn default_check_interval() -> u64 {
    300
}

/// The watched product and the shop it lives on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    #[serde(default = "default_alias")]
    pub alias: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            alias: default_alias(),
            display_name: default_display_name(),
            site_url: default_site_url(),
        }
    }
}

fn default_alias() -> String {
    "amul-high-protein-rose-lassi-200-ml-or-pack-of-30".into()
}
fn default_display_name() -> String {
    "Amul Rose Lassi".into()
}
fn default_site_url() -> String {
    "https://shop.amul.com".into()
}

impl ProductConfig {
    /// Product query endpoint. The alias filter is sent percent-encoded the
    /// way the shop frontend does it.
    pub fn api_url(&self) -> String {
        format!(
            "{}/api/1/entity/ms.products?q=%7B%22alias%22:%22{}%22%7D&limit=1",
            self.site_url, self.alias
        )
    }

    /// Product page, sent as the `Base_Url` header.
    pub fn page_url(&self) -> String {
        format!("{}/en/product/{}", self.site_url, self.alias)
    }

    /// Shop root, sent as the `Referer` header and used in alerts.
    pub fn referer(&self) -> String {
        format!("{}/", self.site_url)
    }
}

/// Session cookies. Empty values are not installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_domain")]
    pub domain: String,
    #[serde(default = "default_ext_name")]
    pub ext_name: String,
    #[serde(default)]
    pub cf_clearance: String,
    #[serde(default)]
    pub jsessionid: String,
    #[serde(default)]
    pub cfuvid: String,
    #[serde(default)]
    pub cf_bm: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            domain: default_cookie_domain(),
            ext_name: default_ext_name(),
            cf_clearance: String::new(),
            jsessionid: String::new(),
            cfuvid: String::new(),
            cf_bm: String::new(),
        }
    }
}

fn default_cookie_domain() -> String {
    ".shop.amul.com".into()
}
fn default_ext_name() -> String {
    "ojplmecpdpgccookcobabopnaifgidhf".into()
}

impl CookieConfig {
    /// Cookie name/value pairs to install, skipping empty values.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("ext_name", self.ext_name.as_str()),
            ("cf_clearance", self.cf_clearance.as_str()),
            ("jsessionid", self.jsessionid.as_str()),
            ("_cfuvid", self.cfuvid.as_str()),
            ("__cf_bm", self.cf_bm.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect()
    }
}

/// Liveness server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    10000
}

/// Log persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Append-only log file; empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> String {
    "stock_tracker.log".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.tracker.check_interval_secs, 300);
        assert_eq!(config.gateway.port, 10000);
        assert_eq!(config.cookies.domain, ".shop.amul.com");
        assert_eq!(config.logging.file, "stock_tracker.log");
        // Only ext_name has a default value
        assert_eq!(config.cookies.pairs().len(), 1);
    }

    #[test]
    fn test_missing_token_rejected() {
        let mut config = TrackerConfig::default();
        config.apply_env(env(&[("CHAT_ID", "42")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_TOKEN")));
    }

    #[test]
    fn test_missing_chat_id_rejected() {
        let mut config = TrackerConfig::default();
        config
            .apply_env(env(&[("TELEGRAM_TOKEN", "123:abc"), ("CHAT_ID", "  ")]))
            .unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Missing("CHAT_ID")
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TrackerConfig::default();
        config
            .apply_env(env(&[
                ("TELEGRAM_TOKEN", "123:abc"),
                ("CHAT_ID", "-100200"),
                ("CHECK_INTERVAL", "120"),
                ("PORT", "8080"),
                ("CF_CLEARANCE", "clear"),
                ("CF_BM", "bm"),
                ("SITE_URL", "http://127.0.0.1:9000/"),
            ]))
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.tracker.check_interval_secs, 120);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.product.site_url, "http://127.0.0.1:9000");

        let names: Vec<&str> = config.cookies.pairs().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["ext_name", "cf_clearance", "__cf_bm"]);
    }

    #[test]
    fn test_invalid_interval() {
        let mut config = TrackerConfig::default();
        let err = config
            .apply_env(env(&[("CHECK_INTERVAL", "five minutes")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CHECK_INTERVAL", .. }));

        let mut config = TrackerConfig::default();
        config
            .apply_env(env(&[
                ("TELEGRAM_TOKEN", "t"),
                ("CHAT_ID", "1"),
                ("CHECK_INTERVAL", "0"),
            ]))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_file_disables() {
        let mut config = TrackerConfig::default();
        config.apply_env(env(&[("LOG_FILE", "")])).unwrap();
        assert!(config.logging.file.is_empty());
    }

    #[test]
    fn test_load_from_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[telegram]
bot_token = "file-token"
chat_id = "7"

[tracker]
check_interval_secs = 60

[product]
alias = "amul-kool-koko"
"#,
        )
        .unwrap();

        let mut config = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(config.telegram.bot_token, "file-token");
        assert_eq!(config.tracker.check_interval_secs, 60);
        assert_eq!(config.gateway.port, 10000);

        config.apply_env(env(&[("CHECK_INTERVAL", "90")])).unwrap();
        config.validate().unwrap();
        assert_eq!(config.tracker.check_interval_secs, 90);
        assert!(config.product.api_url().contains("amul-kool-koko"));
    }

    #[test]
    fn test_product_urls() {
        let product = ProductConfig::default();
        assert_eq!(
            product.api_url(),
            "https://shop.amul.com/api/1/entity/ms.products?q=%7B%22alias%22:%22amul-high-protein-rose-lassi-200-ml-or-pack-of-30%22%7D&limit=1"
        );
        assert_eq!(
            product.page_url(),
            "https://shop.amul.com/en/product/amul-high-protein-rose-lassi-200-ml-or-pack-of-30"
        );
        assert_eq!(product.referer(), "https://shop.amul.com/");
    }
}
