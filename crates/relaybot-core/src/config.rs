use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Protocol constants shared across crates.
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "0.0.0.0";
/// Configuration cache TTL.
pub const CONFIG_CACHE_TTL_SECS: u64 = 60;
/// Soft-lock deadlines.
pub const TOPIC_CREATE_LOCK_TTL_SECS: u64 = 5;
pub const INBOX_LOCK_TTL_SECS: u64 = 3;
/// Minimum gap between quiet-hours notices to the same user.
pub const QUIET_HOURS_COOLDOWN_SECS: i64 = 300;
/// `initData.auth_date` freshness window.
pub const INIT_DATA_MAX_AGE_SECS: i64 = 600;
/// Block-keyword pattern length cap.
pub const KEYWORD_MAX_LEN: usize = 256;
/// Message text truncation before keyword matching.
pub const MESSAGE_TRUNCATE_LEN: usize = 2000;
/// Forum topic name truncation.
pub const TOPIC_NAME_MAX_LEN: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relaybot/relaybot.db", home)
}

/// The part of configuration figment is responsible for: deployment settings
/// that aren't platform secrets. Secrets (bot token, captcha keys, admin ids)
/// are read straight from the environment — see [`RelayConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    store: StoreConfig,
}

/// Captcha provider secrets. Which provider is active (`captcha_mode`) is a
/// *rule*, stored in and toggled through the configuration store — not here.
/// This struct only carries the fixed deployment secrets.
#[derive(Debug, Clone, Default)]
pub struct CaptchaSecrets {
    pub turnstile_site_key: Option<String>,
    pub turnstile_secret_key: Option<String>,
    pub recaptcha_site_key: Option<String>,
    pub recaptcha_secret_key: Option<String>,
}

/// Full runtime configuration.
///
/// `server`/`store` come from `~/.relaybot/relaybot.toml` (figment, with
/// `RELAYBOT_*` env overrides). Everything else is a flat platform
/// environment variable — these are deployment secrets and external-platform
/// identifiers, not app config, so they bypass the `RELAYBOT_` prefix
/// convention.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub bot_token: String,
    pub admin_group_id: i64,
    pub admin_ids: Vec<String>,
    pub worker_url: String,
    pub captcha: CaptchaSecrets,
}

impl RelayConfig {
    /// Load config. Checks, in order:
    ///   1. Explicit path argument
    ///   2. `RELAYBOT_CONFIG` env var
    ///   3. `~/.relaybot/relaybot.toml`
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("RELAYBOT_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let file: FileConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RELAYBOT_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        let bot_token = require_env("BOT_TOKEN")?;
        let admin_group_id = require_env("ADMIN_GROUP_ID")?
            .parse::<i64>()
            .map_err(|_| crate::error::CoreError::Config("ADMIN_GROUP_ID must be an integer".into()))?;
        let admin_ids = std::env::var("ADMIN_IDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let worker_url = require_env("WORKER_URL")?;

        let captcha = CaptchaSecrets {
            turnstile_site_key: std::env::var("TURNSTILE_SITE_KEY").ok(),
            turnstile_secret_key: std::env::var("TURNSTILE_SECRET_KEY").ok(),
            recaptcha_site_key: std::env::var("RECAPTCHA_SITE_KEY").ok(),
            recaptcha_secret_key: std::env::var("RECAPTCHA_SECRET_KEY").ok(),
        };

        Ok(Self {
            server: file.server,
            store: file.store,
            bot_token,
            admin_group_id,
            admin_ids,
            worker_url,
            captcha,
        })
    }

    /// True if `id` appears in `ADMIN_IDS`. Primary-admin-only gates (the
    /// admin console) use this; broader admin checks also consult
    /// `authorized_admins` in the rule store.
    pub fn is_primary_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == user_id)
    }
}

fn require_env(key: &str) -> crate::error::Result<String> {
    std::env::var(key).map_err(|_| crate::error::CoreError::MissingEnv(key.to_string()))
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relaybot/relaybot.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_primary_admin_matches_exact() {
        let mut cfg = minimal_config();
        cfg.admin_ids = vec!["111".to_string(), "222".to_string()];
        assert!(cfg.is_primary_admin("111"));
        assert!(!cfg.is_primary_admin("333"));
    }

    fn minimal_config() -> RelayConfig {
        RelayConfig {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            bot_token: "t".into(),
            admin_group_id: -100,
            admin_ids: vec![],
            worker_url: "https://example.com".into(),
            captcha: CaptchaSecrets::default(),
        }
    }
}
