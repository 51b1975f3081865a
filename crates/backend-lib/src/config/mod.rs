// ============================
// crates/backend-lib/src/config/mod.rs
// ============================
//! Configuration management.
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};

use crate::auth::DEFAULT_PASSWORD_COST;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    pub account: AccountSettings,
    pub gateway: GatewaySettings,
    pub rate_limit: RateLimitSettings,
}

/// Account service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub bind_addr: SocketAddr,
    /// Session token lifetime in seconds
    pub session_ttl_secs: u64,
    /// scrypt `log_n`
    pub password_cost: u8,
    /// Bound on user repository and session store calls
    pub query_timeout_ms: u64,
    /// Bound on the store ping at startup
    pub store_ping_timeout_ms: u64,
}

/// HTTP gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub bind_addr: SocketAddr,
    /// Base URL of the account service
    pub account_rpc_url: String,
    pub is_auth_timeout_ms: u64,
    pub rpc_connect_timeout_ms: u64,
    pub rpc_timeout_ms: u64,
    /// Origin allowed by CORS; none disables cross-origin access
    pub allowed_origin: Option<String>,
}

/// Token bucket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub capacity: u32,
    pub refill_per_sec: f64,
    pub sweep_interval_secs: u64,
    pub idle_ttl_secs: u64,
    /// Key clients by `X-Forwarded-For`/`X-Real-IP`; enable only behind a
    /// proxy that overwrites them
    pub trust_forwarded_headers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            account: AccountSettings::default(),
            gateway: GatewaySettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8082)),
            session_ttl_secs: 60 * 60,
            password_cost: DEFAULT_PASSWORD_COST,
            query_timeout_ms: 3000,
            store_ping_timeout_ms: 5000,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            account_rpc_url: "http://127.0.0.1:8082".to_string(),
            is_auth_timeout_ms: 1000,
            rpc_connect_timeout_ms: 5000,
            rpc_timeout_ms: 5000,
            allowed_origin: None,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 4,
            refill_per_sec: 2.0,
            sweep_interval_secs: 60,
            idle_ttl_secs: 3 * 60,
            trust_forwarded_headers: false,
        }
    }
}

impl Settings {
    /// Defaults, then `config/default.toml`, then `kalenderium.toml`, then
    /// `KALENDERIUM_*` variables (`__` separates nested keys).
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Self::base()
                .merge(Toml::file("config/default.toml"))
                .merge(Toml::file("kalenderium.toml")),
        )
    }

    /// Defaults, then the TOML file at `path`, then the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        Self::from_figment(Self::base().merge(Toml::file(path)))
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .merge(Env::prefixed("KALENDERIUM_").split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("unknown log level: {}", self.log_level);
        }

        let account = &self.account;
        if account.session_ttl_secs == 0 {
            bail!("account.session_ttl_secs must be greater than zero");
        }
        if !(1..=20).contains(&account.password_cost) {
            bail!("account.password_cost must be between 1 and 20");
        }
        if account.query_timeout_ms == 0 || account.store_ping_timeout_ms == 0 {
            bail!("account timeouts must be greater than zero");
        }

        let gateway = &self.gateway;
        if gateway.is_auth_timeout_ms == 0
            || gateway.rpc_connect_timeout_ms == 0
            || gateway.rpc_timeout_ms == 0
        {
            bail!("gateway timeouts must be greater than zero");
        }
        if gateway.account_rpc_url.is_empty() {
            bail!("gateway.account_rpc_url must be set");
        }

        let rate_limit = &self.rate_limit;
        if rate_limit.capacity == 0 {
            bail!("rate_limit.capacity must be greater than zero");
        }
        if !(rate_limit.refill_per_sec > 0.0) {
            bail!("rate_limit.refill_per_sec must be greater than zero");
        }
        if rate_limit.sweep_interval_secs == 0 || rate_limit.idle_ttl_secs == 0 {
            bail!("rate_limit sweep settings must be greater than zero");
        }
        Ok(())
    }
}

impl AccountSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn store_ping_timeout(&self) -> Duration {
        Duration::from_millis(self.store_ping_timeout_ms)
    }
}

impl GatewaySettings {
    pub fn is_auth_timeout(&self) -> Duration {
        Duration::from_millis(self.is_auth_timeout_ms)
    }

    pub fn rpc_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_connect_timeout_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

impl RateLimitSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}
