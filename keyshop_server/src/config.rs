use std::{env, net::IpAddr, time::Duration};

use keyshop_engine::PaymentProviderConfig;
use ksp_common::{
    helpers::{env_value, parse_boolean_flag},
    Secret,
};
use log::*;
use rand::{thread_rng, RngCore};

use crate::errors::ServerError;

const DEFAULT_KSP_HOST: &str = "127.0.0.1";
const DEFAULT_KSP_PORT: u16 = 8370;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_DEPOSIT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_STOCK_SYNC_INTERVAL: Duration = Duration::from_secs(900);
const DEFAULT_PERMISSION_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When empty, the engine default (`sqlite://data/keyshop.db`) is used.
    pub database_url: String,
    pub max_connections: u32,
    pub auth: AuthConfig,
    pub webhooks: WebhookConfig,
    pub sweepers: SweeperConfig,
    pub permission_cache_ttl: Duration,
    /// Bank and wallet details for payment instructions.
    pub payment_providers: PaymentProviderConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KSP_HOST.to_string(),
            port: DEFAULT_KSP_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            webhooks: WebhookConfig::default(),
            sweepers: SweeperConfig::default(),
            permission_cache_ttl: DEFAULT_PERMISSION_CACHE_TTL,
            payment_providers: PaymentProviderConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KSP_HOST").ok().unwrap_or_else(|| DEFAULT_KSP_HOST.into());
        let port = env_or_default("KSP_PORT", DEFAULT_KSP_PORT);
        let database_url = env::var("KSP_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ KSP_DATABASE_URL is not set. The default database location will be used.");
            String::default()
        });
        let max_connections = env_or_default("KSP_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!("🪛️ Could not load the authentication configuration. {e}. Reverting to the default configuration.");
            AuthConfig::default()
        });
        let webhooks = WebhookConfig::from_env_or_default();
        let sweepers = SweeperConfig::from_env_or_default();
        let permission_cache_ttl =
            Duration::from_secs(env_or_default("KSP_PERMISSION_CACHE_TTL_SECS", DEFAULT_PERMISSION_CACHE_TTL.as_secs()));
        let use_x_forwarded_for = parse_boolean_flag(env::var("KSP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("KSP_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            max_connections,
            auth,
            webhooks,
            sweepers,
            permission_cache_ttl,
            payment_providers: PaymentProviderConfig::from_env(),
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

/// Reads and parses `name`, logging and falling back to `default` if it is missing or malformed.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env_value::<T>(name) {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Err(e) => {
            warn!("🪛️ {e} Using the default, {default}, instead.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret that bearer tokens are signed with.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The bearer token secret has not been set. I'm using a random value for this session. No token \
             issued elsewhere will be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let mut bytes = [0u8; 32];
        thread_rng().fill_bytes(&mut bytes);
        Self { jwt_secret: Secret::new(hex::encode(bytes)) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("KSP_AUTH_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [KSP_AUTH_SECRET]")))?;
        if secret.trim().len() < 16 {
            return Err(ServerError::ConfigurationError(
                "KSP_AUTH_SECRET must be at least 16 characters long".to_string(),
            ));
        }
        Ok(Self::new(secret))
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    /// Secret for the HMAC-SHA256 body signature. Signature checks are skipped when it is empty.
    pub hmac_secret: Secret<String>,
    /// If set, provider calls must carry `Authorization: Apikey <key>`.
    pub api_key: Option<Secret<String>>,
    /// If supplied, webhook calls are only accepted from these addresses.
    pub whitelist: Option<Vec<IpAddr>>,
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = Secret::new(env::var("KSP_WEBHOOK_SECRET").unwrap_or_default());
        if hmac_secret.is_empty() {
            warn!("🪛️ KSP_WEBHOOK_SECRET is not set. Webhook signatures will NOT be checked.");
        }
        let api_key =
            env::var("KSP_WEBHOOK_API_KEY").ok().filter(|s| !s.trim().is_empty()).map(|s| Secret::new(s.trim().into()));
        if api_key.is_none() {
            info!("🪛️ KSP_WEBHOOK_API_KEY is not set. Webhook calls will not be checked for an API key.");
        }
        let whitelist = env::var("KSP_WEBHOOK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(v) if v.is_empty() => warn!(
                "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 payment notifications."
            ),
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Webhook IP whitelist: {addrs}");
            },
            None => debug!("🪛️ No webhook IP whitelist is set."),
        }
        Self { hmac_secret, api_key, whitelist }
    }
}

/// "none", "false" and "0" explicitly disable the whitelist. Invalid entries are skipped.
fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        return None;
    }
    let addrs = s
        .split(',')
        .filter_map(|a| {
            a.trim()
                .parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({a}) in KSP_WEBHOOK_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect();
    Some(addrs)
}

//-------------------------------------------------  SweeperConfig  ----------------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct SweeperConfig {
    pub delivery_interval: Duration,
    pub deposit_interval: Duration,
    /// `None` disables the periodic stock sync.
    pub stock_sync_interval: Option<Duration>,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            delivery_interval: DEFAULT_SWEEP_INTERVAL,
            deposit_interval: DEFAULT_DEPOSIT_SWEEP_INTERVAL,
            stock_sync_interval: Some(DEFAULT_STOCK_SYNC_INTERVAL),
        }
    }
}

impl SweeperConfig {
    pub fn from_env_or_default() -> Self {
        let positive = |name: &str, default: Duration| {
            let secs = env_or_default(name, default.as_secs());
            if secs == 0 {
                warn!("🪛️ {name} must be positive. Using the default of {}s.", default.as_secs());
                default
            } else {
                Duration::from_secs(secs)
            }
        };
        let delivery_interval = positive("KSP_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL);
        let deposit_interval = positive("KSP_DEPOSIT_SWEEP_INTERVAL_SECS", DEFAULT_DEPOSIT_SWEEP_INTERVAL);
        let stock_sync_secs = env_or_default("KSP_STOCK_SYNC_INTERVAL_SECS", DEFAULT_STOCK_SYNC_INTERVAL.as_secs());
        let stock_sync_interval = (stock_sync_secs > 0).then(|| Duration::from_secs(stock_sync_secs));
        if stock_sync_interval.is_none() {
            info!("🪛️ The periodic stock sync is disabled.");
        }
        Self { delivery_interval, deposit_interval, stock_sync_interval }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that handlers need. It holds no secrets, so it can be handed to every worker.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
