use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use order_common::{
    helpers::{parse_boolean_flag, parse_number},
    Secret,
};

const DEFAULT_OMS_HOST: &str = "0.0.0.0";
const DEFAULT_OMS_PORT: u16 = 8080;
const DEFAULT_OMS_HOSTNAME: &str = "localhost";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_EVENT_QUEUE_SIZE: usize = 100;
const DEFAULT_EVENT_PROCESSING_DELAY_MS: u64 = 100;
const DEFAULT_IDEMPOTENCY_TTL_SECS: i64 = order_engine::DEFAULT_IDEMPOTENCY_TTL_SECS;
const DEFAULT_IDEMPOTENCY_PURGE_INTERVAL_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;
const MAX_EVENT_QUEUE_SIZE: usize = 1_000_000;
const MAX_IDEMPOTENCY_TTL_SECS: i64 = order_engine::MAX_IDEMPOTENCY_TTL_SECS;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 24 * 60 * 60;

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_PASSWORD: &str = "postgres";
const DEFAULT_DB_NAME: &str = "ordersdb";
const DEFAULT_DB_SSLMODE: &str = "disable";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The name the service is reachable under. Only used for logging.
    pub hostname: String,
    pub database: DatabaseConfig,
    /// The log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// If false, the HTTP access log is switched off.
    pub access_log: bool,
    /// The number of order-created events that can wait for the worker before new ones are dropped.
    pub event_queue_size: usize,
    /// How long the stock event handler pretends to work on each event.
    pub event_processing_delay: Duration,
    /// How long a response stays bound to its idempotency key.
    pub idempotency_ttl: chrono::Duration,
    /// How often expired idempotency records are deleted.
    pub idempotency_purge_interval: Duration,
    /// Requests that take longer than this are cancelled. Orders that were already stored are kept.
    pub request_timeout: Duration,
    /// How long in-flight requests get to finish once shutdown starts.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OMS_HOST.to_string(),
            port: DEFAULT_OMS_PORT,
            hostname: DEFAULT_OMS_HOSTNAME.to_string(),
            database: DatabaseConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            access_log: true,
            event_queue_size: DEFAULT_EVENT_QUEUE_SIZE,
            event_processing_delay: Duration::from_millis(DEFAULT_EVENT_PROCESSING_DELAY_MS),
            idempotency_ttl: chrono::Duration::seconds(DEFAULT_IDEMPOTENCY_TTL_SECS),
            idempotency_purge_interval: Duration::from_secs(DEFAULT_IDEMPOTENCY_PURGE_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("OMS_HOST").ok().unwrap_or_else(|| DEFAULT_OMS_HOST.into());
        let port = number_from_env("OMS_PORT", DEFAULT_OMS_PORT);
        let hostname = env::var("OMS_HOSTNAME").ok().unwrap_or_else(|| DEFAULT_OMS_HOSTNAME.into());
        let database = DatabaseConfig::from_env_or_default();
        let log_level = env::var("OMS_LOG_LEVEL").ok().unwrap_or_else(|| DEFAULT_LOG_LEVEL.into());
        let access_log = parse_boolean_flag(env::var("OMS_ACCESS_LOG").ok(), true);
        let event_queue_size = event_queue_size(number_from_env("OMS_EVENT_QUEUE_SIZE", DEFAULT_EVENT_QUEUE_SIZE));
        let event_processing_delay =
            Duration::from_millis(number_from_env("OMS_EVENT_PROCESSING_DELAY_MS", DEFAULT_EVENT_PROCESSING_DELAY_MS));
        let idempotency_ttl =
            idempotency_ttl(number_from_env("OMS_IDEMPOTENCY_TTL_SECS", DEFAULT_IDEMPOTENCY_TTL_SECS));
        let idempotency_purge_interval = idempotency_purge_interval(number_from_env(
            "OMS_IDEMPOTENCY_PURGE_INTERVAL_SECS",
            DEFAULT_IDEMPOTENCY_PURGE_INTERVAL_SECS,
        ));
        let request_timeout =
            request_timeout(number_from_env("OMS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS));
        let shutdown_grace =
            Duration::from_secs(number_from_env("OMS_SHUTDOWN_GRACE_SECS", DEFAULT_SHUTDOWN_GRACE_SECS));
        Self {
            host,
            port,
            hostname,
            database,
            log_level,
            access_log,
            event_queue_size,
            event_processing_delay,
            idempotency_ttl,
            idempotency_purge_interval,
            request_timeout,
            shutdown_grace,
        }
    }
}

//-----------------------------------------------  DatabaseConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// A full connection URL. When set, the individual connection parameters are ignored.
    pub url: Option<Secret<String>>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub name: String,
    pub sslmode: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: Secret::from(DEFAULT_DB_PASSWORD),
            name: DEFAULT_DB_NAME.to_string(),
            sslmode: DEFAULT_DB_SSLMODE.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env_or_default() -> Self {
        let url = env::var("OMS_DATABASE_URL").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        if url.is_none() {
            info!("🪛️ OMS_DATABASE_URL is not set. The URL will be built from the OMS_DB_* settings.");
        }
        let password = env::var("OMS_DB_PASSWORD").ok().map(Secret::new).unwrap_or_else(|| {
            warn!("🪛️ OMS_DB_PASSWORD is not set. Using the default password.");
            Secret::from(DEFAULT_DB_PASSWORD)
        });
        Self {
            url,
            host: env::var("OMS_DB_HOST").ok().unwrap_or_else(|| DEFAULT_DB_HOST.into()),
            port: number_from_env("OMS_DB_PORT", DEFAULT_DB_PORT),
            user: env::var("OMS_DB_USER").ok().unwrap_or_else(|| DEFAULT_DB_USER.into()),
            password,
            name: env::var("OMS_DB_NAME").ok().unwrap_or_else(|| DEFAULT_DB_NAME.into()),
            sslmode: env::var("OMS_DB_SSLMODE").ok().unwrap_or_else(|| DEFAULT_DB_SSLMODE.into()),
            max_connections: number_from_env("OMS_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
        }
    }

    /// The connection URL for the compiled-in backend. It may contain the password, so don't log it.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.reveal().clone();
        }
        self.url_from_parts()
    }

    #[cfg(feature = "postgres")]
    fn url_from_parts(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user,
            self.password.reveal(),
            self.host,
            self.port,
            self.name,
            self.sslmode
        )
    }

    #[cfg(not(feature = "postgres"))]
    fn url_from_parts(&self) -> String {
        order_engine::SQLITE_DB_URL.to_string()
    }
}

/// Reads a numeric variable. A value that doesn't parse is reported and replaced with `default`.
fn number_from_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    parse_number(env::var(name).ok(), default).unwrap_or_else(|e| {
        warn!("🪛️ Invalid configuration value for {name}. {e} Using the default, {default}, instead.");
        default
    })
}

fn event_queue_size(size: usize) -> usize {
    match size {
        0 => {
            warn!("🪛️ OMS_EVENT_QUEUE_SIZE is 0. The queue will hold a single event.");
            1
        },
        n if n > MAX_EVENT_QUEUE_SIZE => {
            warn!("🪛️ OMS_EVENT_QUEUE_SIZE of {n} is too large. Using {MAX_EVENT_QUEUE_SIZE} instead.");
            MAX_EVENT_QUEUE_SIZE
        },
        n => n,
    }
}

fn idempotency_ttl(secs: i64) -> chrono::Duration {
    let secs = match secs {
        s if s <= 0 => {
            warn!(
                "🪛️ OMS_IDEMPOTENCY_TTL_SECS must be positive, but is {s}. Using the default, \
                 {DEFAULT_IDEMPOTENCY_TTL_SECS}s, instead."
            );
            DEFAULT_IDEMPOTENCY_TTL_SECS
        },
        s if s > MAX_IDEMPOTENCY_TTL_SECS => {
            warn!("🪛️ OMS_IDEMPOTENCY_TTL_SECS of {s} is too large. Using {MAX_IDEMPOTENCY_TTL_SECS}s instead.");
            MAX_IDEMPOTENCY_TTL_SECS
        },
        s => s,
    };
    chrono::Duration::seconds(secs)
}

fn idempotency_purge_interval(secs: u64) -> Duration {
    if secs == 0 {
        warn!(
            "🪛️ OMS_IDEMPOTENCY_PURGE_INTERVAL_SECS cannot be 0. Using the default, \
             {DEFAULT_IDEMPOTENCY_PURGE_INTERVAL_SECS}s, instead."
        );
        return Duration::from_secs(DEFAULT_IDEMPOTENCY_PURGE_INTERVAL_SECS);
    }
    Duration::from_secs(secs)
}

fn request_timeout(secs: u64) -> Duration {
    let secs = match secs {
        0 => {
            warn!(
                "🪛️ OMS_REQUEST_TIMEOUT_SECS cannot be 0. Using the default, {DEFAULT_REQUEST_TIMEOUT_SECS}s, instead."
            );
            DEFAULT_REQUEST_TIMEOUT_SECS
        },
        s if s > MAX_REQUEST_TIMEOUT_SECS => {
            warn!("🪛️ OMS_REQUEST_TIMEOUT_SECS of {s} is too large. Using {MAX_REQUEST_TIMEOUT_SECS}s instead.");
            MAX_REQUEST_TIMEOUT_SECS
        },
        s => s,
    };
    Duration::from_secs(secs)
}
