use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Upper bound on pooled SQLite connections
    pub const DB_POOL_MAX_SIZE: &str = "DB_POOL_MAX_SIZE";
    /// Idle connections the pool tries to keep open
    pub const DB_POOL_MIN_IDLE: &str = "DB_POOL_MIN_IDLE";
    /// Seconds before a pooled connection is closed and replaced
    pub const DB_POOL_MAX_LIFETIME_SECS: &str = "DB_POOL_MAX_LIFETIME_SECS";
    pub const DB_BUSY_TIMEOUT_MS: &str = "DB_BUSY_TIMEOUT_MS";
    /// Set to "true" or "1" to verify (and repair) the search index at boot
    pub const DB_VERIFY_INDEX: &str = "DB_VERIFY_INDEX";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const DATABASE_URL: &str = "./.db/notekeep.db";
    pub const DB_POOL_MAX_SIZE: u32 = 25;
    pub const DB_POOL_MIN_IDLE: u32 = 5;
    pub const DB_POOL_MAX_LIFETIME_SECS: u64 = 300;
    pub const DB_POOL_CONNECTION_TIMEOUT_SECS: u64 = 5;
    pub const DB_BUSY_TIMEOUT_MS: u64 = 5000;
}

/// Connection pool settings for the note database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// Connections older than this are retired
    pub max_lifetime: Duration,
    /// Idle connections above `min_idle` are closed after this long
    pub idle_timeout: Duration,
    /// How long a caller waits for a free connection before failing
    pub connection_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: defaults::DB_POOL_MAX_SIZE,
            min_idle: defaults::DB_POOL_MIN_IDLE,
            max_lifetime: Duration::from_secs(defaults::DB_POOL_MAX_LIFETIME_SECS),
            idle_timeout: Duration::from_secs(defaults::DB_POOL_MAX_LIFETIME_SECS),
            connection_timeout: Duration::from_secs(defaults::DB_POOL_CONNECTION_TIMEOUT_SECS),
            busy_timeout: Duration::from_millis(defaults::DB_BUSY_TIMEOUT_MS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub pool: PoolConfig,
    pub verify_index_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::PORT,
            database_url: defaults::DATABASE_URL.to_string(),
            pool: PoolConfig::default(),
            verify_index_on_startup: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_size = parse_or_default(&lookup, env_vars::DB_POOL_MAX_SIZE, defaults::DB_POOL_MAX_SIZE).max(1);
        let min_idle = parse_or_default(&lookup, env_vars::DB_POOL_MIN_IDLE, defaults::DB_POOL_MIN_IDLE).min(max_size);
        let lifetime_secs = parse_or_default(
            &lookup,
            env_vars::DB_POOL_MAX_LIFETIME_SECS,
            defaults::DB_POOL_MAX_LIFETIME_SECS,
        );
        let busy_timeout_ms = parse_or_default(&lookup, env_vars::DB_BUSY_TIMEOUT_MS, defaults::DB_BUSY_TIMEOUT_MS);

        Self {
            port: parse_or_default(&lookup, env_vars::PORT, defaults::PORT),
            database_url: lookup(env_vars::DATABASE_URL)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| defaults::DATABASE_URL.to_string()),
            pool: PoolConfig {
                max_size,
                min_idle,
                max_lifetime: Duration::from_secs(lifetime_secs),
                idle_timeout: Duration::from_secs(lifetime_secs),
                connection_timeout: Duration::from_secs(defaults::DB_POOL_CONNECTION_TIMEOUT_SECS),
                busy_timeout: Duration::from_millis(busy_timeout_ms),
            },
            verify_index_on_startup: lookup(env_vars::DB_VERIFY_INDEX)
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1"))
                .unwrap_or(false),
        }
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}, using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

/// Create the directory holding the database file if it does not exist yet.
pub fn ensure_database_dir(database_url: &str) -> std::io::Result<()> {
    if database_url == ":memory:" {
        return Ok(());
    }
    match Path::new(database_url).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
