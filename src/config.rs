use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub database_pool_size: u32,
    /// How long a connection waits on a locked database before failing.
    pub database_busy_timeout_ms: u64,
    pub dev_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_path: "license_hub.db".to_string(),
            database_pool_size: 10,
            database_busy_timeout_ms: 5000,
            dev_mode: false,
        }
    }
}

/// Parse an env var, falling back to `default` when unset or unparsable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let dev_mode = env::var("LICENSE_HUB_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            database_pool_size: env_or("DATABASE_POOL_SIZE", defaults.database_pool_size).max(1),
            database_busy_timeout_ms: env_or(
                "DATABASE_BUSY_TIMEOUT_MS",
                defaults.database_busy_timeout_ms,
            ),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
