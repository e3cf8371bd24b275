use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{ensure, Context, Result};
use log::{info, warn};
use sqlx::postgres::PgConnectOptions;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct Settings {
    pub db_host: String,
    pub db_port: String,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub upstream_url: String,
    pub sync_interval: Duration,
    pub sync_timeout: Duration,
    pub sync_exclusive: bool,
    pub enrichment_seed: Option<String>,
    pub bind_addr: String,
    pub migrations: PathBuf,
}

impl Settings {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup. Empty values count as unset.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Self {
            db_host: or("DB_HOST", "localhost"),
            db_port: or("DB_PORT", "5432"),
            db_user: or("DB_USER", "postgres"),
            db_password: or("DB_PASSWORD", "postgres"),
            db_name: or("DB_NAME", "alerts_db"),

            upstream_url: or("MOCK_API_URL", "http://localhost:8081")
                .trim_end_matches('/')
                .to_string(),

            sync_interval: parse_interval(var("SYNC_INTERVAL").as_deref(), DEFAULT_SYNC_INTERVAL),
            sync_timeout: parse_interval(var("SYNC_TIMEOUT").as_deref(), DEFAULT_SYNC_TIMEOUT),

            sync_exclusive: var("SYNC_EXCLUSIVE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),

            enrichment_seed: var("ENRICHMENT_SEED"),
            bind_addr: or("BIND_ADDR", "0.0.0.0:8080"),
            migrations: or("MIGRATIONS_PATH", "./migrations").into(),
        }
    }

    pub fn validate(self) -> Result<Self> {
        info!("--- Checking env variables ---");
        info!("🗄 Database: {}@{}:{}/{}", self.db_user, self.db_host, self.db_port, self.db_name);
        info!("🔗 Upstream URL: {}", self.upstream_url);
        info!("⏱ Sync interval: {:?}, pass timeout: {:?}", self.sync_interval, self.sync_timeout);
        info!("🔒 Exclusive passes: {}", self.sync_exclusive);
        info!("🌐 Listen: {}", self.bind_addr);

        self.port().context("Invalid DB_PORT")?;
        self.seed().context("Invalid ENRICHMENT_SEED")?;

        ensure!(
            self.upstream_url.starts_with("http://") || self.upstream_url.starts_with("https://"),
            "Critical Error: MOCK_API_URL must be an http(s) URL, got {:?}",
            self.upstream_url
        );

        if !self.migrations.exists() {
            warn!("⚠️ Folder migration not found {:?}", self.migrations);
        }

        Ok(self)
    }

    pub fn port(&self) -> Result<u16> {
        self.db_port
            .trim()
            .parse::<u16>()
            .with_context(|| format!("{:?} is not a port number", self.db_port))
    }

    pub fn seed(&self) -> Result<Option<u64>> {
        self.enrichment_seed
            .as_deref()
            .map(|s| s.trim().parse::<u64>().with_context(|| format!("{:?} is not a u64", s)))
            .transpose()
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        Ok(PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.port()?)
            .username(&self.db_user)
            .password(&self.db_password)
            .database(&self.db_name))
    }
}

/// Parses `60s`, `5m`, `1h30m` style durations. Anything unparsable or zero
/// falls back to `default` without complaint.
pub fn parse_interval(raw: Option<&str>, default: Duration) -> Duration {
    raw.and_then(|v| humantime::parse_duration(v.trim()).ok())
        .filter(|d| !d.is_zero())
        .unwrap_or(default)
}
