//! Service configuration loading
//!
//! Loads configuration from `~/.config/scoreazy/service.toml` (or the path in
//! `SCOREAZY_CONFIG`). Every field has a default, so a missing file is not an
//! error. Secrets and deployment-specific values can be overridden from the
//! environment after the file is parsed.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration for the contact service
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub intake: IntakeConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Attribute requests to the first `X-Forwarded-For` entry instead of
    /// the peer address. Only enable behind a trusted proxy.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            trust_forwarded_for: false,
        }
    }
}

/// SQLite store settings
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// SQLite `busy_timeout` and r2d2 checkout timeout.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Upper bound on a single store operation, including pool checkout.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,

    /// Enforce one submission per email per UTC day with a unique index.
    #[serde(default)]
    pub strict_dedup: bool,
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|d| {
            d.join("scoreazy")
                .join("contacts.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "contacts.db".to_string())
}

fn default_pool_size() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_op_timeout_ms() -> u64 {
    10_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            op_timeout_ms: default_op_timeout_ms(),
            strict_dedup: false,
        }
    }
}

/// Static admin credential pair
#[derive(Deserialize, Clone, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl AdminConfig {
    /// Both halves of the credential pair are present and non-empty.
    pub fn is_configured(&self) -> bool {
        matches!(
            (&self.username, &self.password),
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty()
        )
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Per-origin submission budget
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How often the background sweeper drops idle origins.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_attempts() -> usize {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Intake pipeline settings
#[derive(Debug, Deserialize, Clone)]
pub struct IntakeConfig {
    #[serde(default = "default_duplicate_window_hours")]
    pub duplicate_window_hours: u32,

    /// Recorded as `source` when the request carries no referer.
    #[serde(default = "default_source")]
    pub default_source: String,
}

fn default_duplicate_window_hours() -> u32 {
    24
}

fn default_source() -> String {
    "website".to_string()
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            duplicate_window_hours: default_duplicate_window_hours(),
            default_source: default_source(),
        }
    }
}

/// Notification delivery settings
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Mail-relay endpoint. When unset, messages are only logged.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub webhook_token: Option<String>,

    /// Where admin alerts are addressed.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    #[serde(default = "default_sender")]
    pub sender: String,

    /// Linked from admin alerts.
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,

    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_admin_email() -> String {
    "admin@scoreazy.com".to_string()
}

fn default_sender() -> String {
    "Scoreazy <no-reply@scoreazy.com>".to_string()
}

fn default_dashboard_url() -> String {
    "http://localhost:5000/admin".to_string()
}

fn default_notify_timeout_ms() -> u64 {
    10_000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_token: None,
            admin_email: default_admin_email(),
            sender: default_sender(),
            dashboard_url: default_dashboard_url(),
            timeout_ms: default_notify_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

/// Backoff policy for notification delivery
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_retry_attempts() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ServiceConfig {
    /// Environment variable for custom config path
    pub const ENV_CONFIG_PATH: &'static str = "SCOREAZY_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "service.toml";

    /// Load configuration from the resolved path, then apply environment
    /// overrides.
    ///
    /// Resolution order:
    /// 1. `explicit` (the `--config` flag)
    /// 2. `SCOREAZY_CONFIG` environment variable
    /// 3. `~/.config/scoreazy/service.toml`
    ///
    /// A missing file at the default location yields defaults; a missing
    /// file that was named explicitly is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = Self::resolve_config_path();
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    tracing::info!(
                        path = %path.display(),
                        "Service config not found, using defaults"
                    );
                    Self::default()
                }
            }
        };

        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: ServiceConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("scoreazy")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    /// Apply environment overrides using `lookup` for variable access.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(user) = lookup("ADMIN_USERNAME") {
            self.admin.username = Some(user);
        }
        if let Some(pass) = lookup("ADMIN_PASSWORD") {
            self.admin.password = Some(pass);
        }
        if let Some(bind) = lookup("SCOREAZY_BIND") {
            self.server.bind = bind;
        }
        if let Some(path) = lookup("SCOREAZY_DB_PATH") {
            self.database.path = path;
        }
        if let Some(url) = lookup("SCOREAZY_NOTIFY_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(url);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_secs must be at least 1".to_string(),
            ));
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if self.notifications.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "notifications.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.intake.duplicate_window_hours == 0 {
            return Err(ConfigError::Invalid(
                "intake.duplicate_window_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
