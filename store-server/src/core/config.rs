use std::path::PathBuf;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | ./data | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP service port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | PAYMENT_EXPIRY_MINUTES | 30 | Window for non-COD payment completion |
/// | PAYMENT_SWEEP_INTERVAL_SECS | 60 | Expiry sweep cadence |
/// | REFUND_DISCOUNT_USAGE_ON_CANCEL | false | Decrement discount usage when an order is cancelled/expired |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database and log files
    pub work_dir: String,
    /// HTTP API service port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Minutes a STRIPE/MOMO order may stay unpaid before the sweep expires it
    pub payment_expiry_minutes: i64,
    /// Seconds between payment expiry sweep runs
    pub payment_sweep_interval_secs: u64,
    /// When true, cancellation/expiry also gives back discount usage.
    /// Default false: first redemption sticks.
    pub refund_discount_usage_on_cancel: bool,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            payment_expiry_minutes: std::env::var("PAYMENT_EXPIRY_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
            payment_sweep_interval_secs: std::env::var("PAYMENT_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            refund_discount_usage_on_cancel: std::env::var("REFUND_DISCOUNT_USAGE_ON_CANCEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Override the work dir and port (test scenarios)
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Database file path inside the work dir
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("store.db")
    }

    /// Make sure the work directory exists before opening the database
    pub fn ensure_work_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
