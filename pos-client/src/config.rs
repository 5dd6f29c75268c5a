//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::polling::PollSettings;

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "https://oshxonacopy.pythonanywhere.com/api";

/// Poll settings per data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// POS table map
    pub tables: PollSettings,
    /// Kitchen order board
    pub kitchen_orders: PollSettings,
    /// Kitchen change notifications
    pub kitchen_notifications: PollSettings,
    /// Cashier ready orders and payment history
    pub cashier: PollSettings,
    /// Delivery and paid delivery orders
    pub delivery: PollSettings,
    /// POS order history, only while the history view is open
    pub history: PollSettings,
    /// Categories and products, loaded once
    pub catalog_stale: Duration,
    /// Single order details
    pub order_details_stale: Duration,
}

impl PollConfig {
    /// Defaults with a custom fast (5s class) and slow (10s class) interval
    pub fn with_intervals(fast: Duration, slow: Duration) -> Self {
        Self {
            tables: PollSettings::every(fast),
            kitchen_orders: PollSettings::every(fast).with_stale_time(Duration::from_secs(3)),
            kitchen_notifications: PollSettings::every(slow)
                .with_stale_time(Duration::from_secs(8))
                .with_refetch_on_focus(true),
            cashier: PollSettings::every(slow).with_refetch_on_focus(true),
            delivery: PollSettings::every(slow).with_refetch_on_focus(true),
            history: PollSettings::every(slow).with_refetch_on_focus(true),
            catalog_stale: Duration::from_secs(5 * 60),
            order_details_stale: Duration::from_secs(60),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::with_intervals(Duration::from_secs(5), Duration::from_secs(10))
    }
}

/// Client configuration for one terminal
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g., "https://host/api")
    pub base_url: String,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Where the kitchen column preferences are stored
    pub prefs_path: PathBuf,

    /// Log level (e.g., "info", "debug")
    pub log_level: String,

    /// JSON log output
    pub log_json: bool,

    /// Optional directory for rolling log files
    pub log_dir: Option<String>,

    /// Per data source polling
    pub polling: PollConfig,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            prefs_path: PathBuf::from("kitchen_prefs.json"),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            polling: PollConfig::default(),
        }
    }

    /// Load configuration from the environment
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let fast = std::env::var("POS_FAST_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);
        let slow = std::env::var("POS_SLOW_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10000);

        Self {
            base_url: std::env::var("POS_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            token: std::env::var("POS_API_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout: std::env::var("POS_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            prefs_path: std::env::var("POS_PREFS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("kitchen_prefs.json")),
            log_level: std::env::var("POS_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("POS_LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("POS_LOG_DIR").ok().filter(|d| !d.is_empty()),
            polling: PollConfig::with_intervals(
                Duration::from_millis(fast),
                Duration::from_millis(slow),
            ),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the preferences file
    pub fn with_prefs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prefs_path = path.into();
        self
    }

    /// Replace the polling configuration
    pub fn with_polling(mut self, polling: PollConfig) -> Self {
        self.polling = polling;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.token.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));

        let polling = config.polling;
        assert_eq!(polling.tables.interval, Duration::from_secs(5));
        assert_eq!(polling.kitchen_orders.stale_time, Duration::from_secs(3));
        assert!(polling.kitchen_notifications.refetch_on_focus);
        assert_eq!(polling.kitchen_notifications.interval, Duration::from_secs(10));
        assert!(!polling.tables.refetch_on_focus);
        assert_eq!(polling.order_details_stale, Duration::from_secs(60));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://127.0.0.1:9000/api")
            .with_token("abc")
            .with_timeout(5)
            .with_prefs_path("/tmp/prefs.json")
            .with_polling(PollConfig::with_intervals(
                Duration::from_millis(50),
                Duration::from_millis(100),
            ));
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, 5);
        assert_eq!(config.prefs_path, PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.polling.cashier.interval, Duration::from_millis(100));
    }
}
