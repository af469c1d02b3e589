use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// Listener settings. Durations serialize as whole milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,
    pub fetch_options: FetchOptions,
    pub dynamic_polling: bool,
    #[serde(rename = "max_interval_ms", with = "millis")]
    pub max_interval: Duration,
    pub max_stored_ids: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            fetch_options: FetchOptions::default(),
            dynamic_polling: false,
            max_interval: Duration::from_millis(5000),
            max_stored_ids: 100,
        }
    }
}

impl ListenerConfig {
    /// Clamps values the poll loop cannot honor: a zero interval becomes 1ms,
    /// `max_interval` is never below `interval` and at least one id is kept.
    pub fn validated(mut self) -> Self {
        self.interval = self.interval.max(Duration::from_millis(1));
        self.max_interval = self.max_interval.max(self.interval);
        self.max_stored_ids = self.max_stored_ids.max(1);
        self
    }
}

/// Pass-through settings for the page fetch layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub base_url: String,
    pub user_agent: String,
    /// Interface language requested from the site (`hl` query parameter).
    pub language: String,
    /// Extra request headers, sent in order after the defaults.
    pub headers: Vec<(String, String)>,
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: "en".to_string(),
            headers: Vec::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 8 * 1024 * 1024,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
