use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_SESSION_PATH: &str = "meow-session.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DEBOUNCE_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub gateway_url: String,
    pub session_path: PathBuf,
    pub request_timeout: Duration,
    /// Offset from UTC used to decide which calendar day a mood falls on.
    pub utc_offset_minutes: i32,
    pub refresh_debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_api(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Defaults pointed at `api_url`, with the gateway derived from it.
    pub fn for_api(api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            gateway_url: gateway_url_for(&api_url),
            api_url,
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            utc_offset_minutes: 0,
            refresh_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }

    /// Read `MEOW_*` variables, after loading a `.env` file if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = get("MEOW_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::for_api(&api_url);

        if let Some(url) = get("MEOW_GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Some(path) = get("MEOW_SESSION_PATH") {
            config.session_path = PathBuf::from(path);
        }
        if let Some(secs) = parsed::<u64>(&get, "MEOW_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(minutes) = parsed::<i32>(&get, "MEOW_UTC_OFFSET_MINUTES") {
            config.utc_offset_minutes = minutes;
        }
        if let Some(ms) = parsed::<u64>(&get, "MEOW_REFRESH_DEBOUNCE_MS") {
            config.refresh_debounce = Duration::from_millis(ms);
        }
        config
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

/// `http://host:port` -> `ws://host:port/gateway`.
pub fn gateway_url_for(api_url: &str) -> String {
    let base = api_url
        .trim_end_matches('/')
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    format!("{base}/gateway")
}
