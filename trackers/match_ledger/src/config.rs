use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            auth_token: None,
            user_agent: "MatchLedger/0.1".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    pub page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationConfig {
    pub toast_ttl_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { toast_ttl_ms: 3000 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerConfig {
    pub api: ApiConfig,
    pub ledger: LedgerConfig,
    pub notifications: NotificationConfig,
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("TRACKER_API_URL") {
            config.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(token) = env::var("TRACKER_API_TOKEN") {
            if !token.is_empty() {
                config.api.auth_token = Some(token);
            }
        }
        if let Ok(user_agent) = env::var("TRACKER_USER_AGENT") {
            config.api.user_agent = user_agent;
        }
        if let Some(timeout) = parse_var::<u64>("TRACKER_TIMEOUT_SECS") {
            config.api.request_timeout_secs = timeout;
        }
        if let Some(size) = parse_var::<u32>("TRACKER_PAGE_SIZE").filter(|s| *s > 0) {
            config.ledger.page_size = size;
        }
        if let Some(ttl) = parse_var::<u64>("TRACKER_TOAST_TTL_MS") {
            config.notifications.toast_ttl_ms = ttl;
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}
