use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub refresh: RefreshSettings,
    pub source: SourceSettings,
    pub log: LogSettings,
}

/// Address the WebSocket listener binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Refresh cadence per topic phase, in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    pub live_secs: u64,
    pub imminent_secs: u64,
    pub idle_secs: u64,
}

/// Upstream connection parameters for the bundled snapshot source.
///
/// `lookahead_secs` is the window before an event's start in which the topic
/// counts as imminent.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub lookahead_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

impl SourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn lookahead(&self) -> Duration {
        Duration::from_secs(self.lookahead_secs)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; `load_config` fills the gaps from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub refresh: Option<PartialRefreshSettings>,
    pub source: Option<PartialSourceSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRefreshSettings {
    pub live_secs: Option<u64>,
    pub imminent_secs: Option<u64>,
    pub idle_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialSourceSettings {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub lookahead_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            refresh: RefreshSettings {
                live_secs: 5,
                imminent_secs: 60,
                idle_secs: 300,
            },
            source: SourceSettings {
                base_url: "https://api-web.nhle.com".to_string(),
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                    .to_string(),
                timeout_secs: 10,
                lookahead_secs: 6 * 60 * 60,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
