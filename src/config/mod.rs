mod settings;

use config::{Config, ConfigError, Environment, File};

use crate::config::settings::PartialSettings;

pub use settings::{LogSettings, RefreshSettings, ServerSettings, Settings, SourceSettings};

/// Prefix for environment overrides, e.g. `LIVECAST__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "LIVECAST";

/// Loads `config/default.*` (if present) and `LIVECAST__*` environment
/// variables, then fills anything missing from `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let server = partial.server;
    let refresh = partial.refresh;
    let source = partial.source;
    let log = partial.log;

    Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        refresh: RefreshSettings {
            live_secs: refresh
                .as_ref()
                .and_then(|r| r.live_secs)
                .unwrap_or(default.refresh.live_secs),
            imminent_secs: refresh
                .as_ref()
                .and_then(|r| r.imminent_secs)
                .unwrap_or(default.refresh.imminent_secs),
            idle_secs: refresh
                .as_ref()
                .and_then(|r| r.idle_secs)
                .unwrap_or(default.refresh.idle_secs),
        },
        source: SourceSettings {
            base_url: source
                .as_ref()
                .and_then(|s| s.base_url.clone())
                .unwrap_or(default.source.base_url),
            user_agent: source
                .as_ref()
                .and_then(|s| s.user_agent.clone())
                .unwrap_or(default.source.user_agent),
            timeout_secs: source
                .as_ref()
                .and_then(|s| s.timeout_secs)
                .unwrap_or(default.source.timeout_secs),
            lookahead_secs: source
                .as_ref()
                .and_then(|s| s.lookahead_secs)
                .unwrap_or(default.source.lookahead_secs),
        },
        log: LogSettings {
            level: log
                .and_then(|l| l.level)
                .unwrap_or(default.log.level),
        },
    }
}
