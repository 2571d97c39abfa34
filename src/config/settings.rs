use serde::Deserialize;

/// Top-level configuration settings for the relay.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub stream: StreamSettings,
    pub storage: StorageSettings,
    pub log: LogSettings,
}

/// Bind address and token signing secret.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
}

/// Tuning for live comment streams.
///
/// `heartbeat_secs` is the idle window after which a session emits a ping,
/// `channel_capacity` bounds each subscriber's delivery channel, and
/// `max_comment_len` caps accepted comment bodies (in characters).
#[derive(Debug, Deserialize, Clone)]
pub struct StreamSettings {
    pub heartbeat_secs: u64,
    pub channel_capacity: usize,
    pub max_comment_len: usize,
}

/// Location of the embedded comment database.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; missing values are filled from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub stream: Option<PartialStreamSettings>,
    pub storage: Option<PartialStorageSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialStreamSettings {
    pub heartbeat_secs: Option<u64>,
    pub channel_capacity: Option<usize>,
    pub max_comment_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialStorageSettings {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                jwt_secret: "change-me".to_string(),
            },
            stream: StreamSettings {
                heartbeat_secs: 30,
                channel_capacity: 64,
                max_comment_len: 2000,
            },
            storage: StorageSettings {
                path: "comment_relay_db".to_string(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Overlay the values present in `partial` on top of the defaults.
    pub fn merged(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server.unwrap_or_default();
        let stream = partial.stream.unwrap_or_default();
        let storage = partial.storage.unwrap_or_default();
        let log = partial.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
                jwt_secret: server.jwt_secret.unwrap_or(default.server.jwt_secret),
            },
            stream: StreamSettings {
                heartbeat_secs: stream
                    .heartbeat_secs
                    .filter(|secs| *secs > 0)
                    .unwrap_or(default.stream.heartbeat_secs),
                channel_capacity: stream
                    .channel_capacity
                    .filter(|cap| *cap > 0)
                    .unwrap_or(default.stream.channel_capacity),
                max_comment_len: stream
                    .max_comment_len
                    .unwrap_or(default.stream.max_comment_len),
            },
            storage: StorageSettings {
                path: storage.path.unwrap_or(default.storage.path),
            },
            log: LogSettings {
                level: log.level.unwrap_or(default.log.level),
            },
        }
    }
}
