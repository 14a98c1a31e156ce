//! Server configuration.
//!
//! Every setting has a default suitable for local development.
//! [`ServerConfig::from_env`] overlays environment variables on top of
//! those defaults for deployments.

use std::time::Duration;

use stockpulse_protocol::RoomName;
use stockpulse_room::RoomConfig;
use stockpulse_session::SessionConfig;

/// Room every inventory change is broadcast to unless configured otherwise.
pub const DEFAULT_INVENTORY_ROOM: &str = "inventory-updates";

/// Name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "stockpulse.sid";

/// Deployment posture. Controls whether internal error detail is shown to
/// users and whether the session cookie is marked `Secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parses `APP_ENV`-style values. Anything other than `production`/`prod`
    /// is development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Returns `true` in production posture.
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Settings for the real-time channel.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// How long a new socket may take to send its handshake.
    pub handshake_timeout: Duration,

    /// Close connections that send nothing for this long. `None` disables
    /// the check; disconnects are then detected by the transport alone.
    pub idle_timeout: Option<Duration>,

    /// Reject handshakes that carry no session token.
    ///
    /// A token that is present is always checked, whatever this says.
    pub require_session: bool,

    /// Longest a single socket write may block. A client that stops reading
    /// is disconnected once a write to it exceeds this.
    pub write_timeout: Duration,

    /// How long shutdown waits for open connections to say goodbye and
    /// clean up before their tasks are aborted.
    pub shutdown_grace: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: None,
            require_session: false,
            write_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address for the HTTP listener (pages, login, JSON API).
    pub http_addr: String,

    /// Address for the WebSocket listener.
    pub realtime_addr: String,

    pub environment: Environment,

    /// Room that inventory changes are broadcast to.
    pub inventory_room: RoomName,

    pub cookie_name: String,

    pub session: SessionConfig,
    pub rooms: RoomConfig,
    pub realtime: RealtimeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:3000".to_string(),
            realtime_addr: "127.0.0.1:3001".to_string(),
            environment: Environment::default(),
            inventory_room: RoomName::new(DEFAULT_INVENTORY_ROOM),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            session: SessionConfig::default(),
            rooms: RoomConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a config from the process environment.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `HOST` | bind host for both listeners (default `127.0.0.1`) |
    /// | `PORT` | HTTP port (default 3000) |
    /// | `REALTIME_PORT` | WebSocket port (default `PORT + 1`) |
    /// | `APP_ENV` | `production` or `development` |
    /// | `SESSION_MAX_AGE_SECS` | session lifetime |
    /// | `INVENTORY_ROOM` | broadcast room for inventory changes |
    /// | `REALTIME_IDLE_TIMEOUT_SECS` | idle timeout, 0 disables |
    ///
    /// Unparseable numbers fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 3000);
        let realtime_port: u16 =
            parse_or(&lookup, "REALTIME_PORT", port.saturating_add(1));
        config.http_addr = format!("{host}:{port}");
        config.realtime_addr = format!("{host}:{realtime_port}");

        if let Some(env) = lookup("APP_ENV") {
            config.environment = Environment::parse(&env);
        }
        if let Some(room) = lookup("INVENTORY_ROOM").filter(|r| !r.trim().is_empty()) {
            config.inventory_room = RoomName::new(room.trim());
        }
        config.session.max_age_secs = parse_or(
            &lookup,
            "SESSION_MAX_AGE_SECS",
            config.session.max_age_secs,
        );

        let idle: u64 = parse_or(&lookup, "REALTIME_IDLE_TIMEOUT_SECS", 0);
        config.realtime.idle_timeout =
            (idle > 0).then(|| Duration::from_secs(idle));

        config
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.http_addr, "127.0.0.1:3000");
        assert_eq!(config.realtime_addr, "127.0.0.1:3001");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.inventory_room.as_str(), DEFAULT_INVENTORY_ROOM);
        assert_eq!(config.realtime.idle_timeout, None);
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("REALTIME_PORT", "9090"),
            ("APP_ENV", "production"),
            ("SESSION_MAX_AGE_SECS", "600"),
            ("INVENTORY_ROOM", "warehouse-7"),
            ("REALTIME_IDLE_TIMEOUT_SECS", "30"),
        ]));

        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.realtime_addr, "0.0.0.0:9090");
        assert!(config.environment.is_production());
        assert_eq!(config.session.max_age_secs, 600);
        assert_eq!(config.inventory_room.as_str(), "warehouse-7");
        assert_eq!(config.realtime.idle_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_lookup_realtime_port_follows_http_port() {
        let config = ServerConfig::from_lookup(lookup_from(&[("PORT", "4000")]));
        assert_eq!(config.realtime_addr, "127.0.0.1:4001");
    }

    #[test]
    fn test_from_lookup_bad_number_falls_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "eighty"),
            ("SESSION_MAX_AGE_SECS", "-5"),
        ]));
        assert_eq!(config.http_addr, "127.0.0.1:3000");
        assert_eq!(config.session.max_age_secs, 86_400);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("Production"), Environment::Production);
        assert_eq!(Environment::parse("prod"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }
}
