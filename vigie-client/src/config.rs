//! Environment-driven configuration
//!
//! All knobs come from the environment (a `.env` file is honored at startup),
//! with logged fallbacks. The stream URL is the only knob without a default:
//! without it the ticker stays off, by contract.

use crate::models::SessionCredentials;
use tracing::warn;

pub const DEFAULT_MQTT_HOST: &str = "localhost";
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:8080";

/// Broker coordinates for the bidirectional session and the push gateway.
#[derive(Debug, Clone)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for MqttEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_MQTT_HOST.to_string(),
            port: DEFAULT_MQTT_PORT,
        }
    }
}

/// Commands the desktop surface runs to open/focus dashboard windows.
/// Templates may use `{url}` and `{id}` placeholders.
#[derive(Debug, Clone, Default)]
pub struct SurfaceConfig {
    pub open_command: Option<String>,
    pub focus_command: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub mqtt: MqttEndpoint,
    pub stream_url: Option<String>,
    pub dashboard_url: String,
    pub surface: SurfaceConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttEndpoint::default(),
            stream_url: None,
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            surface: SurfaceConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the environment, falling back to
    /// defaults on missing or invalid values.
    pub fn load() -> Self {
        let host = env_or("VIGIE_MQTT_HOST", DEFAULT_MQTT_HOST);
        let port = match std::env::var("VIGIE_MQTT_PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("VIGIE_MQTT_PORT invalid ({raw}), using {DEFAULT_MQTT_PORT}");
                DEFAULT_MQTT_PORT
            }),
            Err(_) => DEFAULT_MQTT_PORT,
        };

        let stream_url = std::env::var("VIGIE_STREAM_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        if stream_url.is_none() {
            warn!("VIGIE_STREAM_URL not set, announcement ticker will be unavailable");
        }

        Self {
            mqtt: MqttEndpoint { host, port },
            stream_url,
            dashboard_url: env_or("VIGIE_DASHBOARD_URL", DEFAULT_DASHBOARD_URL),
            surface: SurfaceConfig {
                open_command: non_empty_env("VIGIE_OPEN_COMMAND"),
                focus_command: non_empty_env("VIGIE_FOCUS_COMMAND"),
            },
        }
    }

    /// Credentials come from the authentication layer; in the standalone
    /// binary that layer is the environment. Empty values are kept as-is:
    /// the consumers enforce the non-empty precondition themselves.
    pub fn credentials_from_env() -> SessionCredentials {
        SessionCredentials {
            token: std::env::var("VIGIE_TOKEN").unwrap_or_default(),
            business_id: std::env::var("VIGIE_BUSINESS_ID").unwrap_or_default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert!(config.stream_url.is_none());
        assert_eq!(config.dashboard_url, "http://localhost:8080");
        assert!(config.surface.open_command.is_none());
    }
}
