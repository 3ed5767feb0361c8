//! Server configuration.

use sedap_settings::SedapSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the panel host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind; `0` picks a free port.
    pub port: u16,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per panel before messages are dropped.
    pub ui_channel_capacity: usize,
    /// Whether bridges print debuggee `log` events.
    pub log_enabled: bool,
}

impl ServerConfig {
    /// Take the host-facing parts of loaded settings.
    pub fn from_settings(settings: &SedapSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_message_size: settings.server.max_message_size,
            ui_channel_capacity: settings.server.ui_channel_capacity,
            log_enabled: settings.bridge.log_enabled,
        }
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 16 * 1024 * 1024,
            ui_channel_capacity: 256,
            log_enabled: false,
        }
    }
}
