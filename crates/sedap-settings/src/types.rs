//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! JSON file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SedapSettings {
    /// HTTP / WebSocket listener.
    pub server: ServerSettings,
    /// Debug adapter connection.
    pub adapter: AdapterSettings,
    /// Per-bridge behavior.
    pub bridge: BridgeSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl SedapSettings {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.adapter.address.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "adapter.address must not be empty".into(),
            ));
        }
        if self.server.ui_channel_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.uiChannelCapacity must be at least 1".into(),
            ));
        }
        if self.server.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxMessageSize must be at least 1".into(),
            ));
        }
        if self.adapter.request_timeout_ms == Some(0) {
            return Err(SettingsError::InvalidValue(
                "adapter.requestTimeoutMs must be at least 1, or absent to wait forever".into(),
            ));
        }
        Ok(())
    }
}

/// Listener settings for the panel-facing server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per panel connection.
    pub ui_channel_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 4711,
            max_message_size: 16 * 1024 * 1024,
            ui_channel_capacity: 256,
        }
    }
}

/// How the adapter is asked to start debugging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartRequest {
    /// Send a `launch` request.
    #[default]
    Launch,
    /// Send an `attach` request.
    Attach,
}

impl StartRequest {
    /// DAP command name.
    pub fn command(self) -> &'static str {
        match self {
            Self::Launch => "launch",
            Self::Attach => "attach",
        }
    }
}

/// Debug adapter connection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterSettings {
    /// `host:port` of a debug adapter listening on TCP.
    pub address: String,
    /// Value of `adapterID` in the `initialize` request.
    pub adapter_id: String,
    /// `launch` or `attach`.
    pub request: StartRequest,
    /// Arguments of the `launch` / `attach` request, passed through verbatim.
    pub arguments: Value,
    /// Per-request timeout enforced by the session port; `None` waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:4712".into(),
            adapter_id: "sedap".into(),
            request: StartRequest::Launch,
            arguments: Value::Object(serde_json::Map::new()),
            request_timeout_ms: None,
        }
    }
}

/// Per-bridge settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Print debuggee `log` events.
    pub log_enabled: bool,
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
