// ── Runtime gateway configuration ──
//
// These types describe *how* to reach a gateway and which network to work
// with. They never touch disk: the CLI builds a `GatewayConfig` from a
// profile and hands it in.

use std::time::Duration;

use cgate_api::{ClientConfig, DEFAULT_PORT, NetworkAddress, ReconnectConfig};

use crate::error::CoreError;

/// Everything the [`Controller`](crate::Controller) needs.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// C-Gate project name (e.g. `HOME`).
    pub project: String,
    /// C-Bus network number within the project.
    pub network: u8,
    pub connect_timeout: Duration,
    pub response_timeout: Option<Duration>,
    pub reconnect: ReconnectConfig,
    /// Load the object snapshot on connect. One-shot write commands skip it.
    pub load_objects: bool,
    /// Re-fetch the object snapshot on this interval. `None` disables it.
    pub refresh_interval: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(host: impl Into<String>, project: impl Into<String>, network: u8) -> Self {
        let client = ClientConfig::default();
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            project: project.into(),
            network,
            connect_timeout: client.connect_timeout,
            response_timeout: client.response_timeout,
            reconnect: client.reconnect,
            load_objects: true,
            refresh_interval: None,
        }
    }

    /// `//PROJECT/NETWORK` for the configured network.
    pub fn network_address(&self) -> Result<NetworkAddress, CoreError> {
        NetworkAddress::network(&self.project, i64::from(self.network)).map_err(|e| {
            CoreError::Config {
                message: format!("invalid project/network: {e}"),
            }
        })
    }

    /// Client-layer settings derived from this configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: self.connect_timeout,
            response_timeout: self.response_timeout,
            reconnect: self.reconnect.clone(),
        }
    }
}
