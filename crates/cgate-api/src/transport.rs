// Connection settings for the gateway command interface.
//
// Plain data: the client task reads these, nothing here holds a socket
// beyond the single `connect` helper.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::Error;

/// Default C-Gate command-interface port.
pub const DEFAULT_PORT: u16 = 20023;

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl ReconnectConfig {
    /// `delay = min(initial * 2^attempt, max)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Everything the client needs to reach a gateway.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Limit on a single TCP connect attempt.
    pub connect_timeout: Duration,
    /// Limit on waiting for a command's response. `None` waits forever.
    pub response_timeout: Option<Duration>,
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            response_timeout: Some(Duration::from_secs(30)),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// `host:port`, for logging and connecting.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open one TCP connection, bounded by `connect_timeout`.
    pub(crate) async fn connect(&self) -> Result<TcpStream, Error> {
        let endpoint = self.endpoint();
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&endpoint))
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "connect to {endpoint} timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Connection(format!("connect to {endpoint} failed: {e}")))?;

        // Commands are single short lines; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not set TCP_NODELAY");
        }
        Ok(stream)
    }
}
