//! Connection parameters for a CentralControl gateway.

use std::time::Duration;

/// Connection parameters. The socket uses the timeouts as-is and performs no
/// further validation.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Gateway host name or address.
    pub host: String,
    /// Gateway port; stock firmware listens on 80.
    pub port: u16,
    /// How long a send waits for its response.
    pub request_timeout: Duration,
    /// How long the websocket handshake may take.
    pub connect_timeout: Duration,
    /// The session is torn down after this long without inbound traffic.
    pub idle_timeout: Duration,
}

impl SocketConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Websocket endpoint of the gateway's JSON-RPC service.
    pub(crate) fn endpoint(&self) -> String {
        format!("ws://{}:{}/jrpc", self.host, self.port)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 80,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(3600),
        }
    }
}
