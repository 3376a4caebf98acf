use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use tokio::net::lookup_host;

use crate::connection::ConnectionOptions;
use crate::server::ServerError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_KEEP_ALIVE_TIMEOUT_SECS: u64 = 75;
const DEFAULT_SHUTDOWN_GRACE_PERIOD_SECS: u64 = 10;
const DEFAULT_MAX_BODY_SIZE: u64 = 8 * 1024 * 1024;
const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Bind address and connection policy of a [`Server`](crate::server::Server).
///
/// Every field has a default, so a host application can deserialize a
/// partial document:
///
/// ```
/// use micro_rack::server::ServerConfig;
///
/// let config: ServerConfig = serde_json::from_str(r#"{ "port": 9292, "keep_alive": false }"#).unwrap();
/// assert_eq!(config.port(), 9292);
/// assert_eq!(config.host(), "127.0.0.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    host: String,
    port: u16,
    keep_alive: bool,
    /// `0` keeps idle connections open forever.
    keep_alive_timeout_secs: u64,
    shutdown_grace_period_secs: u64,
    max_body_size: u64,
    read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            keep_alive: true,
            keep_alive_timeout_secs: DEFAULT_KEEP_ALIVE_TIMEOUT_SECS,
            shutdown_grace_period_secs: DEFAULT_SHUTDOWN_GRACE_PERIOD_SECS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub fn with_keep_alive_timeout_secs(mut self, secs: u64) -> Self {
        self.keep_alive_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_shutdown_grace_period_secs(mut self, secs: u64) -> Self {
        self.shutdown_grace_period_secs = secs;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    #[must_use]
    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn keep_alive_timeout(&self) -> Option<Duration> {
        (self.keep_alive_timeout_secs > 0).then(|| Duration::from_secs(self.keep_alive_timeout_secs))
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_period_secs)
    }

    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions::default()
            .with_keep_alive(self.keep_alive)
            .with_keep_alive_timeout(self.keep_alive_timeout())
            .with_max_body_size(self.max_body_size)
            .with_read_buffer_size(self.read_buffer_size)
    }

    /// Resolves `host:port` to the address to bind.
    pub(crate) async fn resolve(&self) -> Result<SocketAddr, ServerError> {
        if self.port == 0 {
            return Err(ServerError::invalid_address("port must be in 1..=65535"));
        }

        let mut addrs = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| ServerError::invalid_address(format!("can't resolve host {:?}: {e}", self.host)))?;

        addrs.next().ok_or_else(|| ServerError::invalid_address(format!("host {:?} resolved to no address", self.host)))
    }
}
