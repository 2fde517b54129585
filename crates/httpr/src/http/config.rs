//! Service configuration.

use std::time::Duration;

/// Default per-request timeout applied by the built-in transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration shared by every request minted from one service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Total request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
    /// Log a one-line summary of each completed execution at debug level.
    pub debug: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: None,
            user_agent: Some(format!("httpr/{}", env!("CARGO_PKG_VERSION"))),
            debug: false,
        }
    }
}

impl ServiceConfig {
    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Enable or disable execution summaries.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
