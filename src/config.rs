//! Server configuration.

use std::time::Duration;

/// Default bounded wait for a single `accept` call.
///
/// This is also the worst-case latency between `shutdown()` and the accept
/// loop noticing it.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration errors detected before any socket is opened.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Port is not in `1..=65535`.
    #[error("port number should be a positive integer no greater than 65535, got {0}")]
    InvalidPort(i64),
    /// An accept timeout of zero would turn the accept loop into a busy spin.
    #[error("accept timeout must be greater than zero")]
    ZeroAcceptTimeout,
}

/// Settings for an [`Acceptor`](crate::server::Acceptor).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (all local interfaces).
    ///
    /// Kept as a signed integer so that out-of-range input is reported as
    /// [`ConfigError::InvalidPort`] rather than rejected by a parser.
    pub port: i64,
    /// Bounded wait for each accept attempt.
    pub accept_timeout: Duration,
    /// Script identifiers run at the start of every session, in order.
    pub startup_scripts: Vec<String>,
}

impl ServerConfig {
    pub fn new(port: i64) -> Self {
        Self {
            port,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
            startup_scripts: Vec::new(),
        }
    }

    pub fn with_accept_timeout(mut self, accept_timeout: Duration) -> Self {
        self.accept_timeout = accept_timeout;
        self
    }

    pub fn with_startup_scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.startup_scripts = scripts.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the validated port.
    pub fn port(&self) -> Result<u16, ConfigError> {
        match u16::try_from(self.port) {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(ConfigError::InvalidPort(self.port)),
        }
    }

    /// Validates everything except the port.
    ///
    /// Used when the listener is supplied already bound.
    pub fn validate_timing(&self) -> Result<(), ConfigError> {
        if self.accept_timeout.is_zero() {
            return Err(ConfigError::ZeroAcceptTimeout);
        }
        Ok(())
    }

    /// Validates the whole configuration.
    pub fn validate(&self) -> Result<u16, ConfigError> {
        self.validate_timing()?;
        self.port()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_port_is_accepted() {
        assert_eq!(ServerConfig::new(9000).validate().unwrap(), 9000);
        assert_eq!(ServerConfig::new(1).port().unwrap(), 1);
        assert_eq!(ServerConfig::new(65535).port().unwrap(), 65535);
    }

    #[test]
    fn test_non_positive_port_is_rejected() {
        for port in [0, -1, -9000] {
            let err = ServerConfig::new(port).validate().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPort(p) if p == port));
        }
    }

    #[test]
    fn test_port_above_u16_is_rejected() {
        let err = ServerConfig::new(70000).port().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(70000)));
    }

    #[test]
    fn test_zero_accept_timeout_is_rejected() {
        let config = ServerConfig::new(9000).with_accept_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroAcceptTimeout)
        ));
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new(9000).with_startup_scripts(["a.shell", "b.shell"]);
        assert_eq!(config.accept_timeout, DEFAULT_ACCEPT_TIMEOUT);
        assert_eq!(config.startup_scripts, vec!["a.shell", "b.shell"]);
    }
}
