//! Session configuration

use pnio_core::MacAddress;
use std::time::Duration;

/// UDP port of the PNIO connection-oriented RPC service
pub const RPC_PORT: u16 = 0x8894;

/// Session key used when none is configured
pub const DEFAULT_SESSION_KEY: u16 = 0x1234;

/// Idle time after which a read or write reconnects first
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(10);

/// Time to wait for a reply datagram
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Echoed in every control block of the AR
    pub session_key: u16,
    /// Reply timeout, `None` waits forever
    pub timeout: Option<Duration>,
    /// Staleness threshold for the reconnect before reads and writes
    pub keepalive: Duration,
    pub rpc_port: u16,
    /// Record length requested by `read_identification`
    pub max_read_length: u32,
    /// MAC announced as CM initiator when no connect has supplied one
    pub source_mac: Option<MacAddress>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            session_key: DEFAULT_SESSION_KEY,
            timeout: Some(DEFAULT_TIMEOUT),
            keepalive: DEFAULT_KEEPALIVE,
            rpc_port: RPC_PORT,
            max_read_length: pnio_rpc::iod::DEFAULT_READ_LENGTH,
            source_mac: None,
        }
    }
}

impl ConnectionConfig {
    pub fn with_session_key(mut self, session_key: u16) -> Self {
        self.session_key = session_key;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_source_mac(mut self, source_mac: MacAddress) -> Self {
        self.source_mac = Some(source_mac);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.session_key, 0x1234);
        assert_eq!(config.rpc_port, 34964);
        assert_eq!(config.keepalive, Duration::from_secs(10));
        assert_eq!(config.max_read_length, 3932);
        assert!(config.source_mac.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let mac = MacAddress::new([2, 0, 0, 0, 0, 1]);
        let config = ConnectionConfig::default()
            .with_session_key(7)
            .with_timeout(None)
            .with_source_mac(mac);
        assert_eq!(config.session_key, 7);
        assert_eq!(config.timeout, None);
        assert_eq!(config.source_mac, Some(mac));
    }
}
