//! Host configuration.

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Runtime configuration for a [`QuicHost`](crate::QuicHost).
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Address to bind the UDP socket to. Port `0` picks a free port.
    pub listen_addr: SocketAddr,
    /// Interval between QUIC keep-alive packets on idle connections
    pub keep_alive_interval: Duration,
    /// Idle time after which a silent connection is dropped
    pub idle_timeout: Duration,
}

impl HostConfig {
    /// Default configuration listening on all IPv4 interfaces at `port`.
    pub fn with_port(port: u16) -> Self {
        Self { listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), ..Self::default() }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            keep_alive_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_port_keeps_timeouts() {
        let config = HostConfig::with_port(4001);
        assert_eq!(config.listen_addr, "0.0.0.0:4001".parse().unwrap());
        assert_eq!(config.idle_timeout, HostConfig::default().idle_timeout);
    }

    #[test]
    fn keep_alive_fires_before_idle_timeout() {
        let config = HostConfig::default();
        assert!(config.keep_alive_interval < config.idle_timeout);
    }
}
