//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Desktop network monitor implementation
///
/// Answers "is any network reachable" by opening a TCP connection to a probe
/// address. Platform-specific APIs (netlink, SystemConfiguration, Network List
/// Manager) would be more precise but need additional dependencies.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
}

impl DesktopNetworkMonitor {
    /// Create a monitor probing a public DNS resolver.
    pub fn new() -> Self {
        Self::with_probe(DEFAULT_PROBE_ADDR, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a monitor probing a custom `host:port`.
    pub fn with_probe(probe_addr: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            probe_addr: probe_addr.into(),
            probe_timeout,
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match core_async::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) => NetworkStatus::Disconnected,
            Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;
        debug!(status = ?status, probe = %self.probe_addr, "Network info updated");

        Ok(NetworkInfo {
            status,
            // Desktop cannot tell WiFi from Ethernet without platform APIs
            network_type: (status == NetworkStatus::Connected).then_some(NetworkType::Other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reachable_probe_reports_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let monitor = DesktopNetworkMonitor::with_probe(addr.to_string(), Duration::from_secs(1));
        let info = monitor.get_network_info().await.unwrap();

        assert_eq!(info.status, NetworkStatus::Connected);
        assert_eq!(info.network_type, Some(NetworkType::Other));
        assert!(monitor.is_connected().await);
    }

    #[tokio::test]
    async fn test_unreachable_probe_reports_disconnected() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let monitor = DesktopNetworkMonitor::with_probe(addr.to_string(), Duration::from_secs(1));
        let info = monitor.get_network_info().await.unwrap();

        assert_eq!(info.status, NetworkStatus::Disconnected);
        assert_eq!(info.network_type, None);
        assert!(!monitor.is_connected().await);
    }
}
