use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::Result;

/// Prometheus `/metrics` endpoint served next to the fabric task
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub prometheus_enabled: bool,

    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: false,
            bind_address: default_bind_address(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.prometheus_port)
    }

    /// Only checked when the endpoint is enabled; ports below 1024 need
    /// root and are rejected.
    pub fn validate(&self) -> Result<()> {
        if !self.prometheus_enabled {
            return Ok(());
        }
        match self.prometheus_port {
            0 => Err(config_error("monitoring.prometheus_port cannot be 0 when enabled")),
            p if p < 1024 => Err(config_error(format!(
                "monitoring.prometheus_port {p} is a privileged port"
            ))),
            _ => Ok(()),
        }
    }
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_prometheus_port() -> u16 {
    9100
}
