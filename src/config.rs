use crate::infrastructure::bybit_client::BybitNetwork;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the gateway service
///
/// Credentials are not part of this struct; see `secrets::Credentials`.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub network: BybitNetwork,
    pub bind_addr: SocketAddr,
    pub recv_window_ms: u64,
    pub http_timeout_ms: u64,
    pub rate_limit_per_minute: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            network: BybitNetwork::Mainnet,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            recv_window_ms: 5_000,
            http_timeout_ms: 10_000, // 10 second exchange timeout
            rate_limit_per_minute: 120,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> GatewayConfig {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any variable source. Invalid values are
    /// logged and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> GatewayConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = GatewayConfig::default();

        if let Some(testnet) = lookup("BYBIT_TESTNET") {
            let enabled = testnet.eq_ignore_ascii_case("true") || testnet == "1";
            if enabled {
                config.network = BybitNetwork::Testnet;
            }
        }

        if let Some(addr) = lookup("BIND_ADDR") {
            match SocketAddr::from_str(addr.trim()) {
                Ok(value) => config.bind_addr = value,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse BIND_ADDR '{}': {}, using default: {}",
                        addr,
                        e,
                        config.bind_addr
                    );
                }
            }
        }

        if let Some(value) = parse_in_range(&lookup, "RECV_WINDOW_MS", 1_000..=60_000) {
            config.recv_window_ms = value;
        }

        if let Some(value) = parse_in_range(&lookup, "HTTP_TIMEOUT_MS", 1_000..=60_000) {
            config.http_timeout_ms = value;
        }

        if let Some(value) = parse_in_range(&lookup, "RATE_LIMIT_PER_MINUTE", 1..=10_000) {
            config.rate_limit_per_minute = value;
        }

        config
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

fn parse_in_range<F, T>(lookup: &F, name: &str, range: std::ops::RangeInclusive<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => Some(value),
        Ok(value) => {
            tracing::warn!(
                "Invalid {} value: {} (must be between {} and {}), using default",
                name,
                value,
                range.start(),
                range.end()
            );
            None
        }
        Err(e) => {
            tracing::warn!("Failed to parse {} '{}': {}, using default", name, raw, e);
            None
        }
    }
}
