use confique::Config;
use std::time::Duration;

/// Outbound HTTP client timeouts
#[derive(Debug, Config, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout for API calls in seconds (default: 30)
    #[config(env = "HMPPS_HTTP_CLIENT_TIMEOUT", default = 30)]
    pub timeout: u64,

    /// Connection timeout in seconds (default: 5)
    #[config(env = "HMPPS_HTTP_CLIENT_CONNECT_TIMEOUT", default = 5)]
    pub connect_timeout: u64,

    /// Timeout for downstream health pings in seconds (default: 2)
    #[config(env = "HMPPS_HTTP_CLIENT_HEALTH_TIMEOUT", default = 2.0)]
    pub health_timeout: f64,
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.health_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        let config = HttpClientConfig {
            timeout: 20,
            connect_timeout: 1,
            health_timeout: 0.5,
        };
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.health_timeout(), Duration::from_millis(500));
    }
}
