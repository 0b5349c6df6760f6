//! Configuration management for Throttlebox.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, ThrottleboxError};

/// Main configuration for the Throttlebox service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleboxConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiter parameters. Mandatory: the service refuses to start
    /// without explicit limits.
    pub parameters: Parameters,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8429))
}

/// Limiter parameters for the simulated endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    /// Number of endpoints in each tracker table
    pub max_endpoints: usize,

    /// Accepted requests per window on the uniform endpoints
    pub max_requests: u32,

    /// Cooldown duration in seconds on the uniform endpoints; also the
    /// inactivity window after which an idle counter resets
    pub retry_after_seconds: u64,

    /// Seed for the randomized table; omit to seed from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ThrottleboxConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ThrottleboxConfig =
            serde_yaml::from_str(&contents).map_err(|e| ThrottleboxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()
    }
}

impl Parameters {
    /// Reject unusable limits; every value must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_endpoints == 0 {
            return Err(ThrottleboxError::Config(
                "max_endpoints must be greater than zero".to_string(),
            ));
        }
        if self.max_requests == 0 {
            return Err(ThrottleboxError::Config(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if self.retry_after_seconds == 0 {
            return Err(ThrottleboxError::Config(
                "retry_after_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters(max_endpoints: usize, max_requests: u32, retry_after_seconds: u64) -> Parameters {
        Parameters {
            max_endpoints,
            max_requests,
            retry_after_seconds,
            seed: None,
        }
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  listen_addr: "0.0.0.0:9000"
parameters:
  max_endpoints: 3
  max_requests: 10
  retry_after_seconds: 5
  seed: 7
"#;
        let config: ThrottleboxConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.parameters.max_endpoints, 3);
        assert_eq!(config.parameters.max_requests, 10);
        assert_eq!(config.parameters.retry_after_seconds, 5);
        assert_eq!(config.parameters.seed, Some(7));
    }

    #[test]
    fn test_server_section_is_optional() {
        let yaml = r#"
parameters:
  max_endpoints: 1
  max_requests: 1
  retry_after_seconds: 1
"#;
        let config: ThrottleboxConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.listen_addr, default_listen_addr());
        assert_eq!(config.parameters.seed, None);
    }

    #[test]
    fn test_missing_parameters_section_fails() {
        let yaml = r#"
server:
  listen_addr: "127.0.0.1:9000"
"#;
        assert!(serde_yaml::from_str::<ThrottleboxConfig>(yaml).is_err());
    }

    #[test]
    fn test_missing_parameter_field_fails() {
        let yaml = r#"
parameters:
  max_endpoints: 1
  max_requests: 1
"#;
        assert!(serde_yaml::from_str::<ThrottleboxConfig>(yaml).is_err());
    }

    #[test]
    fn test_zero_max_endpoints_rejected() {
        assert!(parameters(0, 1, 1).validate().is_err());
    }

    #[test]
    fn test_zero_max_requests_rejected() {
        assert!(parameters(1, 0, 1).validate().is_err());
    }

    #[test]
    fn test_zero_retry_after_rejected() {
        assert!(parameters(1, 1, 0).validate().is_err());
    }

    #[test]
    fn test_positive_parameters_accepted() {
        assert!(parameters(1, 1, 1).validate().is_ok());
    }
}
