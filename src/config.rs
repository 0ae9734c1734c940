use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for a serial-attached instrument.
///
/// Deserializable so applications can keep it in whatever config file
/// format they already use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_baud_rate() -> u32 {
    9600
}

const fn default_timeout_ms() -> u64 {
    1000
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Where the TTi 1604 optical cable usually shows up.
    pub fn dmm_default() -> Self {
        Self::new("/dev/ttyUSB1")
    }

    pub fn psu(port: impl Into<String>) -> Self {
        Self::new(port)
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SerialConfig = serde_json::from_str(r#"{"port": "/dev/ttyACM0"}"#).unwrap();
        assert_eq!(config, SerialConfig::new("/dev/ttyACM0"));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_builder_overrides() {
        let config = SerialConfig::dmm_default()
            .with_baud_rate(19200)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.port, "/dev/ttyUSB1");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.timeout_ms, 250);

        let json = serde_json::to_string(&config).unwrap();
        let back: SerialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
