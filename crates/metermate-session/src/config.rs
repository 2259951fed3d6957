use std::time::Duration;

use metermate_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use metermate_transport::{DeviceAddress, ServiceId};
use serde::{Deserialize, Serialize};

/// Settings for one device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Device to connect to, passed to the connector as-is.
    pub device_address: DeviceAddress,
    /// Service channel to open on the device.
    pub service_id: ServiceId,
    /// Per-read timeout in milliseconds. `None` blocks until data arrives.
    ///
    /// A timeout is not an error: the loop re-checks the stop flag and keeps
    /// reading the same frame.
    pub read_timeout_ms: Option<u64>,
    /// Frames larger than this are discarded.
    pub max_frame_size: usize,
}

impl SessionConfig {
    pub fn new(device_address: impl Into<DeviceAddress>) -> Self {
        Self {
            device_address: device_address.into(),
            ..Self::default()
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        // Round up so a sub-millisecond timeout does not become "block forever".
        let ms = timeout.as_micros().div_ceil(1000);
        self.read_timeout_ms = Some(ms.min(u64::MAX as u128) as u64);
        self
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Frame reader settings derived from this session.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_frame_size,
            read_timeout: self.read_timeout(),
            write_timeout: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_address: DeviceAddress::new(""),
            service_id: ServiceId::default(),
            read_timeout_ms: None,
            max_frame_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use metermate_transport::SERIAL_PORT_PROFILE;

    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new("tcp://meter:4000");
        assert_eq!(config.device_address.as_str(), "tcp://meter:4000");
        assert_eq!(config.service_id, SERIAL_PORT_PROFILE);
        assert_eq!(config.read_timeout(), None);
        assert_eq!(config.frame_config().max_payload_size, DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn zero_timeout_means_blocking() {
        let config = SessionConfig {
            read_timeout_ms: Some(0),
            ..SessionConfig::default()
        };
        assert_eq!(config.read_timeout(), None);
    }

    #[test]
    fn sub_millisecond_timeout_rounds_up() {
        let config = SessionConfig::new("tcp://meter:4000").with_read_timeout(Duration::from_micros(300));
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(1)));

        let config = SessionConfig::new("tcp://meter:4000").with_read_timeout(Duration::from_micros(1500));
        assert_eq!(config.read_timeout_ms, Some(2));

        let config = SessionConfig::new("tcp://meter:4000").with_read_timeout(Duration::ZERO);
        assert_eq!(config.read_timeout(), None);
    }

    #[test]
    fn deserializes_partial_settings() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"device_address":"unix:///tmp/meter.sock","read_timeout_ms":250}"#)
                .unwrap();
        assert_eq!(config.device_address.as_str(), "unix:///tmp/meter.sock");
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.service_id, SERIAL_PORT_PROFILE);
        assert_eq!(config.frame_config().read_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn with_read_timeout_sets_millis() {
        let config = SessionConfig::new("tcp://m:1").with_read_timeout(Duration::from_secs(2));
        assert_eq!(config.read_timeout_ms, Some(2000));
    }
}
