use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known service identifier of the serial port profile channel
/// exposed by metering devices.
pub const SERIAL_PORT_PROFILE: ServiceId =
    ServiceId::from_static("00001101-0000-1000-8000-00805f9b34fb");

/// Opaque identifier of a remote metering device.
///
/// The stored text is handed to the [`Connector`](crate::Connector) untouched.
/// Any wrapping or formatting convention belongs to the connector that
/// consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address exactly as configured.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the configured address is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceAddress {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Service/profile identifier selecting the channel to open on the device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(std::borrow::Cow<'static, str>);

impl ServiceId {
    /// Service identifier from a static string.
    pub const fn from_static(id: &'static str) -> Self {
        Self(std::borrow::Cow::Borrowed(id))
    }

    /// Service identifier from an owned string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(std::borrow::Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        SERIAL_PORT_PROFILE
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
