//! # Device Messages
//!
//! Envelope for everything a device transport publishes on the bus.

use shared_types::{DeviceFailure, SigningEvent};

/// A message published by a device transport.
#[derive(Debug, Clone)]
pub struct DeviceMessage {
    /// Transport path of the emitting device.
    pub device_path: String,
    pub payload: DevicePayload,
}

/// What the device reported.
#[derive(Debug, Clone)]
pub enum DevicePayload {
    /// A signing event.
    Event(SigningEvent),
    /// The exchange failed; no further payloads follow for this exchange.
    Failure(DeviceFailure),
    /// The exchange finished normally.
    Completed,
}

impl DeviceMessage {
    pub fn event(device_path: impl Into<String>, event: SigningEvent) -> Self {
        Self {
            device_path: device_path.into(),
            payload: DevicePayload::Event(event),
        }
    }

    pub fn failure(device_path: impl Into<String>, failure: DeviceFailure) -> Self {
        Self {
            device_path: device_path.into(),
            payload: DevicePayload::Failure(failure),
        }
    }

    pub fn completed(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            payload: DevicePayload::Completed,
        }
    }

    /// Short tag used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match &self.payload {
            DevicePayload::Event(_) => "event",
            DevicePayload::Failure(_) => "failure",
            DevicePayload::Completed => "completed",
        }
    }
}

/// Filter for subscribing to specific devices.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    /// Device paths to include. Empty means all devices.
    pub device_paths: Vec<String>,
}

impl DeviceFilter {
    /// Create a filter that accepts all devices.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for a single device.
    #[must_use]
    pub fn device(path: impl Into<String>) -> Self {
        Self {
            device_paths: vec![path.into()],
        }
    }

    /// Check if a message matches this filter.
    #[must_use]
    pub fn matches(&self, message: &DeviceMessage) -> bool {
        self.device_paths.is_empty() || self.device_paths.contains(&message.device_path)
    }

    /// Key under which subscriptions using this filter are counted.
    #[must_use]
    pub fn key(&self) -> String {
        if self.device_paths.is_empty() {
            "*".to_string()
        } else {
            self.device_paths.join(",")
        }
    }
}
