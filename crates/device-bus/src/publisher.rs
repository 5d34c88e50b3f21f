//! # Device Publisher
//!
//! Defines the publishing side of the device bus.

use crate::events::{DeviceFilter, DeviceMessage};
use crate::subscriber::{DeviceEventStream, Subscription, SubscriptionRegistry};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait device transports use to publish what a device reports.
#[async_trait]
pub trait DevicePublisher: Send + Sync {
    /// Publish a message to the bus.
    ///
    /// Returns the number of active subscribers that received it.
    async fn publish(&self, message: DeviceMessage) -> usize;

    /// Total number of messages published.
    fn messages_published(&self) -> u64;
}

/// In-memory implementation of the device bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer delivery.
pub struct InMemoryDeviceBus {
    sender: broadcast::Sender<DeviceMessage>,
    registry: Arc<SubscriptionRegistry>,
    messages_published: AtomicU64,
    capacity: usize,
}

impl InMemoryDeviceBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(SubscriptionRegistry::default()),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to messages matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: DeviceFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        self.registry.acquire(&filter.key());

        debug!(devices = ?filter.device_paths, "New device subscription created");

        Subscription::new(receiver, filter, self.registry.clone())
    }

    /// Subscribe and return the subscription as a stream of signing events.
    #[must_use]
    pub fn event_stream(&self, filter: DeviceFilter) -> DeviceEventStream {
        self.subscribe(filter).into_stream()
    }

    /// Number of live subscriptions across all devices.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.active()
    }

    /// Number of live subscriptions for one device.
    #[must_use]
    pub fn subscribers_for(&self, device_path: &str) -> usize {
        self.registry.active_for(&DeviceFilter::device(device_path).key())
    }

    /// Total subscriptions released since the bus was created.
    #[must_use]
    pub fn released_count(&self) -> u64 {
        self.registry.released()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryDeviceBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DevicePublisher for InMemoryDeviceBus {
    async fn publish(&self, message: DeviceMessage) -> usize {
        let device = message.device_path.clone();
        let kind = message.kind();

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(message) {
            Ok(receiver_count) => {
                debug!(
                    device = %device,
                    kind = kind,
                    receivers = receiver_count,
                    "Device message published"
                );
                receiver_count
            }
            Err(_) => {
                // No receivers: the run that wanted these events is gone.
                warn!(device = %device, kind = kind, "Device message dropped (no subscribers)");
                0
            }
        }
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
