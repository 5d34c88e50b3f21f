//! # Device Subscriber
//!
//! Defines the subscription side of the device bus.

use crate::events::{DeviceFilter, DeviceMessage, DevicePayload};
use shared_types::{DeviceFailure, SigningEvent};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The device bus was closed.
    #[error("Device bus closed")]
    Closed,
}

/// Per-key subscription counts plus a running total of releases.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    counts: RwLock<HashMap<String, usize>>,
    released: AtomicU64,
}

impl SubscriptionRegistry {
    pub(crate) fn acquire(&self, key: &str) {
        if let Ok(mut counts) = self.counts.write() {
            *counts.entry(key.to_string()).or_insert(0) += 1;
        }
    }

    fn release(&self, key: &str) {
        self.released.fetch_add(1, Ordering::SeqCst);
        let Ok(mut counts) = self.counts.write() else {
            return;
        };
        let Some(count) = counts.get_mut(key) else {
            return;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(key);
        }
    }

    pub(crate) fn active_for(&self, key: &str) -> usize {
        self.counts
            .read()
            .map(|counts| counts.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub(crate) fn active(&self) -> usize {
        self.counts
            .read()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    pub(crate) fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}

/// Releases one tracked subscription when dropped.
struct SubscriptionGuard {
    registry: Arc<SubscriptionRegistry>,
    key: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
        debug!(device = %self.key, "Device subscription released");
    }
}

/// A subscription handle for receiving device messages.
///
/// When dropped, the subscription is released.
pub struct Subscription {
    receiver: broadcast::Receiver<DeviceMessage>,
    filter: DeviceFilter,
    guard: SubscriptionGuard,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<DeviceMessage>,
        filter: DeviceFilter,
        registry: Arc<SubscriptionRegistry>,
    ) -> Self {
        let key = filter.key();
        Self {
            receiver,
            filter,
            guard: SubscriptionGuard { registry, key },
        }
    }

    /// Receive the next message that matches the filter.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<DeviceMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some device messages dropped");
                    continue;
                }
            };

            if self.filter.matches(&message) {
                return Some(message);
            }
        }
    }

    /// Try to receive the next message without waiting.
    ///
    /// - `Ok(Some(message))` - A matching message was available
    /// - `Ok(None)` - Nothing available yet
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<DeviceMessage>, SubscriptionError> {
        loop {
            let message = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&message) {
                return Ok(Some(message));
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    /// Turn this subscription into a stream of signing events.
    #[must_use]
    pub fn into_stream(self) -> DeviceEventStream {
        DeviceEventStream {
            inner: BroadcastStream::new(self.receiver),
            filter: self.filter,
            finished: false,
            _guard: self.guard,
        }
    }
}

/// Signing events of one device exchange, as a stream.
///
/// Yields `Ok(event)` for each event, a single `Err(failure)` if the device
/// fails or the subscriber falls behind the bus, and ends after a failure or
/// a completion message. Dropping the
/// stream releases the underlying subscription.
pub struct DeviceEventStream {
    inner: BroadcastStream<DeviceMessage>,
    filter: DeviceFilter,
    finished: bool,
    _guard: SubscriptionGuard,
}

impl DeviceEventStream {
    #[must_use]
    pub fn filter(&self) -> &DeviceFilter {
        &self.filter
    }
}

impl Stream for DeviceEventStream {
    type Item = Result<SigningEvent, DeviceFailure>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            let message = match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    self.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    // A dropped message may have been the terminal one.
                    warn!(lagged = count, "Device stream lagged, exchange aborted");
                    self.finished = true;
                    return Poll::Ready(Some(Err(DeviceFailure::Transport(format!(
                        "device stream lagged, {count} messages dropped"
                    )))));
                }
                Poll::Ready(Some(Ok(message))) => message,
            };

            if !self.filter.matches(&message) {
                continue;
            }

            match message.payload {
                DevicePayload::Event(event) => return Poll::Ready(Some(Ok(event))),
                DevicePayload::Failure(failure) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(failure)));
                }
                DevicePayload::Completed => {
                    self.finished = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}
