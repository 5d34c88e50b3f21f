//! # Device Bus - In-Process Device Event Transport
//!
//! Carries signing events from device transports to the runs consuming them.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Transport    │                    │ Signing run  │
//! │ (HID / BLE)  │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Device Bus  │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe(device)
//! ```
//!
//! ## Subscription lifetime
//!
//! Every subscription is tracked per device path. Dropping a
//! [`Subscription`] or a [`DeviceEventStream`] releases it exactly once; the
//! bus counts releases so callers can prove a run did not leak its stream.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{DeviceFilter, DeviceMessage, DevicePayload};
pub use publisher::{DevicePublisher, InMemoryDeviceBus};
pub use subscriber::{DeviceEventStream, Subscription, SubscriptionError};

/// Maximum messages buffered per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
