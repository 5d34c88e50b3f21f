//! # Adapter Implementations
//!
//! Concrete implementations of the signing pipeline's outbound ports:
//!
//! - `device`: scripted device transport over the device bus
//! - `bridge`: an `AccountBridge` over that transport and a simulated network
//! - `telemetry`: analytics events and Prometheus counters
//! - `observer`: progress logging

pub mod bridge;
pub mod device;
pub mod observer;
pub mod telemetry;

pub use bridge::{NetworkBehavior, SimulatedBridge};
pub use device::{DeviceScript, ScriptStep, SimulatedTransport};
pub use observer::LoggingObserver;
pub use telemetry::AnalyticsSink;
