//! # Shared Types Crate
//!
//! This crate contains the entities exchanged between the device transport,
//! the signing pipeline and its callers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Opaque Payloads**: The pipeline never inspects an
//!   [`UnsignedTransaction`] or [`SignedOperation`] beyond passing it along.
//! - **Raw Failures Stay Raw**: [`DeviceFailure`] and [`BroadcastFailure`]
//!   describe what the transport reported; classification happens in the
//!   pipeline.

pub mod entities;
pub mod errors;
pub mod events;

pub use entities::*;
pub use errors::*;
pub use events::*;
