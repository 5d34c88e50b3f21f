//! # Ports Layer
//!
//! - `inbound`: the API callers use to start runs
//! - `outbound`: what a run needs from a bridge, an observer and telemetry

pub mod inbound;
pub mod outbound;
