//! # Domain Layer
//!
//! Pure run logic: event filtering, error classification, the run state
//! machine and outcome types. Timing is the only module that touches the
//! runtime clock.

pub mod errors;
pub mod filter;
pub mod outcome;
pub mod state;
pub mod timing;
