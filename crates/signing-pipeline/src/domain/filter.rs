//! # Event Filter
//!
//! Decides what happens to each raw event coming off the device stream.

use shared_types::{SignedOperation, SigningEvent};

/// Where a raw device event goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Dropped silently.
    Skip,
    /// Forwarded to the caller as progress.
    Progress(SigningEvent),
    /// The signature; ends the streaming phase.
    Signed(SignedOperation),
}

/// `true` for streaming events at exactly 0 or exactly 1.
///
/// Those carry no information for a progress display; intermediate values
/// always pass.
#[must_use]
pub fn is_boundary_progress(event: &SigningEvent) -> bool {
    match event.progress() {
        Some(progress) => progress == 0.0 || progress == 1.0,
        None => false,
    }
}

/// Route one device event.
///
/// `accept_informational` is consulted only for informational events
/// (signature requested / granted); it lets an observer opt out of them.
pub fn dispatch<F>(event: SigningEvent, accept_informational: F) -> Dispatch
where
    F: FnOnce(&SigningEvent) -> bool,
{
    if is_boundary_progress(&event) {
        return Dispatch::Skip;
    }

    match event {
        SigningEvent::Signed { signed_operation } => Dispatch::Signed(signed_operation),
        event if event.kind().is_informational() => {
            if accept_informational(&event) {
                Dispatch::Progress(event)
            } else {
                Dispatch::Skip
            }
        }
        event => Dispatch::Progress(event),
    }
}
