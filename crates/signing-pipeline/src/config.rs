//! Pipeline configuration.

use std::time::Duration;
use thiserror::Error;

/// Minimum time a successful broadcast takes, as seen by the caller.
pub const DEFAULT_MIN_BROADCAST_DURATION: Duration = Duration::from_millis(3000);

/// Context label used to name telemetry events when none is given.
pub const DEFAULT_CONTEXT: &str = "Send";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Context label must not be empty")]
    EmptyContext,
}

/// Configuration shared by every run of a [`crate::SigningPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Floor on the wall-clock duration of a successful broadcast.
    pub min_broadcast_duration: Duration,
    /// Default telemetry context label (e.g. `"Send"`, `"Swap"`).
    pub context: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_broadcast_duration: DEFAULT_MIN_BROADCAST_DURATION,
            context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_min_broadcast_duration(mut self, duration: Duration) -> Self {
        self.min_broadcast_duration = duration;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyContext`] for a blank context label.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.trim().is_empty() {
            return Err(ConfigError::EmptyContext);
        }
        Ok(())
    }
}
