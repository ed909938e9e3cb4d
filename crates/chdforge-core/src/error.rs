//! Unified error type for chdforge.
//!
//! The supervisor itself never surfaces job failures as errors (those travel
//! as `ok = false` on the finished event); [`Error`] covers the API surface
//! around it: invalid jobs and a supervisor that no longer accepts commands.

/// Error type covering the non-job failure modes in chdforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A job description failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The supervisor has shut down or its task is no longer running.
    #[error("Supervisor has stopped")]
    EngineStopped,
}

impl Error {
    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = Error::validation("output path is required");
        assert_eq!(err.to_string(), "Validation error: output path is required");
    }

    #[test]
    fn engine_stopped_display() {
        assert_eq!(Error::EngineStopped.to_string(), "Supervisor has stopped");
    }
}
