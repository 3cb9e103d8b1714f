//! Error types used by the pipevisor runtime and its stages.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] : errors raised by the pipeline runtime itself.
//! - [`StageError`] : the ways a single stage worker can end.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Stage errors never travel along the data path: a failing stage closes its output
//! sequence and the error is published on the event bus instead.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the pipevisor runtime.
///
/// These represent failures of the orchestration layer itself,
/// such as a shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some stages were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the stages that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pipevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck stages={stuck:?}")
            }
        }
    }
}

/// # Ways a stage worker can end other than running to completion.
///
/// [`StageError::Canceled`] and [`StageError::Closed`] are graceful: they are what
/// [`Emitter::emit`](crate::Emitter::emit) returns when the token fires or the consumer
/// went away, so stage bodies can simply propagate them with `?`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Terminal local failure. The output sequence is closed and the error is reported.
    #[error("stage failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The stage observed its cancellation token.
    #[error("context cancelled")]
    Canceled,

    /// The downstream consumer dropped the output sequence.
    #[error("output sequence closed by consumer")]
    Closed,

    /// The stage worker panicked.
    #[error("stage panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// A type-erased value could not be converted to the expected type.
    #[error("conversion failed: expected {expected}")]
    Conversion {
        /// Name of the type the stage expected.
        expected: &'static str,
    },
}

impl StageError {
    /// Shorthand for [`StageError::Fail`].
    pub fn fail(error: impl ToString) -> Self {
        StageError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pipevisor::StageError;
    ///
    /// assert_eq!(StageError::fail("boom").as_label(), "stage_failed");
    /// assert_eq!(StageError::Canceled.as_label(), "stage_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StageError::Fail { .. } => "stage_failed",
            StageError::Canceled => "stage_canceled",
            StageError::Closed => "stage_output_closed",
            StageError::Panicked { .. } => "stage_panicked",
            StageError::Conversion { .. } => "stage_conversion_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StageError::Fail { error } => format!("error: {error}"),
            StageError::Canceled => "context cancelled".to_string(),
            StageError::Closed => "consumer gone".to_string(),
            StageError::Panicked { info } => format!("panic: {info}"),
            StageError::Conversion { expected } => format!("expected {expected}"),
        }
    }

    /// Indicates whether this ending is part of a clean shutdown rather than a failure.
    ///
    /// # Example
    /// ```
    /// use pipevisor::StageError;
    ///
    /// assert!(StageError::Canceled.is_graceful());
    /// assert!(StageError::Closed.is_graceful());
    /// assert!(!StageError::fail("nope").is_graceful());
    /// ```
    pub fn is_graceful(&self) -> bool {
        matches!(self, StageError::Canceled | StageError::Closed)
    }
}

/// Renders a panic payload caught by `catch_unwind` or a `JoinError`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_common_payloads() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn grace_exceeded_message_lists_stuck_stages() {
        let err = RuntimeError::GraceExceeded {
            grace: Duration::from_millis(10),
            stuck: vec!["decoder".into()],
        };
        assert!(err.as_message().contains("decoder"));
        assert!(err.to_string().contains("decoder"));
    }
}
