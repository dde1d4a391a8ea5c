//! Error types used by the event bus.
//!
//! A single enum, [`EventError`], covers every failure the bus reports:
//!
//! - [`EventError::InvalidReference`] raised at subscribe time when a
//!   reference does not resolve to a live callable.
//! - [`EventError::NullAction`] raised at delivery time when an action vanished
//!   between strategy capture and invocation.
//! - [`EventError::NoDispatchContext`] raised when a marshaled subscription is
//!   requested on a channel without a home context.
//! - [`EventError::BackgroundUnavailable`] raised at delivery time when no
//!   blocking pool can take a background job.
//!
//! Dead subscribers are **not** errors: they are pruned silently.

use thiserror::Error;

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// A reference passed to build a subscription does not resolve to a live target.
    #[error("invalid {role} reference: target is not alive")]
    InvalidReference {
        /// Which reference was rejected (`"action"` or `"filter"`).
        role: &'static str,
    },

    /// A delivery was attempted with an action that resolved to nothing.
    #[error("{dispatch} delivery attempted without an action")]
    NullAction {
        /// Dispatch variant that observed the missing action.
        dispatch: &'static str,
    },

    /// Marshaled dispatch requested but the channel has no home context.
    #[error("marshaled dispatch requires a home context; build the registry with one")]
    NoDispatchContext,

    /// No blocking pool could accept a background job.
    #[error("background pool unavailable: {reason}")]
    BackgroundUnavailable {
        /// Why the pool refused the job.
        reason: String,
    },
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use weakbus::EventError;
    ///
    /// let err = EventError::InvalidReference { role: "action" };
    /// assert_eq!(err.as_label(), "invalid_reference");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::InvalidReference { .. } => "invalid_reference",
            EventError::NullAction { .. } => "null_action",
            EventError::NoDispatchContext => "no_dispatch_context",
            EventError::BackgroundUnavailable { .. } => "background_unavailable",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EventError::InvalidReference { role } => format!("{role} reference is dead"),
            EventError::NullAction { dispatch } => format!("null action on {dispatch} delivery"),
            EventError::NoDispatchContext => "no home dispatch context".to_string(),
            EventError::BackgroundUnavailable { reason } => {
                format!("background pool unavailable: {reason}")
            }
        }
    }
}
