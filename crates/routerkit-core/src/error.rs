//! Error handling for RouterKit
//!
//! A single error type shared across the workspace. Operator-visible
//! failures are `NotFound`, `InvalidArgument`, and `InvalidState`; transport
//! and peripheral faults are recovered locally and never reach the operator
//! surface.

use thiserror::Error;

/// Main error type for RouterKit
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced file or tool does not exist
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What kind of thing was looked up ("file", "tool", ...).
        kind: &'static str,
        /// The identifier that missed.
        name: String,
    },

    /// A request parameter is malformed
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// An operation was attempted in a state that forbids it
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Why the operation was rejected.
        reason: String,
    },

    /// Serial transport fault; the link closes itself and the controller
    /// continues in simulation
    #[error("transport error: {reason}")]
    Transport {
        /// Description of the transport fault.
        reason: String,
    },

    /// GPIO/I2C hardware is absent or failed to open
    #[error("peripheral unavailable: {reason}")]
    PeripheralUnavailable {
        /// Description of the missing peripheral.
        reason: String,
    },

    /// Relational store fault
    #[error("storage error: {reason}")]
    Storage {
        /// Description of the storage fault.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// A `NotFound` error for the given kind and identifier
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// An `InvalidArgument` error with the given reason
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// An `InvalidState` error with the given reason
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Error::InvalidState {
            reason: reason.into(),
        }
    }

    /// A `Transport` error with the given reason
    pub fn transport(reason: impl Into<String>) -> Self {
        Error::Transport {
            reason: reason.into(),
        }
    }

    /// A `PeripheralUnavailable` error with the given reason
    pub fn peripheral(reason: impl Into<String>) -> Self {
        Error::PeripheralUnavailable {
            reason: reason.into(),
        }
    }

    /// A `Storage` error with the given reason
    pub fn storage(reason: impl Into<String>) -> Self {
        Error::Storage {
            reason: reason.into(),
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is an invalid-argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    /// Check if this is an invalid-state error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState { .. })
    }

    /// Check if this error should be visible at the operator surface
    ///
    /// Everything else is recovered locally; the live state feed is the
    /// operator's signal that something is wrong.
    pub fn is_operator_visible(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::InvalidArgument { .. } | Error::InvalidState { .. }
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_visibility() {
        assert!(Error::not_found("file", "part.gcode").is_operator_visible());
        assert!(Error::invalid_argument("bad axis").is_operator_visible());
        assert!(Error::invalid_state("job already running").is_operator_visible());
        assert!(!Error::transport("port vanished").is_operator_visible());
        assert!(!Error::peripheral("no I2C bus").is_operator_visible());
    }

    #[test]
    fn display_includes_identifier() {
        let err = Error::not_found("tool", "17");
        assert_eq!(err.to_string(), "tool not found: 17");
    }
}
