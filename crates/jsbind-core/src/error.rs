//! Failure types raised at the boundary.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError (returned by every boundary operation)
//! ├── Conversion      - a value cannot be represented on the other side
//! ├── External        - the external system threw (carries the thrown value)
//! ├── BoundaryPanic   - a host function panicked while called from outside
//! ├── ReentrancyLimit - nested host calls exceeded the configured depth
//! ├── NoSuchMember    - reflective access named an unknown field or method
//! └── Host            - a host function failed with a plain message
//! ```
//!
//! Inside a boxed host function every variant is turned back into an external
//! throw, so no host-only failure representation reaches external code.

use std::ops::Deref;

use thiserror::Error;

use crate::object::Object;

// ============================================================================
// Conversion Errors
// ============================================================================

/// A value could not be represented in the target system.
///
/// Conversions fail before any external side effect of the enclosing
/// operation happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value has the wrong kind for the requested type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The requested host type.
        expected: &'static str,
        /// The external class of the value.
        actual: &'static str,
    },

    /// A number does not fit in the requested integer type.
    #[error("integer overflow: {value} doesn't fit in {target_type}")]
    IntegerOverflow {
        /// The external number.
        value: f64,
        /// The requested host type.
        target_type: &'static str,
    },

    /// A date is out of range or invalid.
    #[error("invalid date: {millis} ms since epoch")]
    InvalidDate {
        /// The external time value.
        millis: f64,
    },

    /// An index does not fit in the external index domain.
    #[error("index {index} is out of range for external access")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
    },

    /// The value's shape has no external representation.
    #[error("unsupported value: {detail}")]
    Unsupported {
        /// What was attempted.
        detail: String,
    },
}

// ============================================================================
// External Exceptions
// ============================================================================

/// An exception thrown by the external system, caught at the boundary.
///
/// Keeps the thrown value so callers can still inspect external state such as
/// the `stack` property. Dereferences to the thrown [`Object`].
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExternalException {
    value: Object,
    message: String,
}

impl ExternalException {
    /// Wrap a thrown value; the message is its external string form.
    pub fn new(value: Object) -> Self {
        let message = value.to_string();
        Self { value, message }
    }

    /// The thrown value.
    pub fn value(&self) -> &Object {
        &self.value
    }

    pub fn into_value(self) -> Object {
        self.value
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The external `stack` property, if the thrown value carries one.
    pub fn stack(&self) -> Option<String> {
        match self.value.get("stack") {
            Ok(stack) if !stack.is_undefined() && !stack.is_null() => Some(stack.string()),
            _ => None,
        }
    }
}

impl Deref for ExternalException {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.value
    }
}

// ============================================================================
// Bridge Errors
// ============================================================================

/// Failure of a boundary operation.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// A value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The external system threw.
    #[error(transparent)]
    External(#[from] ExternalException),

    /// A host function panicked while invoked from the external side.
    #[error("host function panicked: {message}")]
    BoundaryPanic {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// Nested host calls exceeded the configured depth.
    #[error("maximum bridge reentrancy depth of {limit} exceeded")]
    ReentrancyLimit {
        /// The configured limit.
        limit: usize,
    },

    /// Reflective access named an unknown field or method.
    #[error("{type_name} has no member named '{member}'")]
    NoSuchMember {
        /// The reflected type.
        type_name: &'static str,
        /// The requested member.
        member: String,
    },

    /// A host function failed.
    #[error("{0}")]
    Host(String),
}

impl BridgeError {
    /// Failure with a plain message, thrown externally as an `Error`.
    pub fn host(message: impl Into<String>) -> Self {
        BridgeError::Host(message.into())
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, BridgeError::Conversion(_))
    }

    pub fn is_external(&self) -> bool {
        matches!(self, BridgeError::External(_))
    }

    pub fn is_boundary_panic(&self) -> bool {
        matches!(self, BridgeError::BoundaryPanic { .. })
    }

    /// The external exception, when this failure came from a throw.
    pub fn as_external(&self) -> Option<&ExternalException> {
        match self {
            BridgeError::External(exception) => Some(exception),
            _ => None,
        }
    }

    pub fn into_external(self) -> Option<ExternalException> {
        match self {
            BridgeError::External(exception) => Some(exception),
            _ => None,
        }
    }
}
