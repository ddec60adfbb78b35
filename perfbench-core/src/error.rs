//! Method Errors
//!
//! Both kinds are values: the validator returns them, the executor passes
//! them on, nothing aborts the process.

use crate::class::{MethodId, Role};
use thiserror::Error;

/// A method is structurally unfit for its lifecycle role
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    /// The target instance is not of the method's declaring class.
    #[error("{method} ({role}) is not declared on the target instance's type")]
    NotOwned {
        /// Offending method
        method: MethodId,
        /// Role it was checked for
        role: Role,
    },

    /// The method is not `pub`.
    #[error("{method} ({role}) must be public")]
    NotPublic {
        /// Offending method
        method: MethodId,
        /// Role it was checked for
        role: Role,
    },

    /// The method takes parameters besides the receiver.
    #[error("{method} ({role}) must take no parameters, takes {count}")]
    HasParameters {
        /// Offending method
        method: MethodId,
        /// Role it was checked for
        role: Role,
        /// Number of parameters
        count: usize,
    },

    /// The method returns a value.
    #[error("{method} ({role}) must return (), returns `{ty}`")]
    ReturnsValue {
        /// Offending method
        method: MethodId,
        /// Role it was checked for
        role: Role,
        /// Declared return type
        ty: &'static str,
    },
}

impl CheckError {
    /// Method the check failed for
    pub fn method(&self) -> MethodId {
        match self {
            CheckError::NotOwned { method, .. }
            | CheckError::NotPublic { method, .. }
            | CheckError::HasParameters { method, .. }
            | CheckError::ReturnsValue { method, .. } => *method,
        }
    }

    /// Role the method was checked for
    pub fn role(&self) -> Role {
        match self {
            CheckError::NotOwned { role, .. }
            | CheckError::NotPublic { role, .. }
            | CheckError::HasParameters { role, .. }
            | CheckError::ReturnsValue { role, .. } => *role,
        }
    }
}

/// A method could not be invoked, or raised while running
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    /// No invoker is registered for the method.
    #[error("{method} ({role}) cannot be invoked without arguments")]
    NotInvocable {
        /// Offending method
        method: MethodId,
        /// Role it was invoked for
        role: Role,
    },

    /// The invoker rejected the target instance.
    #[error("{method} ({role}): invocation target is not a `{expected}`")]
    TargetMismatch {
        /// Offending method
        method: MethodId,
        /// Role it was invoked for
        role: Role,
        /// Expected type name
        expected: &'static str,
    },

    /// The method returned an error.
    #[error("{method} ({role}) raised: {message}")]
    Raised {
        /// Offending method
        method: MethodId,
        /// Role it was invoked for
        role: Role,
        /// Error text
        message: String,
    },

    /// The method panicked.
    #[error("{method} ({role}) panicked: {message}")]
    Panicked {
        /// Offending method
        method: MethodId,
        /// Role it was invoked for
        role: Role,
        /// Panic payload text
        message: String,
    },
}

impl InvocationError {
    /// Method the invocation failed for
    pub fn method(&self) -> MethodId {
        match self {
            InvocationError::NotInvocable { method, .. }
            | InvocationError::TargetMismatch { method, .. }
            | InvocationError::Raised { method, .. }
            | InvocationError::Panicked { method, .. } => *method,
        }
    }

    /// Role the method was invoked for
    pub fn role(&self) -> Role {
        match self {
            InvocationError::NotInvocable { role, .. }
            | InvocationError::TargetMismatch { role, .. }
            | InvocationError::Raised { role, .. }
            | InvocationError::Panicked { role, .. } => *role,
        }
    }
}

/// Either failure kind, as surfaced by the executor
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MethodError {
    /// Structural check failed; the method was not invoked.
    #[error(transparent)]
    Check(#[from] CheckError),

    /// The method was invoked and failed.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

impl MethodError {
    /// Method the failure is attributed to
    pub fn method(&self) -> MethodId {
        match self {
            MethodError::Check(e) => e.method(),
            MethodError::Invocation(e) => e.method(),
        }
    }

    /// Role the method was run for
    pub fn role(&self) -> Role {
        match self {
            MethodError::Check(e) => e.role(),
            MethodError::Invocation(e) => e.role(),
        }
    }
}
