//! Method Validator
//!
//! Structural eligibility checks and panic-safe invocation. Validation is
//! structural only: the role is carried into errors for attribution but does
//! not change what is accepted.

use crate::class::{InvokeFailure, MethodDescriptor, ReturnShape, Role, Visibility};
use crate::error::{CheckError, InvocationError};
use std::any::Any;

/// Check that `method` can run on `target` in `role`.
///
/// Fails when `target` is not an instance of the method's declaring class,
/// or when [`check_shape`] fails.
pub fn check_method(
    target: &dyn Any,
    method: &MethodDescriptor,
    role: Role,
) -> Result<(), CheckError> {
    if !method.owner().is_instance(target) {
        return Err(CheckError::NotOwned {
            method: method.id(),
            role,
        });
    }
    check_shape(method, role)
}

/// Check the signature shape: public, no parameters, `()` or `Result<(), E>` return.
pub fn check_shape(method: &MethodDescriptor, role: Role) -> Result<(), CheckError> {
    if method.declared_visibility() != Visibility::Public {
        return Err(CheckError::NotPublic {
            method: method.id(),
            role,
        });
    }

    if method.param_count() != 0 {
        return Err(CheckError::HasParameters {
            method: method.id(),
            role,
            count: method.param_count(),
        });
    }

    match method.return_shape() {
        ReturnShape::Unit | ReturnShape::Fallible => Ok(()),
        ReturnShape::Value(ty) => Err(CheckError::ReturnsValue {
            method: method.id(),
            role,
            ty,
        }),
    }
}

/// Invoke `method` on `target` once.
///
/// Errors returned by the method become [`InvocationError::Raised`], panics
/// become [`InvocationError::Panicked`]. Does not run [`check_method`].
pub fn invoke_method(
    target: &mut dyn Any,
    method: &MethodDescriptor,
    role: Role,
) -> Result<(), InvocationError> {
    let Some(invoker) = method.get_invoker() else {
        return Err(InvocationError::NotInvocable {
            method: method.id(),
            role,
        });
    };

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| invoker(target)));

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(InvokeFailure::TargetMismatch { expected })) => {
            Err(InvocationError::TargetMismatch {
                method: method.id(),
                role,
                expected,
            })
        }
        Ok(Err(InvokeFailure::Raised(message))) => Err(InvocationError::Raised {
            method: method.id(),
            role,
            message,
        }),
        Err(panic) => Err(InvocationError::Panicked {
            method: method.id(),
            role,
            message: panic_message(panic.as_ref()),
        }),
    }
}

/// Extract the text of a panic payload
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
