#![warn(missing_docs)]
//! perfbench Core - Measurement and Method Plumbing
//!
//! This crate provides the building blocks the executor is assembled from:
//! - `Meter` trait and the built-in meters (time, counting, cycles, allocations)
//! - Class and method descriptors standing in for runtime reflection
//! - The method validator: structural checks and panic-safe invocation
//! - Typed errors for both

mod allocator;
mod class;
mod error;
mod measure;
mod meter;
mod validate;

pub use allocator::{TrackingAllocator, allocated_bytes, allocation_count};
pub use class::{
    BenchClass, ClassBuilder, ClassDescriptor, ClassId, InvokeFailure, Invoker, MethodDescriptor,
    MethodId, ReturnShape, Role, Visibility, downcast_target,
};
pub use error::{CheckError, InvocationError, MethodError};
/// Whether this platform provides hardware cycle counters (x86_64 RDTSCP or AArch64 CNTVCT_EL0).
/// When `false`, `CycleMeter` reports `MeterError::Unavailable`.
pub use measure::HAS_CYCLE_COUNTER;
pub use meter::{
    AllocationMeter, CountingMeter, CycleMeter, Meter, MeterError, MeterKey, MeterSet, TimeMeter,
    TimeUnit,
};
pub use validate::{check_method, check_shape, invoke_method, panic_message};
