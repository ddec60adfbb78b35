//! Benchmark Elements
//!
//! An element pairs one benchmark method with its declaring class and the
//! lifecycle hooks resolved from that class. Resolution happens once, at
//! construction.

use perfbench_core::{CheckError, ClassDescriptor, MethodDescriptor, Role, check_shape};
use thiserror::Error;

/// Errors from building a benchmark element
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ElementError {
    /// The class has no method of that name.
    #[error("`{class}` has no method `{method}`")]
    UnknownMethod {
        /// Class name
        class: &'static str,
        /// Requested method
        method: String,
    },

    /// The method is marked to be skipped.
    #[error("{class}::{method} is marked skip_bench")]
    Skipped {
        /// Class name
        class: &'static str,
        /// Method name
        method: &'static str,
    },

    /// The method is not selected as a benchmark.
    #[error("{class}::{method} is not a benchmark")]
    NotABenchmark {
        /// Class name
        class: &'static str,
        /// Method name
        method: &'static str,
    },

    /// The benchmark method has an invalid shape.
    #[error("invalid benchmark method: {0}")]
    InvalidMethod(#[from] CheckError),

    /// More than one method claims a lifecycle hook role.
    #[error("`{class}` declares {role} on more than one method: {methods:?}")]
    DuplicateRole {
        /// Class name
        class: &'static str,
        /// Contested role
        role: Role,
        /// Claiming methods
        methods: Vec<&'static str>,
    },
}

/// Lifecycle hooks of a class, at most one per role
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleHooks {
    /// Runs once before the first benchmark
    pub before_first_run: Option<&'static MethodDescriptor>,
    /// Runs before every benchmark invocation
    pub before_each_run: Option<&'static MethodDescriptor>,
    /// Runs after every benchmark invocation
    pub after_each_run: Option<&'static MethodDescriptor>,
    /// Runs once, on the first after-hook pass
    pub after_last_run: Option<&'static MethodDescriptor>,
}

impl LifecycleHooks {
    /// Resolve the hooks of `class`, rejecting contested roles
    pub fn resolve(class: &'static ClassDescriptor) -> Result<Self, ElementError> {
        Ok(Self {
            before_first_run: unique(class, Role::BeforeFirstRun)?,
            before_each_run: unique(class, Role::BeforeEachRun)?,
            after_each_run: unique(class, Role::AfterEachRun)?,
            after_last_run: unique(class, Role::AfterLastRun)?,
        })
    }
}

fn unique(
    class: &'static ClassDescriptor,
    role: Role,
) -> Result<Option<&'static MethodDescriptor>, ElementError> {
    let mut claimants = class.methods_with_role(role);
    let first = claimants.next();
    let rest: Vec<_> = claimants.map(|m| m.name()).collect();

    match first {
        Some(first) if !rest.is_empty() => Err(ElementError::DuplicateRole {
            class: class.name(),
            role,
            methods: std::iter::once(first.name()).chain(rest).collect(),
        }),
        other => Ok(other),
    }
}

/// A benchmark method together with its class context
#[derive(Debug, Clone)]
pub struct BenchmarkElement {
    class: &'static ClassDescriptor,
    method: &'static MethodDescriptor,
    hooks: LifecycleHooks,
    runs: Option<u32>,
}

impl BenchmarkElement {
    /// Element for the method named `method` of `class`
    pub fn new(class: &'static ClassDescriptor, method: &str) -> Result<Self, ElementError> {
        let descriptor = class
            .method(method)
            .ok_or_else(|| ElementError::UnknownMethod {
                class: class.name(),
                method: method.to_string(),
            })?;
        Self::from_method(class, descriptor)
    }

    /// Element for a method descriptor of `class`
    pub fn from_method(
        class: &'static ClassDescriptor,
        method: &'static MethodDescriptor,
    ) -> Result<Self, ElementError> {
        if method.has_role(Role::Skip) {
            return Err(ElementError::Skipped {
                class: class.name(),
                method: method.name(),
            });
        }
        if !class.is_benchmark(method) {
            return Err(ElementError::NotABenchmark {
                class: class.name(),
                method: method.name(),
            });
        }

        check_shape(method, Role::Bench)?;
        let hooks = LifecycleHooks::resolve(class)?;

        Ok(Self {
            class,
            method,
            hooks,
            runs: method.run_count().or(class.runs()),
        })
    }

    /// Elements for every benchmark of `class`, in declaration order
    pub fn all(class: &'static ClassDescriptor) -> Vec<Result<Self, ElementError>> {
        class
            .methods()
            .iter()
            .filter(|m| class.is_benchmark(m))
            .map(|m| Self::from_method(class, m))
            .collect()
    }

    /// Declaring class
    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    /// Benchmark method
    pub fn method(&self) -> &'static MethodDescriptor {
        self.method
    }

    /// Resolved lifecycle hooks of the class
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    /// Repetitions requested by the method or its class
    pub fn runs(&self) -> Option<u32> {
        self.runs
    }

    /// `Class::method`
    pub fn id(&self) -> String {
        self.method.id().to_string()
    }
}
