//! Class and Method Descriptors
//!
//! Rust has no runtime reflection, so a benchmarked type describes itself:
//! a `ClassDescriptor` lists the type's methods together with their
//! visibility, shape, lifecycle roles, and a type-erased invoker. Descriptors
//! are normally generated by `#[bench_class]`, but can be built by hand with
//! [`ClassDescriptor::builder`].

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Identity of a benchmarked type
#[derive(Debug, Clone, Copy)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    /// Identity of `T`, displayed as `name`
    pub fn of<T: Any>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Underlying type identity
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Whether `instance` is of this class
    pub fn is_instance(&self, instance: &dyn Any) -> bool {
        instance.type_id() == self.type_id
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of a method: declaring class plus method name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    /// Declaring class
    pub class: ClassId,
    /// Method name, unique within the class
    pub name: &'static str,
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.name)
    }
}

/// Lifecycle role a method can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The benchmark itself
    Bench,
    /// Excluded from benchmarking
    Skip,
    /// Runs once before the first benchmark of the class
    BeforeFirstRun,
    /// Runs before every benchmark invocation
    BeforeEachRun,
    /// Runs after every benchmark invocation
    AfterEachRun,
    /// Runs once on the first after-hook pass of the class
    AfterLastRun,
}

impl Role {
    /// The four lifecycle hook roles
    pub const HOOKS: [Role; 4] = [
        Role::BeforeFirstRun,
        Role::BeforeEachRun,
        Role::AfterEachRun,
        Role::AfterLastRun,
    ];

    /// Attribute spelling of the role
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Bench => "bench",
            Role::Skip => "skip_bench",
            Role::BeforeFirstRun => "before_first_run",
            Role::BeforeEachRun => "before_each_run",
            Role::AfterEachRun => "after_each_run",
            Role::AfterLastRun => "after_last_run",
        }
    }

    /// Whether this is one of the lifecycle hook roles
    pub fn is_hook(self) -> bool {
        Self::HOOKS.contains(&self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method visibility as declared in source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// `pub`
    #[default]
    Public,
    /// `pub(crate)`, `pub(super)`, `pub(in ...)`
    Restricted,
    /// No visibility qualifier
    Private,
}

/// Return type shape of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnShape {
    /// `()`
    #[default]
    Unit,
    /// `Result<(), E>`; `Err` counts as a raised failure
    Fallible,
    /// Any other return type, named for diagnostics
    Value(&'static str),
}

/// Failure reported by a type-erased invoker
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeFailure {
    /// The target instance is not of the method's declaring type.
    #[error("target is not a `{expected}`")]
    TargetMismatch {
        /// Expected type name
        expected: &'static str,
    },

    /// The method ran and returned an error.
    #[error("{0}")]
    Raised(String),
}

impl InvokeFailure {
    /// Wrap an error returned by the invoked method
    pub fn raised(error: impl fmt::Display) -> Self {
        InvokeFailure::Raised(error.to_string())
    }
}

/// Type-erased call of a zero-argument method on a target instance
pub type Invoker = fn(&mut dyn Any) -> Result<(), InvokeFailure>;

/// Downcast an invocation target to the declaring type
pub fn downcast_target<T: Any>(target: &mut dyn Any) -> Result<&mut T, InvokeFailure> {
    target
        .downcast_mut::<T>()
        .ok_or(InvokeFailure::TargetMismatch {
            expected: std::any::type_name::<T>(),
        })
}

/// Descriptor of one method of a benchmarked type
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    owner: ClassId,
    name: &'static str,
    visibility: Visibility,
    params: usize,
    returns: ReturnShape,
    roles: Vec<Role>,
    runs: Option<u32>,
    invoker: Option<Invoker>,
}

impl MethodDescriptor {
    /// Public, zero-parameter, unit-returning method with no roles and no invoker
    pub fn new(owner: ClassId, name: &'static str) -> Self {
        Self {
            owner,
            name,
            visibility: Visibility::Public,
            params: 0,
            returns: ReturnShape::Unit,
            roles: Vec::new(),
            runs: None,
            invoker: None,
        }
    }

    /// Set the declared visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the number of parameters besides the receiver
    pub fn params(mut self, params: usize) -> Self {
        self.params = params;
        self
    }

    /// Set the return shape
    pub fn returns(mut self, returns: ReturnShape) -> Self {
        self.returns = returns;
        self
    }

    /// Add a lifecycle role
    pub fn role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Override the number of repetitions for this benchmark
    pub fn runs(mut self, runs: u32) -> Self {
        self.runs = Some(runs);
        self
    }

    /// Attach the invoker
    pub fn invoker(mut self, invoker: Invoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Declaring class
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// Method name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Identity of this method
    pub fn id(&self) -> MethodId {
        MethodId {
            class: self.owner,
            name: self.name,
        }
    }

    /// Declared visibility
    pub fn declared_visibility(&self) -> Visibility {
        self.visibility
    }

    /// Parameters besides the receiver
    pub fn param_count(&self) -> usize {
        self.params
    }

    /// Return shape
    pub fn return_shape(&self) -> ReturnShape {
        self.returns
    }

    /// Lifecycle roles carried by the method
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Whether the method carries `role`
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Per-method repetition override
    pub fn run_count(&self) -> Option<u32> {
        self.runs
    }

    /// Type-erased invoker, if the method is callable without arguments
    pub fn get_invoker(&self) -> Option<Invoker> {
        self.invoker
    }
}

/// Descriptor of a benchmarked type
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    id: ClassId,
    factory: fn() -> Box<dyn Any + Send>,
    methods: Vec<MethodDescriptor>,
    runs: Option<u32>,
    bench_all: bool,
}

fn new_instance<T: Any + Send + Default>() -> Box<dyn Any + Send> {
    Box::new(T::default())
}

impl ClassDescriptor {
    /// Start describing `T`
    pub fn builder<T: Any + Send + Default>(name: &'static str) -> ClassBuilder {
        ClassBuilder {
            descriptor: ClassDescriptor {
                id: ClassId::of::<T>(name),
                factory: new_instance::<T>,
                methods: Vec::new(),
                runs: None,
                bench_all: false,
            },
        }
    }

    /// Class identity
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Methods in declaration order
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Methods carrying `role`, in declaration order
    pub fn methods_with_role(&self, role: Role) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().filter(move |m| m.has_role(role))
    }

    /// Class-wide repetition count
    pub fn runs(&self) -> Option<u32> {
        self.runs
    }

    /// Whether every public unmarked method counts as a benchmark
    pub fn bench_all(&self) -> bool {
        self.bench_all
    }

    /// Whether `method` is selected as a benchmark of this class.
    ///
    /// Skipped methods never are. Explicitly marked methods always are. With
    /// `bench_all`, public methods carrying no role are too.
    pub fn is_benchmark(&self, method: &MethodDescriptor) -> bool {
        if method.has_role(Role::Skip) {
            return false;
        }
        if method.has_role(Role::Bench) {
            return true;
        }
        self.bench_all && method.visibility == Visibility::Public && method.roles.is_empty()
    }

    /// Fresh default instance of the class
    pub fn instantiate(&self) -> Box<dyn Any + Send> {
        (self.factory)()
    }
}

/// Builder for [`ClassDescriptor`]
#[derive(Debug)]
pub struct ClassBuilder {
    descriptor: ClassDescriptor,
}

impl ClassBuilder {
    /// Class-wide repetition count
    pub fn runs(mut self, runs: u32) -> Self {
        self.descriptor.runs = Some(runs);
        self
    }

    /// Treat every public unmarked method as a benchmark
    pub fn bench_all(mut self, bench_all: bool) -> Self {
        self.descriptor.bench_all = bench_all;
        self
    }

    /// Add a method declared on this class
    pub fn method(
        mut self,
        name: &'static str,
        configure: impl FnOnce(MethodDescriptor) -> MethodDescriptor,
    ) -> Self {
        let method = configure(MethodDescriptor::new(self.descriptor.id, name));
        self.descriptor.methods.push(method);
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

/// A type that can be benchmarked
pub trait BenchClass: Any + Send + Default {
    /// Descriptor of this type
    fn descriptor() -> &'static ClassDescriptor;
}
