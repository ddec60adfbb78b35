//! Integration tests for perfbench
//!
//! These tests drive `#[bench_class]` types through the executor, the run
//! context and the runner.

use perfbench::{
    BenchClass, BenchContext, BenchmarkElement, CheckError, CountingMeter, ElementError,
    ElementFailure, InvocationError, Meter, MeterError, MeterKey, MeterSet, MethodError, Role,
    RunConfig, Runner, TimeMeter, TimeUnit, Visibility, bench_class, check_method, class,
    invoke_method,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

fn meters() -> MeterSet {
    MeterSet::new([
        Arc::new(TimeMeter::new(TimeUnit::Nanoseconds)) as Arc<dyn Meter>,
        Arc::new(CountingMeter::new()),
    ])
}

fn counter_key() -> MeterKey {
    MeterKey::new("Counter", "ticks")
}

#[derive(Default)]
struct Lifecycle {
    before_first: u32,
    before_each: u32,
    benched: u32,
    after_each: u32,
    after_last: u32,
}

#[bench_class]
impl Lifecycle {
    #[before_first_run]
    pub fn before_first(&mut self) {
        self.before_first += 1;
    }

    #[before_each_run]
    pub fn before_each(&mut self) {
        self.before_each += 1;
    }

    #[bench]
    pub fn bench(&mut self) {
        self.benched += 1;
    }

    #[bench]
    pub fn bench_again(&mut self) {
        self.benched += 1;
    }

    #[after_each_run]
    pub fn after_each(&mut self) {
        self.after_each += 1;
    }

    #[after_last_run]
    pub fn after_last(&mut self) {
        self.after_last += 1;
    }
}

#[derive(Default)]
struct Other;

#[bench_class(name = "Renamed")]
impl Other {
    #[bench]
    pub fn bench(&self) {}
}

/// Methods of every shape the validator distinguishes
#[derive(Default)]
struct Shapes {
    touched: bool,
}

#[bench_class(runs = 5)]
impl Shapes {
    #[bench]
    pub fn plain(&mut self) {
        self.touched = true;
    }

    #[bench(runs = 2)]
    pub fn fallible(&self) -> Result<(), String> {
        Err("input exhausted".to_string())
    }

    #[bench]
    pub fn value(&self) -> u64 {
        42
    }

    #[bench]
    pub fn with_arg(&mut self, amount: u32) {
        self.touched = amount > 0;
    }

    #[bench]
    fn hidden(&mut self) {
        self.touched = true;
    }

    #[bench]
    pub fn explode(&mut self) {
        panic!("boom");
    }

    #[skip_bench]
    pub fn skipped(&mut self) {}

    pub fn helper(&self) {}
}

#[test]
fn test_macro_records_method_shapes() {
    let desc = class::<Shapes>();

    assert_eq!(desc.name(), "Shapes");
    assert_eq!(desc.runs(), Some(5));
    assert!(!desc.bench_all());
    let names: Vec<_> = desc.methods().iter().map(|m| m.name()).collect();
    assert_eq!(
        names,
        vec!["plain", "fallible", "value", "with_arg", "hidden", "explode", "skipped", "helper"]
    );

    let fallible = desc.method("fallible").unwrap();
    assert_eq!(fallible.run_count(), Some(2));
    assert_eq!(fallible.return_shape(), perfbench::ReturnShape::Fallible);
    assert_eq!(
        desc.method("value").unwrap().return_shape(),
        perfbench::ReturnShape::Value("u64")
    );
    assert_eq!(desc.method("with_arg").unwrap().param_count(), 1);
    assert_eq!(
        desc.method("hidden").unwrap().declared_visibility(),
        Visibility::Private
    );
    assert!(desc.method("skipped").unwrap().has_role(Role::Skip));
    assert!(!desc.is_benchmark(desc.method("helper").unwrap()));
    assert_eq!(class::<Other>().name(), "Renamed");
}

#[test]
fn test_get_executor_shared_per_class() {
    let ctx = BenchContext::initialize(meters());
    let first = BenchmarkElement::new(Lifecycle::descriptor(), "bench").unwrap();
    let second = BenchmarkElement::new(Lifecycle::descriptor(), "bench_again").unwrap();
    let other = BenchmarkElement::new(Other::descriptor(), "bench").unwrap();

    let a = ctx.get_executor(&first);
    let b = ctx.get_executor(&second);
    let c = ctx.get_executor(&other);

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_execute_before_methods() {
    let ctx = BenchContext::initialize(meters());
    let element = BenchmarkElement::new(Lifecycle::descriptor(), "bench").unwrap();
    let executor = ctx.get_executor(&element);
    let mut instance = Lifecycle::default();

    executor.execute_before_methods(&mut instance).unwrap();
    executor.execute_before_methods(&mut instance).unwrap();

    assert_eq!(instance.before_first, 1);
    assert_eq!(instance.before_each, 2);
    assert_eq!(instance.after_last + instance.after_each, 0);
}

#[test]
fn test_execute_after_methods() {
    let ctx = BenchContext::initialize(meters());
    let element = BenchmarkElement::new(Lifecycle::descriptor(), "bench").unwrap();
    let executor = ctx.get_executor(&element);
    let mut instance = Lifecycle::default();

    executor.execute_after_methods(&mut instance).unwrap();
    // The once-only after hook fires on the first call
    assert_eq!(instance.after_last, 1);
    assert!(executor.after_last_done());

    executor.execute_after_methods(&mut instance).unwrap();
    assert_eq!(instance.after_last, 1);
    assert_eq!(instance.after_each, 2);
}

#[test]
fn test_execute_bench_builds_result_tree() {
    let meters = meters();
    let ctx = BenchContext::initialize(meters.clone());
    let element = BenchmarkElement::new(Lifecycle::descriptor(), "bench").unwrap();
    let executor = ctx.get_executor(&element);
    let mut instance = Lifecycle::default();

    executor.execute_bench(&element, &mut instance).unwrap();

    assert_eq!(instance.benched, 1);
    let result = ctx.into_result();
    assert_eq!(result.meters(), &meters);
    assert_eq!(result.class_results().len(), 1);

    let class_result = &result.class_results()[0];
    assert_eq!(class_result.class(), Lifecycle::descriptor().id());
    assert_eq!(class_result.meters(), &meters);
    assert_eq!(class_result.method_results().len(), 1);

    let method_result = &class_result.method_results()[0];
    assert_eq!(method_result.method().to_string(), "Lifecycle::bench");
    assert_eq!(method_result.meters(), &meters);
    assert_eq!(method_result.samples(&counter_key()), &[1.0]);
    assert_eq!(method_result.samples(&MeterKey::new("Time", "ns")).len(), 1);
}

#[test]
fn test_execute_bench_surfaces_invocation_errors() {
    let ctx = BenchContext::initialize(meters());
    let element = BenchmarkElement::new(Shapes::descriptor(), "fallible").unwrap();
    let executor = ctx.get_executor(&element);
    let mut instance = Shapes::default();

    let err = executor.execute_bench(&element, &mut instance).unwrap_err();

    assert!(matches!(
        err,
        MethodError::Invocation(InvocationError::Raised { ref message, .. })
            if message == "input exhausted"
    ));
    let result = ctx.into_result();
    let node = result.method_result(&element.method().id()).unwrap();
    assert_eq!(node.invocations(), 0);
    assert_eq!(node.failed_invocations(), 1);
    assert_eq!(result.failures().len(), 1);
    assert_eq!(result.failures()[0].role, Role::Bench);
}

#[test]
fn test_execute_bench_records_rejected_instance() {
    let ctx = BenchContext::initialize(meters());
    let element = BenchmarkElement::new(Lifecycle::descriptor(), "bench").unwrap();
    let executor = ctx.get_executor(&element);
    let mut stranger = Other;

    let err = executor.execute_bench(&element, &mut stranger).unwrap_err();

    assert!(matches!(err, MethodError::Check(CheckError::NotOwned { .. })));
    let result = ctx.into_result();
    let node = result.method_result(&element.method().id()).unwrap();
    assert_eq!(node.invocations(), 0);
    assert_eq!(node.failed_invocations(), 1);
    assert!(node.samples(&counter_key()).is_empty());
    assert_eq!(result.failures().len(), 1);
}

#[test]
fn test_check_method() {
    let shapes = Shapes::descriptor();
    let instance = Shapes::default();
    let stranger = Other;

    assert_eq!(
        check_method(&instance, shapes.method("plain").unwrap(), Role::Bench),
        Ok(())
    );
    assert!(matches!(
        check_method(&stranger, shapes.method("plain").unwrap(), Role::Bench),
        Err(CheckError::NotOwned { .. })
    ));
    assert!(matches!(
        check_method(&instance, shapes.method("value").unwrap(), Role::Bench),
        Err(CheckError::ReturnsValue { ty: "u64", .. })
    ));
    assert!(matches!(
        check_method(&instance, shapes.method("with_arg").unwrap(), Role::Bench),
        Err(CheckError::HasParameters { count: 1, .. })
    ));
    assert!(matches!(
        check_method(&instance, shapes.method("hidden").unwrap(), Role::Bench),
        Err(CheckError::NotPublic { .. })
    ));
}

#[test]
fn test_invoke_method() {
    let shapes = Shapes::descriptor();
    let mut instance = Shapes::default();

    invoke_method(&mut instance, shapes.method("plain").unwrap(), Role::Bench).unwrap();
    assert!(instance.touched);
    // Callable directly, but not through the descriptor
    instance.with_arg(0);
    assert!(!instance.touched);

    assert!(matches!(
        invoke_method(&mut instance, shapes.method("explode").unwrap(), Role::Bench),
        Err(InvocationError::Panicked { ref message, .. }) if message == "boom"
    ));
    assert!(matches!(
        invoke_method(&mut instance, shapes.method("with_arg").unwrap(), Role::Bench),
        Err(InvocationError::NotInvocable { .. })
    ));
}

#[test]
fn test_element_rejections() {
    let shapes = Shapes::descriptor();

    assert!(matches!(
        BenchmarkElement::new(shapes, "skipped"),
        Err(ElementError::Skipped { .. })
    ));
    assert!(matches!(
        BenchmarkElement::new(shapes, "helper"),
        Err(ElementError::NotABenchmark { .. })
    ));
    assert!(matches!(
        BenchmarkElement::new(shapes, "value"),
        Err(ElementError::InvalidMethod(CheckError::ReturnsValue { .. }))
    ));
}

#[derive(Default)]
struct Everything {
    hits: u32,
}

#[bench_class(bench_all = true)]
impl Everything {
    pub fn first(&mut self) {
        self.hits += 1;
    }

    pub fn second(&mut self) {
        self.hits += 1;
    }

    #[skip_bench]
    pub fn skipped(&mut self) {}

    #[before_each_run]
    pub fn reset(&mut self) {
        self.hits = 0;
    }

    fn private_helper(&self) -> u32 {
        self.hits
    }

    pub fn assoc() {}
}

#[test]
fn test_bench_all_selects_public_unmarked_methods() {
    let desc = class::<Everything>();
    let benchmarks: Vec<_> = desc
        .methods()
        .iter()
        .filter(|m| desc.is_benchmark(m))
        .map(|m| m.name())
        .collect();

    assert_eq!(benchmarks, vec!["first", "second", "assoc"]);
    let mut instance = Everything { hits: 3 };
    assert_eq!(instance.private_helper(), 3);
    invoke_method(&mut instance, desc.method("assoc").unwrap(), Role::Bench).unwrap();
}

static SUITE_BEFORE_FIRST: AtomicU32 = AtomicU32::new(0);
static SUITE_BEFORE_EACH: AtomicU32 = AtomicU32::new(0);
static SUITE_BENCH: AtomicU32 = AtomicU32::new(0);
static SUITE_AFTER_LAST: AtomicU32 = AtomicU32::new(0);

#[derive(Default)]
struct Suite;

#[bench_class(runs = 3)]
impl Suite {
    #[before_first_run]
    pub fn setup(&mut self) {
        SUITE_BEFORE_FIRST.fetch_add(1, Ordering::SeqCst);
    }

    #[before_each_run]
    pub fn prepare(&mut self) {
        SUITE_BEFORE_EACH.fetch_add(1, Ordering::SeqCst);
    }

    #[bench]
    pub fn work(&mut self) {
        SUITE_BENCH.fetch_add(1, Ordering::SeqCst);
    }

    #[after_last_run]
    pub fn teardown(&mut self) {
        SUITE_AFTER_LAST.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_runner_end_to_end() {
    let runner = Runner::new(RunConfig::default(), meters());

    let outcome = runner.run(&[class::<Suite>()]).unwrap();

    assert!(outcome.failures.is_empty());
    assert_eq!(SUITE_BEFORE_FIRST.load(Ordering::SeqCst), 1);
    assert_eq!(SUITE_BEFORE_EACH.load(Ordering::SeqCst), 3);
    assert_eq!(SUITE_BENCH.load(Ordering::SeqCst), 3);
    assert_eq!(SUITE_AFTER_LAST.load(Ordering::SeqCst), 1);

    let work = Suite::descriptor().method("work").unwrap().id();
    let node = outcome.result.method_result(&work).unwrap();
    assert_eq!(node.invocations(), 3);
    assert_eq!(node.samples(&counter_key()), &[1.0, 1.0, 1.0]);
}

#[test]
fn test_runner_collects_failures_per_element() {
    let runner = Runner::new(
        RunConfig {
            filter: Some("^Shapes::".to_string()),
            ..RunConfig::default()
        },
        meters(),
    );

    let outcome = runner.run(&[class::<Shapes>(), class::<Lifecycle>()]).unwrap();

    let invalid: Vec<_> = outcome
        .failures
        .iter()
        .filter(|f| matches!(f, ElementFailure::Invalid { .. }))
        .map(|f| f.element().to_string())
        .collect();
    assert_eq!(
        invalid,
        vec!["Shapes::value", "Shapes::with_arg", "Shapes::hidden"]
    );

    let failed: Vec<_> = outcome
        .failures
        .iter()
        .filter(|f| matches!(f, ElementFailure::Failed { .. }))
        .map(|f| f.element().to_string())
        .collect();
    // fallible runs twice, explode uses the class default of five
    assert_eq!(failed.iter().filter(|e| *e == "Shapes::fallible").count(), 2);
    assert_eq!(failed.iter().filter(|e| *e == "Shapes::explode").count(), 5);

    let plain = Shapes::descriptor().method("plain").unwrap().id();
    assert_eq!(outcome.result.method_result(&plain).unwrap().invocations(), 5);
    assert!(outcome.result.class_result(&Lifecycle::descriptor().id()).is_none());
}

#[derive(Debug)]
struct FlakyMeter;

impl Meter for FlakyMeter {
    fn name(&self) -> &str {
        "Flaky"
    }

    fn unit(&self) -> &str {
        "units"
    }

    fn unit_description(&self) -> &str {
        "never produces a reading"
    }

    fn value(&self) -> Result<f64, MeterError> {
        Err(MeterError::Failed {
            meter: "Flaky".to_string(),
            message: "sensor offline".to_string(),
        })
    }
}

#[test]
fn test_meter_failure_does_not_fail_bench() {
    let meters = MeterSet::new([
        Arc::new(CountingMeter::new()) as Arc<dyn Meter>,
        Arc::new(FlakyMeter),
    ]);
    let ctx = BenchContext::initialize(meters);
    let element = BenchmarkElement::new(Lifecycle::descriptor(), "bench").unwrap();
    let mut instance = Lifecycle::default();

    ctx.get_executor(&element)
        .execute_bench(&element, &mut instance)
        .unwrap();

    assert_eq!(instance.benched, 1);
    let result = ctx.into_result();
    let node = result.method_result(&element.method().id()).unwrap();
    assert_eq!(node.invocations(), 1);
    assert_eq!(node.samples(&counter_key()), &[1.0]);
    assert!(node.samples(&FlakyMeter.key()).is_empty());
    assert_eq!(node.meter_failures().len(), 1);
    assert_eq!(node.meter_failures()[0].meter, FlakyMeter.key());
}
