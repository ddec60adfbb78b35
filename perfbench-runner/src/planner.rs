//! Benchmark Planner
//!
//! Builds the execution plan by filtering elements and grouping them by
//! declaring class. The filter is applied first: classes are ordered by
//! their first element that passes it, and elements keep their input order
//! within a class, so runs are deterministic.

use crate::element::BenchmarkElement;
use perfbench_core::ClassDescriptor;

/// Elements of one class, in run order
#[derive(Debug, Clone)]
pub struct ClassPlan {
    /// Declaring class
    pub class: &'static ClassDescriptor,
    /// Elements to run
    pub elements: Vec<BenchmarkElement>,
}

/// Execution plan for a run
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Classes in first-seen order
    pub classes: Vec<ClassPlan>,
}

impl ExecutionPlan {
    /// Every planned element, class by class
    pub fn elements(&self) -> impl Iterator<Item = &BenchmarkElement> {
        self.classes.iter().flat_map(|c| c.elements.iter())
    }
}

/// Build the execution plan from benchmark elements
///
/// Keeps elements whose `Class::method` id matches `filter`.
pub fn build_plan(
    elements: impl IntoIterator<Item = BenchmarkElement>,
    filter: Option<&regex::Regex>,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::default();

    for element in elements {
        if let Some(re) = filter {
            if !re.is_match(&element.id()) {
                continue;
            }
        }

        let class = element.class();
        match plan
            .classes
            .iter_mut()
            .find(|c| c.class.id() == class.id())
        {
            Some(entry) => entry.elements.push(element),
            None => plan.classes.push(ClassPlan {
                class,
                elements: vec![element],
            }),
        }
    }

    plan
}
