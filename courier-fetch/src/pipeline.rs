//! Sequential transform pipeline.
//!
//! A [`Pipeline`] applies an ordered list of [`Step`]s to a value. Each step
//! receives the output of the previous one and may suspend for I/O. The
//! first failing step aborts the run; later steps never see the value and
//! nothing done so far is rolled back.

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::error::ExchangeError;

// ============================================================================
// Step Trait
// ============================================================================

/// One transform in a pipeline.
#[async_trait]
pub trait Step<T: Send + 'static>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Transforms the value or aborts the pipeline.
    async fn apply(&self, input: T) -> Result<T, ExchangeError>;
}

// ============================================================================
// Pipeline
// ============================================================================

/// An ordered list of steps.
pub struct Pipeline<T: Send + 'static> {
    label: &'static str,
    steps: Vec<Box<dyn Step<T>>>,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Creates an empty pipeline.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            steps: Vec::new(),
        }
    }

    /// Creates a pipeline with the given steps, in order.
    pub fn with_steps(label: &'static str, steps: Vec<Box<dyn Step<T>>>) -> Self {
        Self { label, steps }
    }

    /// Appends a step.
    pub fn push(&mut self, step: impl Step<T> + 'static) {
        self.steps.push(Box::new(step));
    }

    /// Appends a step, builder style.
    #[must_use]
    pub fn then(mut self, step: impl Step<T> + 'static) -> Self {
        self.push(step);
        self
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step in order.
    #[instrument(skip(self, input), fields(pipeline = self.label, steps = self.steps.len()))]
    pub async fn run(&self, input: T) -> Result<T, ExchangeError> {
        let mut value = input;
        for step in &self.steps {
            trace!(step = step.name(), "Applying step");
            value = match step.apply(value).await {
                Ok(value) => value,
                Err(e) => {
                    debug!(step = step.name(), error = %e, "Step aborted pipeline");
                    return Err(e);
                }
            };
        }
        Ok(value)
    }
}

impl<T: Send + 'static> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("label", &self.label)
            .field("steps", &self.step_names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
