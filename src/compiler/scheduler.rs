//! Pass scheduler for orchestrating module pass execution.
//!
//! The `PassScheduler` runs its passes in registration order and repeats the
//! whole sequence until the module stops changing or the iteration limit is
//! reached.

use tracing::{debug, info};

use crate::{
    compiler::{context::CompilerContext, events::EventKind, pass::ModulePass},
    ir::{FuncId, Module},
    Result,
};

/// Orchestrates module pass execution to a fixpoint.
pub struct PassScheduler {
    /// Maximum iterations for the entire pipeline.
    max_iterations: usize,
    /// Number of stable iterations before stopping.
    stable_iterations: usize,
    /// Passes in execution order.
    passes: Vec<Box<dyn ModulePass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl PassScheduler {
    /// Creates a new scheduler with the specified iteration limits.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum iterations for the entire pipeline before stopping.
    /// * `stable_iterations` - Stop early if no changes for this many iterations.
    #[must_use]
    pub fn new(max_iterations: usize, stable_iterations: usize) -> Self {
        Self {
            max_iterations,
            stable_iterations,
            passes: Vec::new(),
        }
    }

    /// Appends a pass to the pipeline.
    pub fn add_pass(&mut self, pass: Box<dyn ModulePass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Returns the registered pass names in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs one pass over the module.
    ///
    /// Per-function passes see the functions that existed when the pass
    /// started, in declaration order.
    fn run_pass(
        pass: &mut dyn ModulePass,
        module: &mut Module,
        ctx: &mut CompilerContext,
    ) -> Result<bool> {
        ctx.events
            .record(EventKind::PassStarted)
            .pass(pass.name())
            .message(format!("{}: {}", pass.name(), pass.description()));
        pass.initialize(module, ctx)?;

        let changed = if pass.is_global() {
            pass.run_global(module, ctx)?
        } else {
            let functions: Vec<FuncId> = module.function_ids().collect();
            let mut any_changed = false;
            for func in functions {
                if !pass.should_run(func, module, ctx) {
                    continue;
                }
                if pass.run_on_function(module, func, ctx)? {
                    any_changed = true;
                }
            }
            any_changed
        };

        pass.finalize(module, ctx)?;
        ctx.events
            .record(EventKind::PassCompleted)
            .pass(pass.name())
            .message(format!("{}: changed={changed}", pass.name()));
        debug!(pass = pass.name(), changed, "pass completed");
        Ok(changed)
    }

    /// Runs the pipeline until a fixpoint or the iteration limit.
    ///
    /// # Returns
    ///
    /// The number of iterations completed. Events are accumulated in `ctx.events`.
    ///
    /// # Errors
    ///
    /// Returns an error if any pass fails during execution. Changes made by
    /// earlier passes remain in the module.
    pub fn run_pipeline(&mut self, module: &mut Module, ctx: &mut CompilerContext) -> Result<usize> {
        info!(module = module.name(), passes = self.passes.len(), "running pipeline");

        let mut stable_count = 0;
        let mut iterations = 0;

        for iteration in 0..self.max_iterations {
            iterations = iteration + 1;
            let mut iteration_changed = false;

            for pass in &mut self.passes {
                if Self::run_pass(pass.as_mut(), module, ctx)? {
                    iteration_changed = true;
                }
            }

            if iteration_changed {
                stable_count = 0;
            } else {
                stable_count += 1;
                if stable_count >= self.stable_iterations {
                    break;
                }
            }
        }

        ctx.flush()?;
        let stats = ctx.stats().with_iterations(iterations);
        info!(module = module.name(), %stats, "pipeline finished");
        Ok(iterations)
    }
}
