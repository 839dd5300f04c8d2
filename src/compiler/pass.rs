//! Pass trait for module transformations.

use crate::{
    compiler::CompilerContext,
    ir::{FuncId, Module},
    Result,
};

/// A transformation over a [`Module`].
///
/// The scheduler calls [`initialize`](Self::initialize) once, then either
/// [`run_global`](Self::run_global) for global passes or
/// [`run_on_function`](Self::run_on_function) for every function that existed
/// when the pass started, in declaration order, then
/// [`finalize`](Self::finalize). Functions a pass appends while running are
/// not visited in the same run.
///
/// Events should be recorded directly to `ctx.events`.
pub trait ModulePass: Send {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Should this pass run on a specific function?
    ///
    /// Called before `run_on_function`. Override to skip functions that
    /// don't need this pass.
    fn should_run(&self, _func: FuncId, _module: &Module, _ctx: &CompilerContext) -> bool {
        true
    }

    /// Run the pass on a single function.
    ///
    /// Returns `true` if the module changed, `false` otherwise.
    ///
    /// # Arguments
    ///
    /// * `module` - The module being transformed.
    /// * `func` - The function to process.
    /// * `ctx` - The compiler context.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the function.
    fn run_on_function(
        &mut self,
        _module: &mut Module,
        _func: FuncId,
        _ctx: &mut CompilerContext,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Run on the entire module.
    ///
    /// Override this for passes that need to see all functions at once.
    /// Returns `true` if the module changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the module.
    fn run_global(&mut self, _module: &mut Module, _ctx: &mut CompilerContext) -> Result<bool> {
        Ok(false)
    }

    /// Does this pass operate globally?
    ///
    /// Global passes have their `run_global` called instead of
    /// iterating over functions with `run_on_function`.
    fn is_global(&self) -> bool {
        false
    }

    /// Called once before the pass runs.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    fn initialize(&mut self, _module: &Module, _ctx: &mut CompilerContext) -> Result<()> {
        Ok(())
    }

    /// Called once after the pass completes.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails.
    fn finalize(&mut self, _module: &Module, _ctx: &mut CompilerContext) -> Result<()> {
        Ok(())
    }

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
