//! Function memoization pass.
//!
//! For every function of the module, in declaration order, the pass asks the
//! [`EligibilityClassifier`] for a verdict. Approved functions with call sites
//! get a `_memoized__<name>` entry point with a canonical parameter list, all
//! their calls are redirected to it by the [`CallSiteRewriter`], and one
//! [`MemoDescriptor`](crate::metadata::MemoDescriptor) is emitted through the
//! [`CompilerContext`].
//!
//! Entry points synthesized during a run are not visited by that run. Running
//! the pass again is stable: entry points are recognized by name and never
//! rewritten, and the original functions have no call sites left.
//!
//! # Example
//!
//! ```rust
//! use memoscope::compiler::{CompilerContext, MemoizePass};
//! use memoscope::ir::{Function, FunctionBuilder, IrType, Module, Parameter, Value};
//!
//! # fn main() -> memoscope::Result<()> {
//! let mut module = Module::new("unit");
//! let sq = module.add_function(Function::new(
//!     "sq",
//!     vec![Parameter::new("x", IrType::i32())],
//!     IrType::i32(),
//! ))?;
//! FunctionBuilder::define(&mut module, sq, |b| {
//!     b.block("entry");
//!     let x = b.arg(0);
//!     let v = b.mul(x.clone(), x);
//!     b.ret(v);
//! })?;
//! let main = module.add_function(Function::new("main", Vec::new(), IrType::i32()))?;
//! FunctionBuilder::define(&mut module, main, |b| {
//!     b.block("entry");
//!     let v = b.call(sq, vec![Value::i32(5)]);
//!     b.ret(v);
//! })?;
//!
//! let mut ctx = CompilerContext::new();
//! let report = MemoizePass::new().run_on_module(&mut module, &mut ctx)?;
//!
//! assert_eq!(report.memoized_count(), 1);
//! assert!(module.function_by_name("_memoized__sq").is_some());
//! assert_eq!(ctx.descriptors()[0].constant_key_fragments, vec!["5"]);
//! # Ok(())
//! # }
//! ```

mod classifier;
mod rewriter;
mod signature;

pub use classifier::{Approval, ApprovalBasis, EligibilityClassifier, Rejection, Verdict};
pub use rewriter::{CallSiteRewriter, RewriteOutcome};
pub use signature::{ArrangedCall, CanonicalSignature, CanonicalSlot, Slot};

use tracing::{debug, info};

use crate::{
    analysis::{AttributeOracle, PurityOracle},
    compiler::{config::MemoizeConfig, events::EventKind, pass::ModulePass, CompilerContext},
    ir::{FuncId, Function, Module},
    Result,
};

/// What happened to one function.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Rejected(Rejection),
    Unchanged,
    Rewritten(RewriteOutcome),
}

/// Summary of one [`MemoizePass::run_on_module`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoizeReport {
    /// Functions visited, in declaration order.
    pub visited: Vec<FuncId>,
    /// Functions approved but left unchanged (already memoized or uncalled).
    pub unchanged: Vec<FuncId>,
    /// Rejected functions with their reasons.
    pub rejected: Vec<(FuncId, Rejection)>,
    /// Successful rewrites.
    pub rewritten: Vec<RewriteOutcome>,
}

impl MemoizeReport {
    /// Returns the number of functions whose calls were redirected.
    #[must_use]
    pub fn memoized_count(&self) -> usize {
        self.rewritten.len()
    }

    /// Returns `true` if the module was modified.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.rewritten.is_empty()
    }

    /// Returns the rejection recorded for `func`.
    #[must_use]
    pub fn rejection(&self, func: FuncId) -> Option<&Rejection> {
        self.rejected
            .iter()
            .find(|(id, _)| *id == func)
            .map(|(_, rejection)| rejection)
    }
}

/// Classifies and rewrites every function of a module.
pub struct MemoizePass {
    config: MemoizeConfig,
    oracle: Box<dyn PurityOracle>,
}

impl Default for MemoizePass {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoizePass {
    /// Creates a pass with the default configuration, trusting function
    /// attributes for purity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MemoizeConfig::default())
    }

    /// Creates a pass with a custom configuration.
    #[must_use]
    pub fn with_config(config: MemoizeConfig) -> Self {
        Self {
            config,
            oracle: Box::new(AttributeOracle),
        }
    }

    /// Replaces the purity oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Box<dyn PurityOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MemoizeConfig {
        &self.config
    }

    /// Runs the pass over every function present when the call starts.
    ///
    /// # Errors
    ///
    /// Stops at the first rewrite or sink error. Functions processed before
    /// the failure stay rewritten; the failing function is left unchanged.
    pub fn run_on_module(&self, module: &mut Module, ctx: &mut CompilerContext) -> Result<MemoizeReport> {
        info!(module = module.name(), oracle = self.oracle.name(), "memoize");

        let mut report = MemoizeReport::default();
        let functions: Vec<FuncId> = module.function_ids().collect();
        for func in functions {
            report.visited.push(func);
            match self.process(module, func, ctx)? {
                Step::Rejected(rejection) => report.rejected.push((func, rejection)),
                Step::Unchanged => report.unchanged.push(func),
                Step::Rewritten(outcome) => report.rewritten.push(outcome),
            }
        }
        ctx.flush()?;
        Ok(report)
    }

    fn process(&self, module: &mut Module, func: FuncId, ctx: &mut CompilerContext) -> Result<Step> {
        let name = module.function(func).map_or("?", Function::name);
        debug!(function = name, "visiting");
        ctx.events
            .record(EventKind::FunctionVisited)
            .function(func)
            .pass(self.name())
            .message(name);

        let verdict = EligibilityClassifier::new(module, &self.config, self.oracle.as_ref())
            .with_events(&ctx.events)
            .classify(func);
        let approval = match verdict {
            Ok(approval) => approval,
            Err(rejection) => return Ok(Step::Rejected(rejection)),
        };

        let outcome = CallSiteRewriter::new(&self.config)
            .with_events(&ctx.events)
            .rewrite(module, &approval)?;
        let Some(outcome) = outcome else {
            return Ok(Step::Unchanged);
        };

        ctx.emit(outcome.memoized, outcome.descriptor.clone())?;
        Ok(Step::Rewritten(outcome))
    }
}

impl ModulePass for MemoizePass {
    fn name(&self) -> &'static str {
        "memoize"
    }

    fn description(&self) -> &'static str {
        "Redirects calls of memoizable functions to canonical memoized entry points"
    }

    fn initialize(&mut self, module: &Module, _ctx: &mut CompilerContext) -> Result<()> {
        info!(module = module.name(), oracle = self.oracle.name(), "memoize");
        Ok(())
    }

    fn run_on_function(&mut self, module: &mut Module, func: FuncId, ctx: &mut CompilerContext) -> Result<bool> {
        Ok(matches!(self.process(module, func, ctx)?, Step::Rewritten(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::PassScheduler,
        metadata::CollectingSink,
        test::AddScenario,
    };

    #[test]
    fn test_report_tracks_every_function() -> Result<()> {
        let AddScenario { mut module, add, caller, .. } = AddScenario::build()?;
        let mut ctx = CompilerContext::new();
        let report = MemoizePass::new().run_on_module(&mut module, &mut ctx)?;

        assert_eq!(report.visited.len(), 2);
        assert_eq!(report.memoized_count(), 1);
        assert_eq!(report.rewritten[0].function, add);
        assert!(report.unchanged.contains(&caller));
        assert!(report.rejection(caller).is_none());
        assert_eq!(ctx.descriptors().len(), 1);
        assert_eq!(ctx.events.count_kind(EventKind::FunctionVisited), 2);
        assert!(ctx.events.has(EventKind::FunctionSynthesized));
        Ok(())
    }

    #[test]
    fn test_scheduled_to_fixpoint() -> Result<()> {
        let AddScenario { mut module, .. } = AddScenario::build()?;
        let mut scheduler = PassScheduler::new(5, 1);
        scheduler.add_pass(Box::new(MemoizePass::new()));
        let mut ctx = CompilerContext::with_sink(Box::new(CollectingSink::new()));

        let iterations = scheduler.run_pipeline(&mut module, &mut ctx)?;
        assert_eq!(iterations, 2);
        assert_eq!(ctx.descriptors().len(), 1);
        // Seen through `main`'s call in both iterations and visited once.
        assert_eq!(ctx.events.count_kind(EventKind::AlreadyMemoized), 3);

        let stats = ctx.stats();
        assert_eq!(stats.functions_synthesized, 1);
        assert_eq!(stats.call_sites_rewritten, 1);
        assert_eq!(stats.constants_folded, 1);
        assert_eq!(stats.descriptors_emitted, 1);
        assert_eq!(stats.already_memoized, 3);
        Ok(())
    }
}
