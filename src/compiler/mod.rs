//! Pass infrastructure and the memoization pass.
//!
//! This module sits between the program representation and the downstream
//! cache generator:
//!
//! - [`crate::ir`] - functions, blocks, instructions and values
//! - [`compiler`](self) - passes that rewrite a [`Module`](crate::ir::Module)
//! - [`crate::metadata`] - descriptors handed to the cache generator
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilerContext              State shared by passes             │
//! │    ├─ EventLog                (visits, verdicts, rewrites)       │
//! │    ├─ Descriptors             (emitted so far)                   │
//! │    └─ MetadataSink            (optional downstream consumer)     │
//! │                                                                  │
//! │  PassScheduler               Fixpoint execution                  │
//! │    Each iteration: run every pass, stop when stable              │
//! │                                                                  │
//! │  ModulePass trait            Interface for all passes            │
//! │    ├─ run_on_function()       Per-function transformation        │
//! │    ├─ run_global()            Whole-module transformation        │
//! │    ├─ initialize()            Setup before the pass runs         │
//! │    └─ finalize()              Cleanup after the pass completes   │
//! │                                                                  │
//! │  MemoizePass                                                     │
//! │    ├─ EligibilityClassifier   Bounded call-graph walk            │
//! │    ├─ CanonicalSignature      Type-sorted, constant-folded slots │
//! │    └─ CallSiteRewriter        Plan-then-commit call redirection  │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use memoscope::compiler::{CompilerContext, MemoizePass, PassScheduler};
//! use memoscope::ir::Module;
//!
//! # fn main() -> memoscope::Result<()> {
//! let mut module = Module::new("empty");
//! let mut scheduler = PassScheduler::default();
//! scheduler.add_pass(Box::new(MemoizePass::new()));
//!
//! let mut ctx = CompilerContext::new();
//! scheduler.run_pipeline(&mut module, &mut ctx)?;
//! assert!(ctx.descriptors().is_empty());
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod events;
mod pass;
mod passes;
mod scheduler;

pub use config::{
    MemoizeConfig, UncalledPolicy, MAX_CALL_DEPTH, MEMOIZED_PREFIX, MEMO_KEY_METADATA,
};
pub use context::CompilerContext;
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog};
pub use pass::ModulePass;
pub use passes::{
    Approval, ApprovalBasis, ArrangedCall, CallSiteRewriter, CanonicalSignature, CanonicalSlot,
    EligibilityClassifier, MemoizePass, MemoizeReport, Rejection, RewriteOutcome, Slot, Verdict,
};
pub use scheduler::PassScheduler;
