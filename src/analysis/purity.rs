//! Side-effect oracles.
//!
//! A [`PurityOracle`] answers one question about a function: can a call to it
//! be ignored when reasoning about its caller's observable behavior? Two
//! implementations are provided:
//!
//! - [`AttributeOracle`] trusts the attribute flags attached to the function.
//!   A function is side-effect free when it is
//!   [`SPECULATABLE`](FunctionFlags::SPECULATABLE), or both
//!   [`READ_NONE`](FunctionFlags::READ_NONE) and
//!   [`WILL_RETURN`](FunctionFlags::WILL_RETURN).
//! - [`SideEffectAnalysis`] additionally proves definitions free of effects by
//!   inspecting their bodies, iterating to a fixpoint over the call graph.
//!
//! # Body Rules
//!
//! A definition is side-effect free when it
//!
//! - touches memory only through addresses derived from its own stack slots,
//! - references no global,
//! - makes no indirect call, and
//! - calls only side-effect free functions.
//!
//! Declarations without attributes are assumed to have effects.

use std::collections::BTreeSet;

use crate::{
    analysis::CallGraph,
    ir::{FuncId, Function, FunctionFlags, Module, Opcode, Value},
};

/// Per-function side-effect predicate.
pub trait PurityOracle: Send + Sync {
    /// Returns `true` if calling `func` has no observable side effects.
    fn is_side_effect_free(&self, module: &Module, func: FuncId) -> bool;

    /// Returns a short name used in diagnostics.
    fn name(&self) -> &'static str;
}

/// Returns `true` if `flags` alone prove the absence of side effects.
#[must_use]
pub const fn flags_prove_purity(flags: FunctionFlags) -> bool {
    flags.contains(FunctionFlags::SPECULATABLE)
        || flags.contains(FunctionFlags::READ_NONE.union(FunctionFlags::WILL_RETURN))
}

/// Oracle reading purity from function attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeOracle;

impl PurityOracle for AttributeOracle {
    fn is_side_effect_free(&self, module: &Module, func: FuncId) -> bool {
        module
            .function(func)
            .is_some_and(|f| flags_prove_purity(f.flags()))
    }

    fn name(&self) -> &'static str {
        "attributes"
    }
}

/// Oracle combining attributes with a body-level fixpoint analysis.
///
/// The result is a snapshot of the module it was computed on. Functions added
/// afterwards fall back to their attributes.
#[derive(Debug, Clone, Default)]
pub struct SideEffectAnalysis {
    pure: BTreeSet<FuncId>,
}

impl SideEffectAnalysis {
    /// Analyzes every function of `module`.
    #[must_use]
    pub fn analyze(module: &Module) -> Self {
        let graph = CallGraph::build(module);

        // Optimistic start: every definition that passes the local rules is
        // assumed pure, then demoted until nothing changes.
        let mut pure: BTreeSet<FuncId> = module
            .functions()
            .iter()
            .filter(|f| flags_prove_purity(f.flags()) || has_pure_body(f))
            .map(Function::id)
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            let demoted: Vec<FuncId> = pure
                .iter()
                .copied()
                .filter(|id| {
                    let trusted = module
                        .function(*id)
                        .is_some_and(|f| flags_prove_purity(f.flags()));
                    !trusted && graph.callees(*id).any(|callee| !pure.contains(&callee))
                })
                .collect();
            for id in demoted {
                pure.remove(&id);
                changed = true;
            }
        }

        Self { pure }
    }

    /// Returns the functions proven side-effect free.
    pub fn pure_functions(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.pure.iter().copied()
    }
}

impl PurityOracle for SideEffectAnalysis {
    fn is_side_effect_free(&self, module: &Module, func: FuncId) -> bool {
        self.pure.contains(&func) || AttributeOracle.is_side_effect_free(module, func)
    }

    fn name(&self) -> &'static str {
        "side-effect-analysis"
    }
}

fn has_pure_body(func: &Function) -> bool {
    if func.is_declaration() {
        return false;
    }

    func.iter_instructions().all(|(_, _, inst)| {
        let operands_local = inst
            .op()
            .operands()
            .iter()
            .all(|v| !matches!(v, Value::Global(_)));

        operands_local
            && match inst.op() {
                Opcode::Load { ptr } => is_local_address(func, ptr),
                Opcode::Store { ptr, .. } => is_local_address(func, ptr),
                Opcode::CallIndirect { .. } => false,
                _ => true,
            }
    })
}

/// Follows address arithmetic back to its base and checks it is a stack slot.
fn is_local_address(func: &Function, addr: &Value) -> bool {
    let mut current = addr.clone();
    // Each step moves to an earlier definition, so the walk is bounded.
    for _ in 0..=func.iter_instructions().count() {
        let Value::Result(id) = current else {
            return false;
        };
        match func.instruction_by_id(id).map(|inst| inst.op()) {
            Some(Opcode::Alloca { .. }) => return true,
            Some(Opcode::ElementPtr { base, .. }) => current = base.clone(),
            _ => return false,
        }
    }
    false
}
